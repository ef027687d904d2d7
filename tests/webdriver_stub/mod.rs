use std::io::Read as _;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

/// One scroll position of the fake reader.
#[derive(Debug, Clone)]
pub struct StubFrame {
    pub percent: f64,
    pub html: String,
}

#[derive(Debug, Clone)]
pub struct WebDriverStubConfig {
    pub session_id: String,
    pub title: String,
    pub frames: Vec<StubFrame>,
}

/// Answers the handful of WebDriver endpoints a crawl uses. Scrolling moves
/// to the next frame; past the last frame the last one repeats.
pub struct WebDriverStub {
    pub base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl WebDriverStub {
    pub fn spawn(config: WebDriverStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start webdriver stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            let session = format!("/session/{}", config.session_id);
            let mut cursor = 0usize;
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                let frame = &config.frames[cursor.min(config.frames.len() - 1)];

                let (status, body) = if request.method() == &tiny_http::Method::Get
                    && path == format!("{session}/title")
                {
                    (200, json!({ "value": config.title }))
                } else if request.method() == &tiny_http::Method::Post
                    && path == format!("{session}/execute/sync")
                {
                    let mut raw = String::new();
                    let _ = request.as_reader().read_to_string(&mut raw);
                    let parsed: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);
                    let script = parsed.get("script").and_then(Value::as_str).unwrap_or("");

                    if script.contains("outerHTML") {
                        (200, json!({ "value": frame.html }))
                    } else if script.contains("textContent") {
                        (200, json!({ "value": format!("{}%", frame.percent) }))
                    } else if script.contains("scrollBy") {
                        cursor += 1;
                        (200, json!({ "value": true }))
                    } else {
                        (
                            500,
                            json!({ "value": { "error": "javascript error", "message": "unknown script" } }),
                        )
                    }
                } else {
                    (
                        404,
                        json!({ "value": { "error": "invalid session id", "message": path } }),
                    )
                };

                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(body.to_string())
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for WebDriverStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
