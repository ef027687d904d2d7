use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use serde_json::{Value, json};

use crate::candidate::{CandidateExtractor, ChapterCandidate};
use crate::config::ReaderProfile;
use crate::view::{ReaderView, ScrollAmount, parse_percentage};

const OUTER_HTML_SCRIPT: &str =
    "const el = document.querySelector(arguments[0]); return el ? el.outerHTML : null;";
const TEXT_SCRIPT: &str =
    "const el = document.querySelector(arguments[0]); return el ? el.textContent : null;";
const SCROLL_SCRIPT: &str = "const el = document.getElementsByClassName(arguments[0])[0]; \
if (!el) { return false; } \
const dy = arguments[1] === 'viewport_multiple' ? document.body.scrollHeight * arguments[2] : arguments[2]; \
el.scrollBy(0, dy); return true;";

/// A reader page open in an existing W3C WebDriver session. Logging in and
/// navigating to the book happen before the session is handed over.
#[derive(Debug, Clone)]
pub struct WebDriverView {
    client: reqwest::Client,
    session_url: String,
    profile: ReaderProfile,
    extractor: CandidateExtractor,
}

impl WebDriverView {
    pub fn attach(
        base_url: &str,
        session_id: &str,
        profile: ReaderProfile,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let base_url = base_url.trim_end_matches('/');
        if base_url.is_empty() {
            anyhow::bail!("webdriver url is empty");
        }
        let session_id = session_id.trim();
        if session_id.is_empty() {
            anyhow::bail!("webdriver session id is empty");
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("build webdriver http client")?;
        let extractor = CandidateExtractor::new(&profile).context("compile reader profile")?;

        Ok(Self {
            client,
            session_url: format!("{base_url}/session/{session_id}"),
            profile,
            extractor,
        })
    }

    pub async fn title(&self) -> anyhow::Result<String> {
        let endpoint = format!("{}/title", self.session_url);
        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .with_context(|| format!("GET {endpoint}"))?;
        let value = webdriver_value(response).await?;
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| anyhow::anyhow!("webdriver title is not a string: {value}"))
    }

    async fn execute(&self, script: &str, args: Value) -> anyhow::Result<Value> {
        let endpoint = format!("{}/execute/sync", self.session_url);
        let response = self
            .client
            .post(&endpoint)
            .json(&json!({ "script": script, "args": args }))
            .send()
            .await
            .with_context(|| format!("POST {endpoint}"))?;
        webdriver_value(response).await
    }
}

async fn webdriver_value(response: reqwest::Response) -> anyhow::Result<Value> {
    let status = response.status();
    let raw = response
        .text()
        .await
        .context("read webdriver response body")?;
    let body: Value = serde_json::from_str(&raw)
        .with_context(|| format!("parse webdriver response ({status})"))?;
    let value = body.get("value").cloned().unwrap_or(Value::Null);

    if !status.is_success() {
        let error = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let message = value.get("message").and_then(Value::as_str).unwrap_or("");
        anyhow::bail!("webdriver error ({status}): {error}: {message}");
    }
    Ok(value)
}

#[async_trait]
impl ReaderView for WebDriverView {
    async fn snapshot(&mut self) -> anyhow::Result<Vec<ChapterCandidate>> {
        let value = self
            .execute(OUTER_HTML_SCRIPT, json!([self.profile.snapshot_selector]))
            .await?;
        let Some(html) = value.as_str() else {
            anyhow::bail!(
                "snapshot container not found: {}",
                self.profile.snapshot_selector
            );
        };
        Ok(self.extractor.extract(html))
    }

    async fn scroll(&mut self, amount: ScrollAmount) -> anyhow::Result<()> {
        let args = match amount {
            ScrollAmount::ViewportMultiple(factor) => {
                json!([self.profile.scroll_container_class, "viewport_multiple", factor])
            }
            ScrollAmount::Pixels(pixels) => {
                json!([self.profile.scroll_container_class, "pixels", pixels])
            }
        };
        let scrolled = self.execute(SCROLL_SCRIPT, args).await?;
        if scrolled != Value::Bool(true) {
            anyhow::bail!(
                "scroll container not found: .{}",
                self.profile.scroll_container_class
            );
        }
        Ok(())
    }

    async fn completion_percentage(&mut self) -> anyhow::Result<f64> {
        let value = self
            .execute(TEXT_SCRIPT, json!([self.profile.progress_selector]))
            .await?;
        let Some(text) = value.as_str() else {
            anyhow::bail!(
                "progress element not found: {}",
                self.profile.progress_selector
            );
        };
        parse_percentage(text)
    }
}
