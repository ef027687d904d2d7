use std::fs::OpenOptions;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;

use crate::cli::{CrawlArgs, CrawlOptions, ReplayArgs};
use crate::config::Config;
use crate::driver::PaginationDriver;
use crate::formats::CrawlReport;
use crate::ids::RandomHeadingIds;
use crate::replay::ReplayView;
use crate::sink::{BookSink, write_index};
use crate::transform::ChapterTransformer;
use crate::view::{ReaderView, ScrollAmount};
use crate::webdriver::WebDriverView;

pub const WEBDRIVER_URL_ENV: &str = "SCROLLBOOK_WEBDRIVER_URL";

pub async fn run(args: CrawlArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.options)?;
    if let Some(url) = args
        .webdriver_url
        .clone()
        .or_else(|| std::env::var(WEBDRIVER_URL_ENV).ok())
        .filter(|url| !url.trim().is_empty())
    {
        config.webdriver.url = url;
    }
    if let Some(secs) = args.request_timeout_secs {
        config.webdriver.request_timeout_secs = secs;
    }

    let view = WebDriverView::attach(
        &config.webdriver.url,
        &args.session,
        config.reader.clone(),
        Duration::from_secs(config.webdriver.request_timeout_secs.max(1)),
    )
    .context("attach webdriver session")?;

    let title = match args.title.clone() {
        Some(title) => title,
        None => view.title().await.context("read page title")?,
    };
    tracing::info!(webdriver = %config.webdriver.url, session = %args.session, %title, "attached to reader");

    let out_dir = book_dir(args.out.as_deref(), args.root.as_deref(), &title);
    crawl_into(view, config, &out_dir, &title).await?;
    Ok(())
}

pub async fn replay(args: ReplayArgs) -> anyhow::Result<()> {
    let config = load_config(&args.options)?;
    let recording = PathBuf::from(&args.recording);
    let view = ReplayView::open(&recording, &config.reader)?;
    tracing::info!(recording = %recording.display(), "replaying recorded session");

    let out_dir = book_dir(args.out.as_deref(), args.root.as_deref(), &args.title);
    crawl_into(view, config, &out_dir, &args.title).await?;
    Ok(())
}

/// `--out` wins; otherwise a folder named after the title under `root`
/// (current directory by default).
pub fn book_dir(out: Option<&str>, root: Option<&str>, title: &str) -> PathBuf {
    match out {
        Some(out) => PathBuf::from(out),
        None => Path::new(root.unwrap_or(".")).join(folder_name(title)),
    }
}

/// Keeps word characters, `-`, `_`, `.` and spaces; everything else becomes `_`.
pub fn folder_name(title: &str) -> String {
    let name: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let name = name.trim();
    if name.is_empty() || name.chars().all(|c| c == '.') {
        return "book".to_owned();
    }
    name.to_owned()
}

/// Writes a complete book under `out_dir`, which must not exist yet.
pub async fn crawl_into<V: ReaderView>(
    view: V,
    config: Config,
    out_dir: &Path,
    title: &str,
) -> anyhow::Result<CrawlReport> {
    if out_dir.exists() {
        anyhow::bail!("output directory already exists: {}", out_dir.display());
    }
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create output dir: {}", out_dir.display()))?;
    let image_dir = out_dir.join(&config.layout.image_folder);
    std::fs::create_dir_all(&image_dir)
        .with_context(|| format!("create image dir: {}", image_dir.display()))?;

    write_index(out_dir, title, &config.layout).context("write index document")?;
    let mut sink = BookSink::create(out_dir, &config.layout).context("create book outputs")?;
    sink.open().context("write document preambles")?;

    let transformer = ChapterTransformer::new(
        config.reader.clone(),
        config.layout.clone(),
        image_dir.display().to_string(),
    );
    let driver = PaginationDriver::new(
        view,
        sink,
        transformer,
        config.reader,
        Box::new(RandomHeadingIds),
        config.crawl,
    );
    let (report, _sink) = driver.run().await?;

    let report_path = out_dir.join(&config.layout.report_file);
    write_report(&report_path, &report)?;

    tracing::info!(
        out = %out_dir.display(),
        iterations = report.iterations,
        chapters = report.chapters.len(),
        toc_entries = report.toc_entries,
        images = report.images,
        anomalies = report.anomalies.len(),
        "book complete"
    );
    Ok(report)
}

fn load_config(options: &CrawlOptions) -> anyhow::Result<Config> {
    let mut config =
        Config::load(options.config.as_deref().map(Path::new)).context("load config")?;
    apply_overrides(&mut config, options)?;
    Ok(config)
}

fn apply_overrides(config: &mut Config, options: &CrawlOptions) -> anyhow::Result<()> {
    if let Some(threshold) = options.completion_threshold {
        config.crawl.completion_threshold = threshold;
    }
    if let Some(factor) = options.scroll_factor {
        if !factor.is_finite() || factor <= 0.0 {
            anyhow::bail!("--scroll-factor must be a positive number: {factor}");
        }
        config.crawl.scroll = ScrollAmount::ViewportMultiple(factor);
    }
    if let Some(pixels) = options.scroll_pixels {
        config.crawl.scroll = ScrollAmount::Pixels(pixels);
    }
    if let Some(ms) = options.poll_interval_ms {
        config.crawl.poll_interval_ms = ms;
    }
    Ok(())
}

fn write_report(path: &Path, report: &CrawlReport) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .with_context(|| format!("create crawl report: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report).context("serialize crawl report")?;
    writer
        .write_all(b"\n")
        .context("write crawl report newline")?;
    writer
        .flush()
        .with_context(|| format!("flush crawl report: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::RecordedFrame;

    fn options() -> CrawlOptions {
        CrawlOptions {
            config: None,
            completion_threshold: None,
            scroll_factor: None,
            scroll_pixels: None,
            poll_interval_ms: None,
        }
    }

    #[test]
    fn book_dir_falls_back_to_the_sanitized_title() {
        assert_eq!(folder_name("Rust: The Book / 2nd ed."), "Rust_ The Book _ 2nd ed.");
        assert_eq!(folder_name("深入理解 Rust"), "深入理解 Rust");
        assert_eq!(folder_name(".."), "book");
        assert_eq!(folder_name("   "), "book");

        assert_eq!(
            book_dir(None, Some("/library"), "A/B"),
            PathBuf::from("/library/A_B")
        );
        assert_eq!(book_dir(None, None, "Demo"), PathBuf::from("./Demo"));
        assert_eq!(book_dir(Some("out"), None, "Demo"), PathBuf::from("out"));
    }

    #[test]
    fn flags_override_config_values() -> anyhow::Result<()> {
        let mut config = Config::default();
        let overrides = CrawlOptions {
            completion_threshold: Some(2),
            scroll_pixels: Some(800),
            poll_interval_ms: Some(15),
            ..options()
        };
        apply_overrides(&mut config, &overrides)?;
        assert_eq!(config.crawl.completion_threshold, 2);
        assert_eq!(config.crawl.scroll, ScrollAmount::Pixels(800));
        assert_eq!(config.crawl.poll_interval_ms, 15);

        let bad = CrawlOptions {
            scroll_factor: Some(0.0),
            ..options()
        };
        assert!(apply_overrides(&mut Config::default(), &bad).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn crawl_into_writes_the_book_and_refuses_existing_output() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let out_dir = temp.path().join("book");
        let mut config = Config::default();
        config.crawl.completion_threshold = 1;

        let frames = vec![RecordedFrame {
            percent: 100.0,
            html: r#"<div><div class="epub-main"><div id="c1"><h1 id="h">One</h1></div></div></div>"#
                .to_owned(),
        }];
        let view = ReplayView::new(frames.clone(), &config.reader)?;
        let report = crawl_into(view, config.clone(), &out_dir, "Demo").await?;
        assert_eq!(report.chapters, vec!["c1"]);
        assert_eq!(report.toc_entries, 1);

        for file in ["index.html", "main.html", "TOC.html", "image.list", "crawl.json"] {
            assert!(out_dir.join(file).is_file(), "{file} missing");
        }
        assert!(out_dir.join("images").is_dir());

        let view = ReplayView::new(frames, &config.reader)?;
        let err = crawl_into(view, config, &out_dir, "Demo")
            .await
            .expect_err("existing output dir");
        assert!(err.to_string().contains("already exists"), "{err:#}");
        Ok(())
    }
}
