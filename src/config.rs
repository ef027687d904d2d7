use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::view::ScrollAmount;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reader: ReaderProfile,
    pub layout: BookLayout,
    pub crawl: CrawlSettings,
    pub webdriver: WebDriverSettings,
}

impl Config {
    /// Reads a YAML config file; missing keys fall back to the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        serde_yaml::from_str(&yaml).with_context(|| format!("parse config: {}", path.display()))
    }
}

/// Where things live in the online reader's DOM.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderProfile {
    /// Element whose outer HTML is one page snapshot.
    pub snapshot_selector: String,
    /// Chapter candidates inside a snapshot, in document order.
    pub chapter_selector: String,
    /// Element whose text is the completion percentage (`"42.5%"`).
    pub progress_selector: String,
    pub scroll_container_class: String,
    pub end_of_book_class: String,
    pub loading_class: String,
    pub noise_tag: String,
    pub noise_class: String,
    pub unwrap_tags: Vec<String>,
    pub lazy_src_attr: String,
    /// Removed from rewritten images in addition to the lazy source and `data-*`.
    pub strip_image_attrs: Vec<String>,
    pub heading_container_tag: String,
}

impl Default for ReaderProfile {
    fn default() -> Self {
        Self {
            snapshot_selector: "#epub-reader > div:nth-of-type(4) > div:nth-of-type(1)".to_owned(),
            chapter_selector: "div.epub-main > div".to_owned(),
            progress_selector: "#epub-reader > div:nth-of-type(3) > div > div > div".to_owned(),
            scroll_container_class: "epub-single-view".to_owned(),
            end_of_book_class: "read-end".to_owned(),
            loading_class: "scroll-loading".to_owned(),
            noise_tag: "span".to_owned(),
            noise_class: "random".to_owned(),
            unwrap_tags: vec!["span".to_owned()],
            lazy_src_attr: "data-src".to_owned(),
            strip_image_attrs: vec!["isloaded".to_owned()],
            heading_container_tag: "div".to_owned(),
        }
    }
}

/// File names and frame names of the produced book.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookLayout {
    pub index_file: String,
    pub toc_file: String,
    pub main_file: String,
    pub manifest_file: String,
    pub report_file: String,
    pub image_folder: String,
    pub toc_frame: String,
    pub text_frame: String,
    pub main_container_class: String,
    pub stylesheets: Vec<String>,
}

impl Default for BookLayout {
    fn default() -> Self {
        Self {
            index_file: "index.html".to_owned(),
            toc_file: "TOC.html".to_owned(),
            main_file: "main.html".to_owned(),
            manifest_file: "image.list".to_owned(),
            report_file: "crawl.json".to_owned(),
            image_folder: "images".to_owned(),
            toc_frame: "toc".to_owned(),
            text_frame: "text".to_owned(),
            main_container_class: "epub-main".to_owned(),
            stylesheets: vec![
                "../localEpubReader.css".to_owned(),
                "localEpubReader.css".to_owned(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    /// Consecutive readings at or above 100% required before stopping.
    pub completion_threshold: u32,
    pub scroll: ScrollAmount,
    pub poll_interval_ms: u64,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            completion_threshold: 5,
            scroll: ScrollAmount::ViewportMultiple(1.2),
            poll_interval_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverSettings {
    pub url: String,
    pub request_timeout_secs: u64,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9515".to_owned(),
            request_timeout_secs: 60,
        }
    }
}
