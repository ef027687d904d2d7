use std::fmt;

use serde::Serialize;
use url::Url;

/// One record of the deferred-download manifest, in the three-line layout
/// batch downloaders such as aria2c accept as an input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub url: String,
    pub dir: String,
    pub out: String,
}

impl fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.url)?;
        writeln!(f, "  dir={}", self.dir)?;
        writeln!(f, "  out={}", self.out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Value for the rewritten `src`/`xlink:href`, relative to the main document.
    pub local_path: String,
    pub entry: ManifestEntry,
}

#[derive(Debug, Clone)]
pub struct ImageResolver {
    dest_dir: String,
    folder: String,
}

impl ImageResolver {
    /// `dest_dir` is where the downloader should store files; `folder` is the
    /// same directory as seen from the main document.
    pub fn new(dest_dir: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            folder: folder.into(),
        }
    }

    /// Returns `None` when the URL has no usable final path segment.
    pub fn resolve(&self, raw_url: &str) -> Option<ResolvedImage> {
        let url = strip_query(raw_url);
        let file_name = image_file_name(&url)?;
        Some(ResolvedImage {
            local_path: format!("./{}/{file_name}", self.folder),
            entry: ManifestEntry {
                url,
                dir: self.dest_dir.clone(),
                out: file_name,
            },
        })
    }
}

/// Drops the query and keeps any fragment. The rest of the URL is kept byte
/// for byte so the manifest name matches what the page references.
pub fn strip_query(raw_url: &str) -> String {
    let raw_url = raw_url.trim();
    let fragment_start = raw_url.find('#').unwrap_or(raw_url.len());
    match raw_url[..fragment_start].find('?') {
        Some(query_start) => format!("{}{}", &raw_url[..query_start], &raw_url[fragment_start..]),
        None => raw_url.to_owned(),
    }
}

/// Final path segment of `url`, undecoded. Pure: the same URL always maps to
/// the same name.
pub fn image_file_name(url: &str) -> Option<String> {
    let without_suffix = url.split(['?', '#']).next().unwrap_or_default();
    let path = match Url::parse(without_suffix) {
        Ok(parsed) if parsed.cannot_be_a_base() => return None,
        Ok(_) => {
            let (_, rest) = without_suffix.split_once("://")?;
            &rest[rest.find('/')?..]
        }
        Err(_) => without_suffix,
    };
    let segment = path.rsplit('/').next().unwrap_or_default().to_owned();

    if segment.is_empty() || segment == "." || segment == ".." {
        return None;
    }
    Some(segment)
}
