use serde::Serialize;

/// Non-fatal irregularities found while crawling. They are returned to the
/// caller instead of aborting the chapter or the crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    MissingHeadingId {
        level: u8,
        text: String,
        synthesized_id: String,
    },
    ImageWithoutFilename {
        url: String,
    },
    UnrecognizedCandidate {
        markup: String,
    },
}

impl Anomaly {
    pub fn log(&self, chapter: Option<&str>) {
        match self {
            Self::MissingHeadingId {
                level,
                text,
                synthesized_id,
            } => tracing::warn!(
                chapter,
                level,
                text = %text,
                id = %synthesized_id,
                "heading has no id; synthesized one"
            ),
            Self::ImageWithoutFilename { url } => tracing::warn!(
                chapter,
                url = %url,
                "image url has no file name; left unchanged"
            ),
            Self::UnrecognizedCandidate { markup } => tracing::warn!(
                markup = %markup,
                "unrecognized chapter candidate; skipped"
            ),
        }
    }
}

/// An anomaly as recorded in the crawl report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnomalyRecord {
    pub iteration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(flatten)]
    pub anomaly: Anomaly,
}
