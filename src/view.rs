use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::candidate::ChapterCandidate;

/// How far one scroll command moves the reader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum ScrollAmount {
    /// Multiple of the document body's current scroll height.
    ViewportMultiple(f64),
    Pixels(i64),
}

/// The live online reader. Every call may block until the reader is ready.
#[async_trait]
pub trait ReaderView: Send {
    /// Chapter candidates currently rendered, in document order.
    async fn snapshot(&mut self) -> anyhow::Result<Vec<ChapterCandidate>>;

    async fn scroll(&mut self, amount: ScrollAmount) -> anyhow::Result<()>;

    /// Reading progress in `[0, 100]`.
    async fn completion_percentage(&mut self) -> anyhow::Result<f64>;
}

/// Parses progress labels such as `"42.5%"` or `" 100 "`.
pub fn parse_percentage(raw: &str) -> anyhow::Result<f64> {
    let trimmed = raw.trim().trim_end_matches('%').trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|err| anyhow::anyhow!("invalid completion percentage {raw:?}: {err}"))?;
    if !value.is_finite() {
        anyhow::bail!("invalid completion percentage {raw:?}");
    }
    Ok(value.clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_percentage_accepts_reader_labels() -> anyhow::Result<()> {
        assert_eq!(parse_percentage("42.5%")?, 42.5);
        assert_eq!(parse_percentage(" 100 % ")?, 100.0);
        assert_eq!(parse_percentage("0")?, 0.0);
        Ok(())
    }

    #[test]
    fn parse_percentage_rejects_garbage() {
        assert!(parse_percentage("").is_err());
        assert!(parse_percentage("loading").is_err());
        assert!(parse_percentage("NaN").is_err());
    }
}
