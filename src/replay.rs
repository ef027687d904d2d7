use std::fs::OpenOptions;
use std::io::{BufRead as _, BufReader};
use std::path::Path;

use anyhow::Context as _;
use async_trait::async_trait;

use crate::candidate::{CandidateExtractor, ChapterCandidate};
use crate::config::ReaderProfile;
use crate::formats::RecordedFrame;
use crate::view::{ReaderView, ScrollAmount};

/// Plays back reader snapshots captured earlier, one frame per scroll.
/// A frame's percentage is the one the reader showed next to its chapters.
#[derive(Debug, Clone)]
pub struct ReplayView {
    frames: Vec<RecordedFrame>,
    /// Advanced by `scroll`; may run past the last frame.
    cursor: usize,
    /// Frame the last snapshot came from.
    shown: usize,
    /// The last snapshot repeated the final frame after the recording ran out.
    exhausted: bool,
    extractor: CandidateExtractor,
}

impl ReplayView {
    pub fn new(frames: Vec<RecordedFrame>, profile: &ReaderProfile) -> anyhow::Result<Self> {
        if frames.is_empty() {
            anyhow::bail!("recording has no frames");
        }
        let extractor = CandidateExtractor::new(profile).context("compile reader profile")?;
        Ok(Self {
            frames,
            cursor: 0,
            shown: 0,
            exhausted: false,
            extractor,
        })
    }

    /// Reads a JSON-lines recording; blank lines are ignored.
    pub fn open(path: &Path, profile: &ReaderProfile) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .with_context(|| format!("open recording: {}", path.display()))?;

        let mut frames = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.context("read recording line")?;
            if line.trim().is_empty() {
                continue;
            }
            let frame: RecordedFrame = serde_json::from_str(&line)
                .with_context(|| format!("parse recording line {}", idx + 1))?;
            frames.push(frame);
        }
        Self::new(frames, profile).with_context(|| format!("load recording: {}", path.display()))
    }

    fn last_index(&self) -> usize {
        self.frames.len() - 1
    }
}

#[async_trait]
impl ReaderView for ReplayView {
    async fn snapshot(&mut self) -> anyhow::Result<Vec<ChapterCandidate>> {
        self.shown = self.cursor.min(self.last_index());
        self.exhausted = self.cursor > self.last_index();
        Ok(self.extractor.extract(&self.frames[self.shown].html))
    }

    async fn scroll(&mut self, _amount: ScrollAmount) -> anyhow::Result<()> {
        self.cursor = self.cursor.saturating_add(1);
        Ok(())
    }

    /// Reads the frame of the last snapshot. Once the final frame repeats, a
    /// reading below 100% means the recording is incomplete and the crawl
    /// must stop.
    async fn completion_percentage(&mut self) -> anyhow::Result<f64> {
        let percent = self.frames[self.shown].percent;
        if self.exhausted && percent < 100.0 {
            anyhow::bail!(
                "recording ended at {percent}% after {} frames",
                self.frames.len()
            );
        }
        Ok(percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(percent: f64, ids: &[&str]) -> RecordedFrame {
        let chapters = ids
            .iter()
            .map(|id| format!(r#"<div id="{id}"><p>{id}</p></div>"#))
            .collect::<String>();
        RecordedFrame {
            percent,
            html: format!(r#"<div><div class="epub-main">{chapters}</div></div>"#),
        }
    }

    fn ids(candidates: &[ChapterCandidate]) -> Vec<String> {
        candidates.iter().filter_map(|c| c.id.clone()).collect()
    }

    #[tokio::test]
    async fn frames_advance_on_scroll_and_repeat_at_the_end() -> anyhow::Result<()> {
        let profile = ReaderProfile::default();
        let mut view = ReplayView::new(
            vec![frame(50.0, &["c1"]), frame(100.0, &["c1", "c2"])],
            &profile,
        )?;

        assert_eq!(ids(&view.snapshot().await?), vec!["c1"]);
        assert_eq!(view.completion_percentage().await?, 50.0);
        view.scroll(ScrollAmount::Pixels(1)).await?;
        assert_eq!(ids(&view.snapshot().await?), vec!["c1", "c2"]);
        assert_eq!(view.completion_percentage().await?, 100.0);
        view.scroll(ScrollAmount::Pixels(1)).await?;
        assert_eq!(ids(&view.snapshot().await?), vec!["c1", "c2"]);
        assert_eq!(view.completion_percentage().await?, 100.0);
        Ok(())
    }

    #[tokio::test]
    async fn percentage_belongs_to_the_snapshot_frame_not_the_scrolled_one() -> anyhow::Result<()> {
        let profile = ReaderProfile::default();
        let mut view = ReplayView::new(
            vec![frame(10.0, &["a"]), frame(70.0, &["a", "b"])],
            &profile,
        )?;

        view.snapshot().await?;
        view.scroll(ScrollAmount::Pixels(1)).await?;
        assert_eq!(view.completion_percentage().await?, 10.0);
        Ok(())
    }

    #[tokio::test]
    async fn incomplete_recording_fails_after_the_last_frame() -> anyhow::Result<()> {
        let profile = ReaderProfile::default();
        let mut view = ReplayView::new(vec![frame(80.0, &["c1"])], &profile)?;

        view.snapshot().await?;
        view.scroll(ScrollAmount::Pixels(1)).await?;
        assert_eq!(view.completion_percentage().await?, 80.0);
        assert_eq!(ids(&view.snapshot().await?), vec!["c1"]);
        assert!(view.completion_percentage().await.is_err());
        Ok(())
    }

    #[test]
    fn open_reads_json_lines() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("recording.jsonl");
        let lines = [frame(10.0, &["a"]), frame(100.0, &["a", "b"])]
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        std::fs::write(&path, format!("{}\n\n{}\n", lines[0], lines[1]))?;

        let view = ReplayView::open(&path, &ReaderProfile::default())?;
        assert_eq!(view.frames.len(), 2);

        std::fs::write(&path, "\n")?;
        assert!(ReplayView::open(&path, &ReaderProfile::default()).is_err());
        Ok(())
    }
}
