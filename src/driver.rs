use std::io::Write;
use std::time::Duration;

use anyhow::Context as _;

use crate::anomaly::{Anomaly, AnomalyRecord};
use crate::candidate::{CandidateKind, ChapterCandidate};
use crate::config::{CrawlSettings, ReaderProfile};
use crate::formats::CrawlReport;
use crate::ids::HeadingIdGenerator;
use crate::ledger::ChapterLedger;
use crate::sink::BookSink;
use crate::transform::ChapterTransformer;
use crate::view::ReaderView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Crawling { completion_streak: u32 },
    Done,
}

impl CrawlState {
    pub const START: Self = Self::Crawling {
        completion_streak: 0,
    };

    /// Applies one completion reading. Readings below 100 reset the streak.
    #[must_use]
    pub fn observe(self, percent: f64, threshold: u32) -> Self {
        let Self::Crawling { completion_streak } = self else {
            return Self::Done;
        };
        let completion_streak = if percent >= 100.0 {
            completion_streak.saturating_add(1)
        } else {
            0
        };
        if completion_streak >= threshold.max(1) {
            Self::Done
        } else {
            Self::Crawling { completion_streak }
        }
    }
}

/// Scrolls the reader until it reports completion, feeding every new chapter
/// through the transformer into the sink exactly once.
pub struct PaginationDriver<V, W: Write> {
    view: V,
    sink: BookSink<W>,
    transformer: ChapterTransformer,
    profile: ReaderProfile,
    ids: Box<dyn HeadingIdGenerator + Send>,
    settings: CrawlSettings,
    ledger: ChapterLedger,
    state: CrawlState,
    iterations: u64,
    toc_entries: usize,
    images: usize,
    anomalies: Vec<AnomalyRecord>,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl<V: ReaderView, W: Write> PaginationDriver<V, W> {
    /// `sink` must already carry its preambles.
    pub fn new(
        view: V,
        sink: BookSink<W>,
        transformer: ChapterTransformer,
        profile: ReaderProfile,
        ids: Box<dyn HeadingIdGenerator + Send>,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            view,
            sink,
            transformer,
            profile,
            ids,
            settings,
            ledger: ChapterLedger::new(),
            state: CrawlState::START,
            iterations: 0,
            toc_entries: 0,
            images: 0,
            anomalies: Vec::new(),
            started_at: chrono::Utc::now(),
        }
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn ledger(&self) -> &ChapterLedger {
        &self.ledger
    }

    /// One snapshot, scroll, progress round. Does nothing once `Done`.
    pub async fn step(&mut self) -> anyhow::Result<CrawlState> {
        if self.state == CrawlState::Done {
            return Ok(self.state);
        }
        self.iterations += 1;

        let candidates = self.view.snapshot().await.context("read page snapshot")?;
        for candidate in &candidates {
            self.accept(candidate)?;
        }

        if let Err(err) = self.view.scroll(self.settings.scroll).await {
            tracing::warn!(?err, "scroll command failed");
        }

        let percent = self
            .view
            .completion_percentage()
            .await
            .context("read completion percentage")?;
        self.state = self
            .state
            .observe(percent, self.settings.completion_threshold);

        match self.state {
            CrawlState::Crawling { completion_streak } => tracing::info!(
                iteration = self.iterations,
                percent,
                completion_streak,
                "read progress"
            ),
            CrawlState::Done => tracing::info!(
                iteration = self.iterations,
                percent,
                chapters = self.ledger.len(),
                "reader reported completion"
            ),
        }
        Ok(self.state)
    }

    /// Crawls to completion and closes the sink. On error the sink is left
    /// unclosed; everything written so far is already flushed.
    pub async fn run(mut self) -> anyhow::Result<(CrawlReport, BookSink<W>)> {
        let poll_interval = Duration::from_millis(self.settings.poll_interval_ms);
        while self.step().await? != CrawlState::Done {
            if !poll_interval.is_zero() {
                tokio::time::sleep(poll_interval).await;
            }
        }
        self.sink.close().context("close book outputs")?;

        let report = CrawlReport {
            started_at: self.started_at.to_rfc3339(),
            finished_at: chrono::Utc::now().to_rfc3339(),
            iterations: self.iterations,
            chapters: self.ledger.chapter_ids().to_vec(),
            toc_entries: self.toc_entries,
            images: self.images,
            anomalies: self.anomalies,
        };
        Ok((report, self.sink))
    }

    fn accept(&mut self, candidate: &ChapterCandidate) -> anyhow::Result<()> {
        let chapter_id = match candidate.classify(&self.profile) {
            CandidateKind::Chapter(id) => id,
            CandidateKind::EndOfBook => {
                tracing::debug!("end-of-book marker");
                return Ok(());
            }
            CandidateKind::Loading => {
                tracing::debug!("loading placeholder");
                return Ok(());
            }
            CandidateKind::Unrecognized => {
                self.record(
                    None,
                    Anomaly::UnrecognizedCandidate {
                        markup: candidate.markup.clone(),
                    },
                );
                return Ok(());
            }
        };

        if !self.ledger.should_process(chapter_id) {
            tracing::debug!(chapter = chapter_id, "chapter already processed");
            return Ok(());
        }

        let chapter = self
            .transformer
            .transform(&candidate.markup, self.ids.as_mut());
        self.ledger.mark_processed(chapter_id);
        self.sink
            .append_chapter(&chapter)
            .with_context(|| format!("write chapter {chapter_id}"))?;

        self.toc_entries += chapter.toc_entries.len();
        self.images += chapter.images.len();
        for anomaly in chapter.anomalies {
            self.record(Some(chapter_id.to_owned()), anomaly);
        }

        tracing::info!(
            chapter = chapter_id,
            chapters = self.ledger.len(),
            recent = ?self.ledger.recent(3),
            "parsed chapter"
        );
        Ok(())
    }

    fn record(&mut self, chapter: Option<String>, anomaly: Anomaly) {
        anomaly.log(chapter.as_deref());
        self.anomalies.push(AnomalyRecord {
            iteration: self.iterations,
            chapter,
            anomaly,
        });
    }
}
