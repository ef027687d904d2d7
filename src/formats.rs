use serde::{Deserialize, Serialize};

use crate::anomaly::AnomalyRecord;

/// One line of a replay recording: what the reader showed at one scroll position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub percent: f64,
    /// Outer HTML of the snapshot container.
    pub html: String,
}

/// Written next to the book once the crawl completes.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub started_at: String,
    pub finished_at: String,
    pub iterations: u64,
    /// Accepted chapter ids in acceptance order.
    pub chapters: Vec<String>,
    pub toc_entries: usize,
    pub images: usize,
    pub anomalies: Vec<AnomalyRecord>,
}
