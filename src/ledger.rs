use std::collections::HashSet;

/// Chapter ids already transformed, in acceptance order.
#[derive(Debug, Clone, Default)]
pub struct ChapterLedger {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl ChapterLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_process(&self, chapter_id: &str) -> bool {
        !self.seen.contains(chapter_id)
    }

    /// Returns `false` if the id was already recorded.
    pub fn mark_processed(&mut self, chapter_id: &str) -> bool {
        if !self.seen.insert(chapter_id.to_owned()) {
            return false;
        }
        self.order.push(chapter_id.to_owned());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn chapter_ids(&self) -> &[String] {
        &self.order
    }

    /// The last `n` accepted ids, oldest first.
    pub fn recent(&self, n: usize) -> &[String] {
        &self.order[self.order.len().saturating_sub(n)..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_recorded_once_in_insertion_order() {
        let mut ledger = ChapterLedger::new();
        assert!(ledger.should_process("b"));
        assert!(ledger.mark_processed("b"));
        assert!(ledger.mark_processed("a"));
        assert!(!ledger.mark_processed("b"));
        assert!(!ledger.should_process("b"));

        assert_eq!(ledger.chapter_ids(), ["b", "a"]);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn recent_returns_the_tail() {
        let mut ledger = ChapterLedger::new();
        assert!(ledger.recent(3).is_empty());
        for id in ["c1", "c2", "c3", "c4"] {
            ledger.mark_processed(id);
        }
        assert_eq!(ledger.recent(3), ["c2", "c3", "c4"]);
        assert_eq!(ledger.recent(10).len(), 4);
    }
}
