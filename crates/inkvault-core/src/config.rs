//! History engine configuration

/// Configuration for the history service
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum versions retained per document series
    pub keep_count: usize,
    /// Sequence numbers up to this value are always stored as full
    /// snapshots; young histories churn too much for diff chains to pay off
    pub full_snapshot_count: u64,
    /// Maximum entries returned by one list call
    pub list_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            keep_count: 1000,
            full_snapshot_count: 5,
            list_limit: 100,
        }
    }
}

impl HistoryConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retention budget
    pub fn with_keep_count(mut self, keep_count: usize) -> Self {
        self.keep_count = keep_count;
        self
    }

    /// Set how many leading versions are always stored full
    pub fn with_full_snapshot_count(mut self, count: u64) -> Self {
        self.full_snapshot_count = count;
        self
    }

    /// Set the list page size
    pub fn with_list_limit(mut self, limit: usize) -> Self {
        self.list_limit = limit;
        self
    }
}
