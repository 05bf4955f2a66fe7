use serde::{Deserialize, Serialize};

/// Statistics about one rebuild or event batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildStats {
    /// Eligible files considered
    pub scanned: usize,

    /// Files rescanned because their mtime advanced (or they were new)
    pub changed: usize,

    /// Files left untouched
    pub unchanged: usize,

    /// Files purged because they disappeared from the corpus
    pub removed: usize,

    /// Entities written by this run
    pub entities: usize,

    /// References written by this run
    pub references: usize,

    /// Per-file failures (parse errors, unreadable files)
    pub errors: Vec<String>,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl RebuildStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scanned: 0,
            changed: 0,
            unchanged: 0,
            removed: 0,
            entities: 0,
            references: 0,
            errors: Vec::new(),
            time_ms: 0,
        }
    }

    pub fn add_records(&mut self, entities: usize, references: usize) {
        self.entities += entities;
        self.references += references;
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }
}

impl Default for RebuildStats {
    fn default() -> Self {
        Self::new()
    }
}
