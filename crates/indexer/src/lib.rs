//! # Atlas Indexer
//!
//! Keeps an [`atlas_store::IndexStore`] in step with the corpus on disk.
//!
//! ## Pipeline
//!
//! ```text
//! Corpus (assets/themes, assets/layers)
//!     │
//!     ├──> rebuild_all        (mtime-gated rescan of eligible files)
//!     │
//!     ├──> apply_event        (changed / created / deleted, one file each)
//!     │      └─> scan + replace_file, then persist
//!     │
//!     └──> WatchService       (notify + debounce, feeds apply_event)
//! ```
//!
//! Every mutation is file-scoped: an abandoned or failed scan has no visible
//! effect until its `replace_file` call, so overlapping scans of different
//! files never conflict and the last completed scan of a file wins.

mod error;
mod indexer;
mod stats;
mod watcher;

pub use error::{IndexerError, Result};
pub use indexer::{snapshot_path_for_root, CorpusIndexer, FileEvent};
pub use stats::RebuildStats;
pub use watcher::{IndexUpdate, WatchConfig, WatchService};
