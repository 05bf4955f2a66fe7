//! # Atlas Store
//!
//! The in-memory record index and its persisted snapshot.
//!
//! ```text
//! Scan results (per file)
//!     │
//!     ├──> replace_file / remove_file   (delete-before-insert, per file)
//!     │      └─> entities + references + file mtimes
//!     │
//!     └──> snapshot.json                (atomic save, tolerant load)
//! ```
//!
//! Every mutation is scoped to one file and fully replaces that file's prior
//! generation of records, so overlapping rescans of different files never
//! conflict and a rescan of the same file is last-write-wins.

mod error;
mod snapshot;
mod store;

pub use error::{Result, StoreError};
pub use snapshot::SNAPSHOT_SCHEMA_VERSION;
pub use store::IndexStore;
