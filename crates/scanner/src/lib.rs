//! # Atlas Scanner
//!
//! Extraction of definitions and cross-file references from map-theme
//! configuration documents.
//!
//! ## Pipeline
//!
//! ```text
//! Document text (theme / layer JSON)
//!     │
//!     ├──> EntryShape classification (name | builtin | inline)
//!     │      └─> use sites
//!     │
//!     ├──> Identifier resolution (bare / dotted / wildcard tokens)
//!     │      └─> candidate documents + member matches
//!     │
//!     └──> ScanOutcome
//!            ├─> Entity records   (reusable definitions)
//!            └─> Reference records (use site → definition site)
//! ```
//!
//! Scanning one document never touches the records of another; resolution
//! reads candidate documents through the [`DocumentProvider`] seam so tests
//! can run against in-memory corpora.

mod classify;
mod error;
mod layout;
mod provider;
mod resolver;
mod scanner;
mod types;

pub use classify::EntryShape;
pub use error::{Result, ScanError};
pub use layout::{CorpusLayout, DocRole};
pub use provider::{DocumentProvider, FsDocumentProvider, MemoryDocumentProvider};
pub use resolver::{MemberMatch, ReferenceToken};
pub use scanner::{DocumentScanner, ScanOutcome};
pub use types::{qualify, Anchor, Entity, RecordKind, Reference, ReferenceSite, ReferenceTarget};
