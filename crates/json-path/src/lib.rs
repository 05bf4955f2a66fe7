//! # Atlas JSON Path
//!
//! Structural addressing for JSON configuration documents.
//!
//! ## Pipeline
//!
//! ```text
//! Document text
//!     │
//!     ├──> locate(path)            └─> tightest source Range of the value
//!     ├──> value_at(path)          └─> parsed serde_json::Value
//!     └──> path_at_position(pos)   └─> structural JsonPath under the cursor
//! ```
//!
//! Parsing goes through tree-sitter's JSON grammar, which produces a usable
//! tree even for documents that are mid-edit (trailing commas, a key being
//! typed). Addressing misses return `None`; nothing in this crate panics on
//! malformed input.

mod locator;
mod path;
mod position;

pub use locator::{locate, path_at_position, value_at};
pub use path::{JsonPath, PathSegment};
pub use position::{Position, Range};
