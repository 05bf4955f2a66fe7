use thiserror::Error;

/// Result type for scanning operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors that can occur while scanning a corpus document
#[derive(Error, Debug)]
pub enum ScanError {
    /// The document text is not valid JSON; the whole scan aborts and the
    /// caller keeps whatever records the previous scan produced.
    #[error("{doc}: parse error: {source}")]
    Parse {
        doc: String,
        #[source]
        source: serde_json::Error,
    },

    /// The path does not belong to the corpus layout (wrong directory, or a
    /// metadata file such as `license_info.json`).
    #[error("not a corpus document: {0}")]
    NotACorpusDocument(String),
}

impl ScanError {
    pub fn parse(doc: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            doc: doc.into(),
            source,
        }
    }
}
