use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scan error: {0}")]
    Scan(#[from] atlas_scanner::ScanError),

    #[error("Store error: {0}")]
    Store(#[from] atlas_store::StoreError),

    #[error("{0}")]
    Other(String),
}
