use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// The seam through which corpus documents are read.
///
/// Resolution has to open candidate documents other than the one being
/// scanned; routing those reads through a trait keeps the scanner testable
/// against in-memory corpora.
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Document text, or `None` when the file does not exist or cannot be
    /// read. A missing candidate document is an ordinary addressing miss.
    async fn read(&self, path: &Path) -> Option<String>;

    /// Modification time in milliseconds since the UNIX epoch.
    async fn mtime_ms(&self, path: &Path) -> Option<u64>;
}

/// Filesystem-backed provider used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDocumentProvider;

#[async_trait]
impl DocumentProvider for FsDocumentProvider {
    async fn read(&self, path: &Path) -> Option<String> {
        tokio::fs::read_to_string(path).await.ok()
    }

    async fn mtime_ms(&self, path: &Path) -> Option<u64> {
        let metadata = tokio::fs::metadata(path).await.ok()?;
        let modified = metadata.modified().ok()?;
        let duration = modified.duration_since(SystemTime::UNIX_EPOCH).ok()?;
        u64::try_from(duration.as_millis()).ok()
    }
}

/// In-memory provider for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentProvider {
    files: Arc<std::sync::Mutex<HashMap<PathBuf, (String, u64)>>>,
}

impl MemoryDocumentProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, text: impl Into<String>, mtime_ms: u64) {
        let mut files = self.files.lock().unwrap_or_else(|poison| poison.into_inner());
        files.insert(path.into(), (text.into(), mtime_ms));
    }

    pub fn remove(&self, path: &Path) {
        let mut files = self.files.lock().unwrap_or_else(|poison| poison.into_inner());
        files.remove(path);
    }
}

#[async_trait]
impl DocumentProvider for MemoryDocumentProvider {
    async fn read(&self, path: &Path) -> Option<String> {
        let files = self.files.lock().unwrap_or_else(|poison| poison.into_inner());
        files.get(path).map(|(text, _)| text.clone())
    }

    async fn mtime_ms(&self, path: &Path) -> Option<u64> {
        let files = self.files.lock().unwrap_or_else(|poison| poison.into_inner());
        files.get(path).map(|(_, mtime)| *mtime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_provider_round_trips() {
        let provider = MemoryDocumentProvider::new();
        provider.insert("/corpus/a.json", "{}", 42);

        assert_eq!(
            provider.read(Path::new("/corpus/a.json")).await.as_deref(),
            Some("{}")
        );
        assert_eq!(provider.mtime_ms(Path::new("/corpus/a.json")).await, Some(42));
        assert_eq!(provider.read(Path::new("/corpus/b.json")).await, None);

        provider.remove(Path::new("/corpus/a.json"));
        assert_eq!(provider.read(Path::new("/corpus/a.json")).await, None);
    }
}
