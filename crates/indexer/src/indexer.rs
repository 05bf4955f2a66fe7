use crate::error::{IndexerError, Result};
use crate::stats::RebuildStats;
use atlas_scanner::{CorpusLayout, DocumentProvider, DocumentScanner};
use atlas_store::IndexStore;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

/// Change notification for a single corpus file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEvent {
    Created,
    Changed,
    Deleted,
}

/// Default snapshot location for a corpus root.
#[must_use]
pub fn snapshot_path_for_root(root: &Path) -> PathBuf {
    root.join(".atlas").join("index.json")
}

/// Owns the store and keeps it consistent with the corpus.
///
/// All writes to the persisted snapshot go through this type; the query
/// layer only ever reads the in-memory store it exposes.
pub struct CorpusIndexer<P> {
    layout: CorpusLayout,
    provider: P,
    scanner: DocumentScanner<P>,
    snapshot_path: PathBuf,
    store: IndexStore,
}

impl<P: DocumentProvider + Clone> CorpusIndexer<P> {
    /// Open an indexer, loading a prior snapshot when one exists. A missing
    /// or corrupt snapshot starts from an empty store.
    pub async fn open(
        layout: CorpusLayout,
        provider: P,
        snapshot_path: impl Into<PathBuf>,
    ) -> Self {
        let snapshot_path = snapshot_path.into();
        let store = IndexStore::load(&snapshot_path).await;
        if store.is_empty() {
            log::info!("Starting from an empty index for {}", layout.root().display());
        } else {
            log::info!(
                "Loaded snapshot with {} files from {}",
                store.files().len(),
                snapshot_path.display()
            );
        }
        Self {
            scanner: DocumentScanner::new(layout.clone(), provider.clone()),
            layout,
            provider,
            snapshot_path,
            store,
        }
    }

    #[must_use]
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    #[must_use]
    pub fn layout(&self) -> &CorpusLayout {
        &self.layout
    }

    #[must_use]
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Rescan every eligible corpus file whose on-disk mtime is newer than
    /// the stored one, purge files that disappeared, and persist.
    ///
    /// A file that fails to scan keeps its previous generation of records;
    /// the failure is reported in the stats and the file's mtime is not
    /// advanced, so the next rebuild retries it.
    pub async fn rebuild_all(&mut self) -> RebuildStats {
        let start = Instant::now();
        let mut stats = RebuildStats::new();

        let mut live: HashSet<String> = HashSet::new();
        for (path, _role) in self.layout.enumerate() {
            let rel = self.layout.rel(&path);
            live.insert(rel.clone());
            stats.scanned += 1;

            let Some(mtime) = self.provider.mtime_ms(&path).await else {
                stats.add_error(format!("{rel}: unreadable metadata"));
                continue;
            };
            let changed = self
                .store
                .file_mtime(&rel)
                .is_none_or(|old| mtime > old);
            if !changed {
                stats.unchanged += 1;
                continue;
            }

            match self.scan_into_store(&path, &rel, mtime).await {
                Ok((entities, references)) => {
                    stats.changed += 1;
                    stats.add_records(entities, references);
                }
                Err(err) => {
                    log::warn!("Failed to scan {rel}: {err}");
                    stats.add_error(format!("{rel}: {err}"));
                }
            }
        }

        stats.removed = self.store.purge_missing(&live);
        self.store.set_last_built_ms(current_unix_ms());
        if let Err(err) = self.persist().await {
            log::warn!("Failed to persist snapshot: {err}");
            stats.add_error(err.to_string());
        }

        #[allow(clippy::cast_possible_truncation)]
        {
            stats.time_ms = start.elapsed().as_millis() as u64;
        }
        log::info!(
            "Rebuild completed: {} changed, {} unchanged, {} removed",
            stats.changed,
            stats.unchanged,
            stats.removed
        );
        stats
    }

    /// Apply one change notification and persist.
    ///
    /// `created` and `changed` both trigger a fresh read and scan; `deleted`
    /// drops the file's records. A parse failure surfaces as an error and
    /// leaves the prior records untouched.
    pub async fn apply_event(&mut self, path: &Path, event: FileEvent) -> Result<()> {
        if !self.layout.is_eligible(path) {
            return Ok(());
        }
        let rel = self.layout.rel(path);

        match event {
            FileEvent::Deleted => {
                if self.store.remove_file(&rel) {
                    log::info!("Removed records of deleted {rel}");
                }
            }
            FileEvent::Created | FileEvent::Changed => {
                // The file may already be gone again by the time the event
                // arrives; treat that as a deletion.
                let Some(mtime) = self.provider.mtime_ms(path).await else {
                    self.store.remove_file(&rel);
                    self.store.set_last_built_ms(current_unix_ms());
                    self.persist().await?;
                    return Ok(());
                };
                self.scan_into_store(path, &rel, mtime).await?;
            }
        }

        self.store.set_last_built_ms(current_unix_ms());
        self.persist().await?;
        Ok(())
    }

    /// Flush the snapshot; called on shutdown.
    pub async fn persist(&self) -> Result<()> {
        self.store.save(&self.snapshot_path).await?;
        Ok(())
    }

    async fn scan_into_store(
        &mut self,
        path: &Path,
        rel: &str,
        mtime: u64,
    ) -> Result<(usize, usize)> {
        let text = self
            .provider
            .read(path)
            .await
            .ok_or_else(|| IndexerError::Other(format!("{rel}: unreadable")))?;
        let outcome = self.scanner.scan(path, &text).await?;
        let counts = (outcome.entities.len(), outcome.references.len());
        self.store
            .replace_file(rel, outcome.entities, outcome.references, mtime);
        Ok(counts)
    }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .and_then(|duration| u64::try_from(duration.as_millis()).ok())
        .unwrap_or(0)
}
