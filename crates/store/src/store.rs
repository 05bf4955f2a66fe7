use atlas_scanner::{Entity, Reference};
use std::collections::{BTreeMap, HashSet};

/// The mutable record index: entities and references keyed by the file that
/// produced them, plus the per-file last-seen modification times.
///
/// There is no ambient instance; callers construct and own their store and
/// pass it to the query layer explicitly.
#[derive(Debug, Clone, Default)]
pub struct IndexStore {
    entities: Vec<Entity>,
    references: Vec<Reference>,
    files: BTreeMap<String, u64>,
    last_built_ms: u64,
}

impl IndexStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every record produced by `doc` with a fresh generation and
    /// advance the file's modification time.
    ///
    /// Delete-before-insert makes the call idempotent: repeating it with the
    /// same inputs leaves the store in the same end state. The mtime is only
    /// recorded together with the new records, never ahead of them.
    pub fn replace_file(
        &mut self,
        doc: &str,
        entities: Vec<Entity>,
        references: Vec<Reference>,
        mtime_ms: u64,
    ) {
        self.drop_records(doc);
        self.entities.extend(entities);
        self.references.extend(references);
        self.files.insert(doc.to_string(), mtime_ms);
    }

    /// Drop every record and the mtime entry of a deleted file.
    pub fn remove_file(&mut self, doc: &str) -> bool {
        self.drop_records(doc);
        self.files.remove(doc).is_some()
    }

    /// Drop records of files that are no longer part of the corpus.
    /// Returns how many files were purged.
    pub fn purge_missing(&mut self, live: &HashSet<String>) -> usize {
        let stale: Vec<String> = self
            .files
            .keys()
            .filter(|doc| !live.contains(*doc))
            .cloned()
            .collect();
        for doc in &stale {
            self.remove_file(doc);
        }
        stale.len()
    }

    fn drop_records(&mut self, doc: &str) {
        self.entities.retain(|entity| entity.doc != doc);
        self.references
            .retain(|reference| reference.from.anchor.doc != doc);
    }

    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    #[must_use]
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Last-seen modification time of a file, milliseconds since epoch.
    #[must_use]
    pub fn file_mtime(&self, doc: &str) -> Option<u64> {
        self.files.get(doc).copied()
    }

    #[must_use]
    pub const fn files(&self) -> &BTreeMap<String, u64> {
        &self.files
    }

    #[must_use]
    pub const fn last_built_ms(&self) -> u64 {
        self.last_built_ms
    }

    pub fn set_last_built_ms(&mut self, timestamp_ms: u64) {
        self.last_built_ms = timestamp_ms;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.references.is_empty() && self.files.is_empty()
    }

    pub(crate) fn from_parts(
        entities: Vec<Entity>,
        references: Vec<Reference>,
        files: BTreeMap<String, u64>,
        last_built_ms: u64,
    ) -> Self {
        Self {
            entities,
            references,
            files,
            last_built_ms,
        }
    }

    pub(crate) fn parts(&self) -> (&[Entity], &[Reference], &BTreeMap<String, u64>) {
        (&self.entities, &self.references, &self.files)
    }
}
