use crate::error::Result;
use crate::store::IndexStore;
use atlas_scanner::{Entity, Reference};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSnapshot {
    schema_version: u32,
    /// Milliseconds since the UNIX epoch of the last completed build.
    timestamp: u64,
    items: PersistedItems,
    files: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedItems {
    entities: Vec<Entity>,
    references: Vec<Reference>,
}

impl IndexStore {
    /// Load a persisted snapshot.
    ///
    /// A missing, corrupt, or incompatible snapshot is not an error: the
    /// store starts empty and the caller triggers a full rebuild.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(_) => return Self::new(),
        };
        let persisted: PersistedSnapshot = match serde_json::from_slice(&bytes) {
            Ok(persisted) => persisted,
            Err(err) => {
                log::warn!(
                    "Discarding corrupt snapshot {}: {err}; starting from empty state",
                    path.display()
                );
                return Self::new();
            }
        };
        if persisted.schema_version != SNAPSHOT_SCHEMA_VERSION {
            log::warn!(
                "Discarding snapshot {} with schema_version {} (expected {SNAPSHOT_SCHEMA_VERSION})",
                path.display(),
                persisted.schema_version
            );
            return Self::new();
        }
        Self::from_parts(
            persisted.items.entities,
            persisted.items.references,
            persisted.files,
            persisted.timestamp,
        )
    }

    /// Persist the full snapshot atomically (write-to-temp, then rename).
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let (entities, references, files) = self.parts();
        let persisted = PersistedSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            timestamp: self.last_built_ms(),
            items: PersistedItems {
                entities: entities.to_vec(),
                references: references.to_vec(),
            },
            files: files.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&persisted)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
