//! Replace-by-name for stored artifacts, serialized per artifact name.
//!
//! The store has no atomic "overwrite by name", so an upsert is
//! delete-if-exists followed by create. Two submissions writing the same
//! name would race between those steps; `ArtifactLocks` serializes them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::info;

use crate::storage::{DocumentStore, StoreError, StoredRef};

/// Per-name async locks. Entries nobody holds are pruned on the next `lock` call.
#[derive(Clone, Default)]
pub struct ArtifactLocks {
    slots: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl ArtifactLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, name: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(name.to_string()).or_default().clone()
        };
        slot.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots.lock().unwrap().len()
    }
}

/// Deletes every artifact named `name` under `parent`, then creates the replacement.
///
/// Callers hold the `ArtifactLocks` guard for `name`.
pub async fn upsert_by_name(
    store: &dyn DocumentStore,
    parent: &str,
    name: &str,
    mime: &str,
    content: Bytes,
) -> Result<StoredRef, StoreError> {
    for id in store.list(parent, name, mime).await? {
        info!("Replacing existing artifact \"{name}\" ({id})");
        store.delete(&id).await?;
    }
    store.create(parent, name, mime, content).await
}
