//! Duplicate detection across the tracking collections.

use tracing::debug;

use crate::models::DedupKey;
use crate::storage::{RecordStore, StoreError};
use crate::submission::row::KEY_RANGE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateCheck {
    Unique,
    ExistsIn(String),
}

/// Scans `collections` in order and reports the first one holding `key`.
///
/// A failed read is returned as an error, never as `Unique`.
pub async fn find_duplicate(
    store: &dyn RecordStore,
    collections: &[String],
    key: &DedupKey,
) -> Result<DuplicateCheck, StoreError> {
    for collection in collections {
        let rows = store.read_rows(collection, KEY_RANGE).await?;
        debug!("Checked {} rows of \"{collection}\" for duplicates", rows.len());
        if rows.iter().any(|row| key.matches_row(row)) {
            return Ok(DuplicateCheck::ExistsIn(collection.clone()));
        }
    }
    Ok(DuplicateCheck::Unique)
}
