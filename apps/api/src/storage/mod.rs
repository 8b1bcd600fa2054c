//! Storage seams: row-oriented record collections and a named document store.
//!
//! The submission pipeline only talks to these traits. Production wires
//! PostgreSQL (`sheets`) and S3 (`objects`); tests use in-memory fakes.

pub mod objects;
pub mod sheets;
pub mod upsert;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Content types of the artifacts the pipeline writes.
pub mod mime {
    /// The cover letter holder. Plain text in object storage.
    pub const DOCUMENT: &str = "text/plain; charset=utf-8";
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const PDF: &str = "application/pdf";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Object storage error: {0}")]
    Object(String),

    #[error("Row {row} in collection \"{collection}\" is already written")]
    RowTaken { collection: String, row: usize },

    #[error("Row {row} not found in collection \"{collection}\"")]
    RowMissing { collection: String, row: usize },

    #[error("Document {0} not found")]
    NotFound(String),
}

/// A single row cell: display text plus an optional hyperlink target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link: None,
        }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link: Some(url.into()),
        }
    }
}

/// A column span with open-ended rows, e.g. `B2:D` or `B2:B`.
///
/// Columns are zero-based (`A` = 0); rows are one-based like a spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub first_column: usize,
    pub last_column: usize,
    pub first_row: usize,
}

impl CellRange {
    /// Projects a stored row (indexed from column A) onto this range's columns.
    /// Trailing cells beyond the row's length are omitted.
    pub fn project(&self, cells: &[Cell]) -> Vec<String> {
        cells
            .iter()
            .skip(self.first_column)
            .take(self.last_column - self.first_column + 1)
            .map(|c| c.text.clone())
            .collect()
    }
}

/// `B2:D`
impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}",
            column_letters(self.first_column),
            self.first_row,
            column_letters(self.last_column)
        )
    }
}

/// `0` → `A`, `26` → `AA`
fn column_letters(column: usize) -> String {
    let mut n = column + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Row-oriented record collections (the tracking spreadsheet's sheets).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Returns the rows at or below `range.first_row`, in row order, projected onto the range.
    async fn read_rows(&self, collection: &str, range: CellRange)
        -> Result<Vec<Vec<String>>, StoreError>;

    /// Writes a new row. Never overwrites: an occupied row is `StoreError::RowTaken`.
    async fn insert_row(
        &self,
        collection: &str,
        row: usize,
        first_column: usize,
        cells: &[Cell],
    ) -> Result<(), StoreError>;

    async fn update_cell(
        &self,
        collection: &str,
        row: usize,
        column: usize,
        cell: &Cell,
    ) -> Result<(), StoreError>;
}

/// Reference to a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRef {
    pub id: String,
    pub view_url: String,
}

/// Named files grouped under parent folders.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Ids of the artifacts named `name` under `parent` with content type `mime`.
    async fn list(&self, parent: &str, name: &str, mime: &str) -> Result<Vec<String>, StoreError>;

    async fn create(
        &self,
        parent: &str,
        name: &str,
        mime: &str,
        content: Bytes,
    ) -> Result<StoredRef, StoreError>;

    async fn update(&self, id: &str, content: Bytes) -> Result<String, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Bytes, StoreError>;
}
