//! PostgreSQL-backed record collections.
//!
//! Each row of a collection is one `tracking_rows` record holding its cells as
//! JSONB (`[{text, link}]`, indexed from column A). Rows are inserted, never
//! upserted: a second write to the same row index is rejected.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;

use crate::storage::{Cell, CellRange, RecordStore, StoreError};

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
    spreadsheet_id: String,
}

impl PgRecordStore {
    pub fn new(pool: PgPool, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            pool,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    /// Writes the header row of `collection` if it is not there yet.
    pub async fn ensure_header(
        &self,
        collection: &str,
        first_column: usize,
        headers: &[&str],
    ) -> Result<(), StoreError> {
        let cells = padded(first_column, headers.iter().map(|h| Cell::text(*h)).collect());
        sqlx::query(
            r#"
            INSERT INTO tracking_rows (spreadsheet_id, collection, row_index, cells)
            VALUES ($1, $2, 1, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&self.spreadsheet_id)
        .bind(collection)
        .bind(Json(cells))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn padded(first_column: usize, cells: Vec<Cell>) -> Vec<Cell> {
    let mut row = vec![Cell::default(); first_column];
    row.extend(cells);
    row
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn read_rows(
        &self,
        collection: &str,
        range: CellRange,
    ) -> Result<Vec<Vec<String>>, StoreError> {
        let rows: Vec<(i32, Json<Vec<Cell>>)> = sqlx::query_as(
            r#"
            SELECT row_index, cells
            FROM tracking_rows
            WHERE spreadsheet_id = $1 AND collection = $2 AND row_index >= $3
            ORDER BY row_index
            "#,
        )
        .bind(&self.spreadsheet_id)
        .bind(collection)
        .bind(range.first_row as i32)
        .fetch_all(&self.pool)
        .await?;

        debug!("Read {} rows from \"{collection}\"!{range}", rows.len());

        Ok(rows
            .into_iter()
            .map(|(_, Json(cells))| range.project(&cells))
            .collect())
    }

    async fn insert_row(
        &self,
        collection: &str,
        row: usize,
        first_column: usize,
        cells: &[Cell],
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO tracking_rows (spreadsheet_id, collection, row_index, cells)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&self.spreadsheet_id)
        .bind(collection)
        .bind(row as i32)
        .bind(Json(padded(first_column, cells.to_vec())))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RowTaken {
                collection: collection.to_string(),
                row,
            });
        }
        Ok(())
    }

    async fn update_cell(
        &self,
        collection: &str,
        row: usize,
        column: usize,
        cell: &Cell,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<Json<Vec<Cell>>> = sqlx::query_scalar(
            r#"
            SELECT cells FROM tracking_rows
            WHERE spreadsheet_id = $1 AND collection = $2 AND row_index = $3
            FOR UPDATE
            "#,
        )
        .bind(&self.spreadsheet_id)
        .bind(collection)
        .bind(row as i32)
        .fetch_optional(&mut *tx)
        .await?;

        let Json(mut cells) = existing.ok_or_else(|| StoreError::RowMissing {
            collection: collection.to_string(),
            row,
        })?;
        if cells.len() <= column {
            cells.resize(column + 1, Cell::default());
        }
        cells[column] = cell.clone();

        sqlx::query(
            r#"
            UPDATE tracking_rows SET cells = $4, updated_at = now()
            WHERE spreadsheet_id = $1 AND collection = $2 AND row_index = $3
            "#,
        )
        .bind(&self.spreadsheet_id)
        .bind(collection)
        .bind(row as i32)
        .bind(Json(cells))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
