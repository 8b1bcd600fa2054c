//! Layout of a tracking row.
//!
//! Rows start at column B under a single header row. Columns B-E hold the
//! hyperlinked title, the hyperlinked company, the creation date and the
//! hyperlinked deadline; annotations and the shared folder ids follow.

use crate::config::SharedFields;
use crate::models::{DedupKey, JobRecord};
use crate::storage::{Cell, CellRange, RecordStore, StoreError};

pub const HEADER_ROWS: usize = 1;
pub const FIRST_DATA_ROW: usize = HEADER_ROWS + 1;
/// Column B.
pub const FIRST_COLUMN: usize = 1;
/// Column D, the creation date. A generated CV turns it into a link.
pub const CV_LINK_COLUMN: usize = 3;

/// `B2:D`: title, company, createdAt.
pub const KEY_RANGE: CellRange = CellRange {
    first_column: FIRST_COLUMN,
    last_column: FIRST_COLUMN + 2,
    first_row: FIRST_DATA_ROW,
};

/// `B2:B`, counted to find the next free row.
pub const TITLE_RANGE: CellRange = CellRange {
    first_column: FIRST_COLUMN,
    last_column: FIRST_COLUMN,
    first_row: FIRST_DATA_ROW,
};

pub const HEADERS: &[&str] = &[
    "Title",
    "Company",
    "Created",
    "Deadline",
    "Pros",
    "Cons",
    "Notes",
    "Sent",
    "Added",
    "Sector",
    "Location",
    "Industry",
    "Job function",
    "Work language",
    "Keywords",
    "Rejected",
    "Next steps",
    "Old content files",
    "Job postings HTML",
    "Cover letters",
    "CVs",
];

/// A link cell, or plain text when there is nothing to link to.
fn linked(text: &str, url: &str) -> Cell {
    if url.trim().is_empty() {
        Cell::text(text)
    } else {
        Cell::link(text, url)
    }
}

/// Cells for `record`, starting at `FIRST_COLUMN`.
pub fn build_row(
    record: &JobRecord,
    document_url: &str,
    html_url: &str,
    shared: &SharedFields,
) -> Vec<Cell> {
    let mut cells = vec![
        linked(&record.title, document_url),
        linked(&record.company, &record.url),
        Cell::text(&record.created_at),
        linked(record.deadline.display(), html_url),
    ];
    cells.extend(
        [
            &record.pros,
            &record.cons,
            &record.notes,
            &record.sent_at,
            &record.added_at,
            &record.sector,
            &record.location,
            &record.industry,
            &record.job_function,
            &record.work_language,
            &record.keywords,
            &record.rejected_at,
            &record.next_steps,
        ]
        .into_iter()
        .map(Cell::text),
    );
    cells.extend(shared.values().into_iter().map(Cell::text));
    cells
}

/// The createdAt cell, relabelled as a link to the generated CV.
pub fn cv_link_cell(created_at: &str, cv_url: &str) -> Cell {
    Cell::link(created_at, cv_url)
}

/// Index of the first free row: existing data rows plus the header offset.
pub async fn next_row(store: &dyn RecordStore, collection: &str) -> Result<usize, StoreError> {
    let rows = store.read_rows(collection, TITLE_RANGE).await?;
    Ok(rows.len() + FIRST_DATA_ROW)
}

/// Index of the row holding `key`, if any.
pub async fn find_row(
    store: &dyn RecordStore,
    collection: &str,
    key: &DedupKey,
) -> Result<Option<usize>, StoreError> {
    let rows = store.read_rows(collection, KEY_RANGE).await?;
    Ok(rows
        .iter()
        .position(|row| key.matches_row(row))
        .map(|i| i + FIRST_DATA_ROW))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Deadline;
    use crate::testing::{sample_record, test_options, MemoryRecordStore};

    #[test]
    fn test_ranges_match_a1_notation() {
        assert_eq!(KEY_RANGE.to_string(), "B2:D");
        assert_eq!(TITLE_RANGE.to_string(), "B2:B");
    }

    #[test]
    fn test_row_matches_header_width() {
        let row = build_row(&sample_record(), "d", "h", &test_options().shared);
        assert_eq!(row.len(), HEADERS.len());
    }

    #[test]
    fn test_leading_cells_are_linked() {
        let mut record = sample_record();
        record.deadline = Deadline::NotSpecified;
        let row = build_row(&record, "https://doc", "https://html", &test_options().shared);

        assert_eq!(row[0], Cell::link("Backend Engineer", "https://doc"));
        assert_eq!(row[1], Cell::link("Acme", "https://acme.example/jobs/42"));
        assert_eq!(row[2], Cell::text("01/06/2025"));
        assert_eq!(row[3], Cell::link("Not specified", "https://html"));
    }

    #[test]
    fn test_company_without_url_is_plain_text() {
        let mut record = sample_record();
        record.url.clear();
        let row = build_row(&record, "d", "h", &test_options().shared);
        assert_eq!(row[1], Cell::text("Acme"));
    }

    #[test]
    fn test_shared_fields_close_the_row() {
        let options = test_options();
        let row = build_row(&sample_record(), "d", "h", &options.shared);
        let tail: Vec<&str> = row[row.len() - 4..].iter().map(|c| c.text.as_str()).collect();
        assert_eq!(tail, options.shared.values().to_vec());
    }

    #[tokio::test]
    async fn test_rows_append_after_header() {
        let store = MemoryRecordStore::new();
        assert_eq!(next_row(&store, "Planned").await.unwrap(), 2);

        for expected in 2..5 {
            let row = next_row(&store, "Planned").await.unwrap();
            assert_eq!(row, expected);
            store
                .insert_row("Planned", row, FIRST_COLUMN, &[Cell::text(format!("job {row}"))])
                .await
                .unwrap();
        }
        assert_eq!(next_row(&store, "Planned").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_find_row_by_key() {
        let store = MemoryRecordStore::new();
        let record = sample_record();
        for (row, title) in [(2, "Other"), (3, record.title.as_str())] {
            let mut r = record.clone();
            r.title = title.to_string();
            store
                .insert_row("Planned", row, FIRST_COLUMN, &build_row(&r, "", "", &test_options().shared))
                .await
                .unwrap();
        }

        assert_eq!(
            find_row(&store, "Planned", &record.dedup_key()).await.unwrap(),
            Some(3)
        );
        let mut missing = record.dedup_key();
        missing.created_at = "02/06/2025".to_string();
        assert_eq!(find_row(&store, "Planned", &missing).await.unwrap(), None);
    }
}
