//! Per-record submission.
//!
//! Steps for one record, in order: validate, take the artifact-name lock,
//! duplicate check, upsert the cover-letter document and the HTML and JSON
//! snapshots, append the tracking row. The optional CV and cover-letter tasks
//! then run concurrently and are both awaited before the record is reported.
//! Their failures are reported in the summary and never undo the row.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{Local, NaiveDate};
use serde::{Serialize, Serializer};
use tracing::{info, instrument, warn, Instrument};
use uuid::Uuid;

use crate::config::{ResolvedOptions, SharedFields};
use crate::generation::cover_letter::CoverLetterWriter;
use crate::generation::cv::CvTailor;
use crate::generation::GenerationError;
use crate::models::dates::normalize_date;
use crate::models::{DedupKey, JobRecord, RecordError};
use crate::storage::upsert::{upsert_by_name, ArtifactLocks};
use crate::storage::{mime, DocumentStore, RecordStore, StoredRef};
use crate::submission::dedup::{find_duplicate, DuplicateCheck};
use crate::submission::naming::ArtifactNames;
use crate::submission::row::{build_row, cv_link_cell, find_row, next_row, CV_LINK_COLUMN, FIRST_COLUMN};
use crate::submission::SubmitError;

/// Result of one generation task, serialized as `skipped`, `done` or `failed: <reason>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Skipped,
    Done,
    Failed(String),
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Skipped => write!(f, "skipped"),
            TaskOutcome::Done => write!(f, "done"),
            TaskOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

impl Serialize for TaskOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub cv: TaskOutcome,
    pub cover_letter: TaskOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub json_file: String,
    pub sheet_row: usize,
    pub cover_letter_url: String,
    pub html_url: String,
    pub json_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_url: Option<String>,
    pub generation: GenerationReport,
    pub extras: SharedFields,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CvRebuild {
    pub pdf_file: String,
    pub cv_url: String,
    /// `None` when no tracking row matched; the PDF is uploaded regardless.
    pub sheet_row: Option<usize>,
}

/// The JSON snapshot: the record plus the shared folder ids.
#[derive(Serialize)]
struct Snapshot<'a> {
    #[serde(flatten)]
    record: &'a JobRecord,
    #[serde(flatten)]
    extras: &'a SharedFields,
}

#[derive(Clone)]
pub struct Submitter {
    records: Arc<dyn RecordStore>,
    documents: Arc<dyn DocumentStore>,
    cv: Arc<CvTailor>,
    cover_letters: Arc<CoverLetterWriter>,
    options: Arc<ResolvedOptions>,
    locks: ArtifactLocks,
}

impl Submitter {
    pub fn new(
        records: Arc<dyn RecordStore>,
        documents: Arc<dyn DocumentStore>,
        cv: Arc<CvTailor>,
        cover_letters: Arc<CoverLetterWriter>,
        options: Arc<ResolvedOptions>,
    ) -> Self {
        Self {
            records,
            documents,
            cv,
            cover_letters,
            options,
            locks: ArtifactLocks::new(),
        }
    }

    pub async fn submit(&self, record: JobRecord) -> Result<Summary, SubmitError> {
        self.submit_on(record, Local::now().date_naive()).await
    }

    /// Submits `record` with artifact names stamped for `submitted_on`.
    #[instrument(
        skip_all,
        fields(submission_id = %Uuid::new_v4(), title = %record.title, company = %record.company)
    )]
    pub async fn submit_on(
        &self,
        record: JobRecord,
        submitted_on: NaiveDate,
    ) -> Result<Summary, SubmitError> {
        let mut record = record.normalized();
        record.validate()?;

        let names = ArtifactNames::new(&record.company, &record.title, submitted_on);
        let _guard = self.locks.lock(names.base()).await;

        let key = record.dedup_key();
        if let DuplicateCheck::ExistsIn(collection) =
            find_duplicate(self.records.as_ref(), &self.options.collections, &key).await?
        {
            warn!("Duplicate job, already in \"{collection}\"");
            return Err(SubmitError::Duplicate(collection));
        }

        let documents = self.documents.as_ref();
        let document = upsert_by_name(
            documents,
            &self.options.cover_letters_folder,
            names.document(),
            mime::DOCUMENT,
            Bytes::new(),
        )
        .await?;
        record.generated_document_ref = document.id.clone();

        let html = upsert_by_name(
            documents,
            &self.options.html_folder,
            &names.html(),
            mime::HTML,
            Bytes::from(record.html_content.clone()),
        )
        .await?;

        let snapshot = serde_json::to_vec_pretty(&Snapshot {
            record: &record,
            extras: &self.options.shared,
        })?;
        let json = upsert_by_name(
            documents,
            &self.options.snapshots_folder,
            &names.json(),
            mime::JSON,
            Bytes::from(snapshot),
        )
        .await?;
        info!("Artifacts stored as {}", names.base());

        let collection = self.options.primary_collection();
        let row = next_row(self.records.as_ref(), collection).await?;
        let cells = build_row(&record, &document.view_url, &html.view_url, &self.options.shared);
        self.records
            .insert_row(collection, row, FIRST_COLUMN, &cells)
            .await?;
        info!("Appended row {row} to \"{collection}\"");

        let (generation, cv_url) = self.run_generation(record, &names, &document.id, row).await;

        Ok(Summary {
            json_file: names.json(),
            sheet_row: row,
            cover_letter_url: document.view_url,
            html_url: html.view_url,
            json_url: json.view_url,
            cv_url,
            generation,
            extras: self.options.shared.clone(),
        })
    }

    /// Spawns the requested generation tasks and waits for both.
    async fn run_generation(
        &self,
        record: JobRecord,
        names: &ArtifactNames,
        document_id: &str,
        row: usize,
    ) -> (GenerationReport, Option<String>) {
        let settings = record.generation_settings.clone();
        let record = Arc::new(record);

        let cv_task = settings.generate_cv.then(|| {
            let submitter = self.clone();
            let record = record.clone();
            let name = names.base().to_string();
            tokio::spawn(
                async move { submitter.tailor_and_link(&record, &name, row).await }
                    .in_current_span(),
            )
        });

        let letter_task = settings.generate_cover_letter.then(|| {
            let writer = self.cover_letters.clone();
            let record = record.clone();
            let document_id = document_id.to_string();
            tokio::spawn(
                async move { writer.write(&record, &document_id).await }.in_current_span(),
            )
        });

        let (cv, cv_url) = match cv_task {
            None => (TaskOutcome::Skipped, None),
            Some(task) => match task.await {
                Ok(Ok(stored)) => (TaskOutcome::Done, Some(stored.view_url)),
                Ok(Err(e)) => {
                    warn!("CV generation failed: {e}");
                    (TaskOutcome::Failed(e.to_string()), None)
                }
                Err(e) => {
                    warn!("CV generation task aborted: {e}");
                    (TaskOutcome::Failed(e.to_string()), None)
                }
            },
        };

        let cover_letter = match letter_task {
            None => TaskOutcome::Skipped,
            Some(task) => match task.await {
                Ok(Ok(())) => TaskOutcome::Done,
                Ok(Err(e)) => {
                    warn!("Cover letter generation failed: {e}");
                    TaskOutcome::Failed(e.to_string())
                }
                Err(e) => {
                    warn!("Cover letter task aborted: {e}");
                    TaskOutcome::Failed(e.to_string())
                }
            },
        };

        (GenerationReport { cv, cover_letter }, cv_url)
    }

    async fn tailor_and_link(
        &self,
        record: &JobRecord,
        artifact_name: &str,
        row: usize,
    ) -> Result<StoredRef, GenerationError> {
        let stored = self.cv.tailor(record, artifact_name).await?;
        self.records
            .update_cell(
                self.options.primary_collection(),
                row,
                CV_LINK_COLUMN,
                &cv_link_cell(&record.created_at, &stored.view_url),
            )
            .await?;
        Ok(stored)
    }

    pub async fn rebuild_cv(&self, key: DedupKey) -> Result<CvRebuild, SubmitError> {
        self.rebuild_cv_on(key, Local::now().date_naive()).await
    }

    /// Compiles the CV workspace as it is, uploads the PDF and relinks the tracking row.
    #[instrument(skip_all, fields(title = %key.title, company = %key.company))]
    pub async fn rebuild_cv_on(
        &self,
        key: DedupKey,
        submitted_on: NaiveDate,
    ) -> Result<CvRebuild, SubmitError> {
        let key = DedupKey {
            title: key.title.trim().to_string(),
            company: key.company.trim().to_string(),
            created_at: normalize_date(key.created_at.trim()),
        };
        if key.title.is_empty() {
            return Err(RecordError::MissingField("title").into());
        }
        if key.company.is_empty() {
            return Err(RecordError::MissingField("company").into());
        }

        let names = ArtifactNames::new(&key.company, &key.title, submitted_on);
        let _guard = self.locks.lock(names.base()).await;

        let stored = self.cv.publish(names.base(), None).await?;

        let collection = self.options.primary_collection();
        let sheet_row = match find_row(self.records.as_ref(), collection, &key).await? {
            Some(row) => {
                self.records
                    .update_cell(
                        collection,
                        row,
                        CV_LINK_COLUMN,
                        &cv_link_cell(&key.created_at, &stored.view_url),
                    )
                    .await?;
                info!("Linked rebuilt CV into row {row} of \"{collection}\"");
                Some(row)
            }
            None => {
                warn!("No row in \"{collection}\" matches the rebuilt CV; link not written");
                None
            }
        };

        Ok(CvRebuild {
            pdf_file: names.pdf(),
            cv_url: stored.view_url,
            sheet_row,
        })
    }

    /// Loads the JSON snapshot named `name` (`.json` is appended when missing).
    pub async fn snapshot(&self, name: &str) -> Result<serde_json::Value, SubmitError> {
        let file_name = if name.ends_with(".json") {
            name.to_string()
        } else {
            format!("{name}.json")
        };

        let ids = self
            .documents
            .list(&self.options.snapshots_folder, &file_name, mime::JSON)
            .await?;
        let id = match ids.as_slice() {
            [] => return Err(SubmitError::SnapshotMissing(file_name)),
            [id] => id,
            _ => return Err(SubmitError::SnapshotAmbiguous(file_name)),
        };

        let body = self.documents.get(id).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
