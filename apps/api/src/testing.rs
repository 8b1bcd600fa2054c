//! In-memory fakes for the storage, language-model and compiler seams.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::config::{Config, ResolvedOptions, SharedFields};
use crate::generation::compiler::{pdf_name, CompileError, PdfCompiler};
use crate::generation::cover_letter::CoverLetterWriter;
use crate::generation::cv::{CvTailor, CONTENT_FRAGMENT, MAIN_DOCUMENT};
use crate::generation::prompts::CV_SYSTEM;
use crate::llm_client::{ChatMessage, LlmError, TextTransform};
use crate::models::JobRecord;
use crate::scrape::ScraperRegistry;
use crate::state::AppState;
use crate::storage::{Cell, CellRange, DocumentStore, RecordStore, StoreError, StoredRef};
use crate::submission::Submitter;

// ─── Record collections ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryRecordStore {
    collections: Mutex<HashMap<String, BTreeMap<usize, Vec<Cell>>>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later read of `collection` fails.
    pub fn fail_reads_of(&self, collection: &str) {
        self.failing.lock().unwrap().insert(collection.to_string());
    }

    pub fn row_count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Cell at an absolute column index (`A` = 0).
    pub fn cell(&self, collection: &str, row: usize, column: usize) -> Option<Cell> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)?
            .get(&row)?
            .get(column)
            .cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn read_rows(
        &self,
        collection: &str,
        range: CellRange,
    ) -> Result<Vec<Vec<String>>, StoreError> {
        if self.failing.lock().unwrap().contains(collection) {
            return Err(StoreError::Object(format!("read of \"{collection}\" failed")));
        }
        Ok(self
            .collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|rows| {
                rows.range(range.first_row..)
                    .map(|(_, cells)| range.project(cells))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_row(
        &self,
        collection: &str,
        row: usize,
        first_column: usize,
        cells: &[Cell],
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let rows = collections.entry(collection.to_string()).or_default();
        if rows.contains_key(&row) {
            return Err(StoreError::RowTaken {
                collection: collection.to_string(),
                row,
            });
        }
        let mut padded = vec![Cell::default(); first_column];
        padded.extend_from_slice(cells);
        rows.insert(row, padded);
        Ok(())
    }

    async fn update_cell(
        &self,
        collection: &str,
        row: usize,
        column: usize,
        cell: &Cell,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let cells = collections
            .get_mut(collection)
            .and_then(|rows| rows.get_mut(&row))
            .ok_or_else(|| StoreError::RowMissing {
                collection: collection.to_string(),
                row,
            })?;
        if cells.len() <= column {
            cells.resize(column + 1, Cell::default());
        }
        cells[column] = cell.clone();
        Ok(())
    }
}

// ─── Documents ──────────────────────────────────────────────────────────────

struct MemoryDocument {
    id: String,
    parent: String,
    name: String,
    mime: String,
    content: Bytes,
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<Vec<MemoryDocument>>,
    deleted: Mutex<Vec<String>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids under `parent` named `name`, of any content type, in creation order.
    pub fn ids_named(&self, parent: &str, name: &str) -> Vec<String> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.parent == parent && d.name == name)
            .map(|d| d.id.clone())
            .collect()
    }

    pub fn text(&self, id: &str) -> String {
        let documents = self.documents.lock().unwrap();
        let document = documents
            .iter()
            .find(|d| d.id == id)
            .unwrap_or_else(|| panic!("no document {id}"));
        String::from_utf8_lossy(&document.content).into_owned()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list(&self, parent: &str, name: &str, mime: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.parent == parent && d.name == name && d.mime == mime)
            .map(|d| d.id.clone())
            .collect())
    }

    async fn create(
        &self,
        parent: &str,
        name: &str,
        mime: &str,
        content: Bytes,
    ) -> Result<StoredRef, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.documents.lock().unwrap().push(MemoryDocument {
            id: id.clone(),
            parent: parent.to_string(),
            name: name.to_string(),
            mime: mime.to_string(),
            content,
        });
        Ok(StoredRef {
            view_url: format!("memory://{parent}/{id}"),
            id,
        })
    }

    async fn update(&self, id: &str, content: Bytes) -> Result<String, StoreError> {
        let mut documents = self.documents.lock().unwrap();
        let document = documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        document.content = content;
        Ok(id.to_string())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut documents = self.documents.lock().unwrap();
        let before = documents.len();
        documents.retain(|d| d.id != id);
        if documents.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Bytes, StoreError> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.content.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

// ─── Language model ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

enum Script {
    Queue(Mutex<VecDeque<String>>),
    /// Answers by task so concurrent CV and letter calls need no ordering.
    Routed { cv: String, letter: String },
    Failing,
}

pub struct ScriptedLlm {
    script: Script,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedLlm {
    /// Replies with `responses` in order, then fails.
    pub fn new(responses: &[&str]) -> Self {
        Self::with(Script::Queue(Mutex::new(
            responses.iter().map(|r| r.to_string()).collect(),
        )))
    }

    pub fn routed(cv: &str, letter: &str) -> Self {
        Self::with(Script::Routed {
            cv: cv.to_string(),
            letter: letter.to_string(),
        })
    }

    pub fn failing() -> Self {
        Self::with(Script::Failing)
    }

    fn with(script: Script) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextTransform for ScriptedLlm {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            model: model.to_string(),
            messages: messages.to_vec(),
        });
        match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(LlmError::EmptyContent),
            Script::Routed { cv, letter } => {
                if messages.iter().any(|m| m.content == CV_SYSTEM) {
                    Ok(cv.clone())
                } else {
                    Ok(letter.clone())
                }
            }
            Script::Failing => Err(LlmError::Api {
                status: 500,
                message: "scripted failure".to_string(),
            }),
        }
    }
}

// ─── Compiler ───────────────────────────────────────────────────────────────

/// Writes a fake PDF embedding the content fragment it was given.
pub struct FakeCompiler {
    failure: Option<String>,
}

impl FakeCompiler {
    pub fn succeeding() -> Self {
        Self { failure: None }
    }

    pub fn failing(diagnostics: &str) -> Self {
        Self {
            failure: Some(diagnostics.to_string()),
        }
    }
}

#[async_trait]
impl PdfCompiler for FakeCompiler {
    async fn compile(&self, workdir: &Path, main_document: &str) -> Result<PathBuf, CompileError> {
        if let Some(diagnostics) = &self.failure {
            return Err(CompileError::Failed {
                code: Some(12),
                diagnostics: diagnostics.clone(),
            });
        }
        let content = std::fs::read_to_string(workdir.join(CONTENT_FRAGMENT)).unwrap_or_default();
        let pdf = workdir.join(pdf_name(main_document));
        std::fs::write(&pdf, format!("%PDF-fake\n{content}")).unwrap();
        Ok(pdf)
    }
}

// ─── Fixtures ───────────────────────────────────────────────────────────────

pub fn sample_record() -> JobRecord {
    JobRecord {
        title: "Backend Engineer".to_string(),
        company: "Acme".to_string(),
        created_at: "01/06/2025".to_string(),
        url: "https://acme.example/jobs/42".to_string(),
        location: "Oslo".to_string(),
        job_description: "Build Rust services.".to_string(),
        company_description: "Acme makes anvils.".to_string(),
        html_content: "<html><body>Backend Engineer at Acme</body></html>".to_string(),
        ..Default::default()
    }
}

pub fn test_options() -> ResolvedOptions {
    ResolvedOptions {
        spreadsheet_id: "Spreadsheet000000000001".to_string(),
        cover_letters_folder: "LettersFolder0000000001".to_string(),
        html_folder: "HtmlFolder00000000000001".to_string(),
        snapshots_folder: "JsonFolder00000000000001".to_string(),
        cv_folder: "CvFolder0000000000000001".to_string(),
        collections: ["Planned", "Sent", "Rejected", "Not applied"]
            .into_iter()
            .map(String::from)
            .collect(),
        shared: SharedFields {
            old_content_files: "TexFolder000000000000001".to_string(),
            job_postings_html: "HtmlFolder00000000000001".to_string(),
            cover_letters: "LettersFolder0000000001".to_string(),
            cvs: "CvFolder0000000000000001".to_string(),
        },
    }
}

pub fn test_config(workspace: &Path, submit_token: Option<&str>) -> Config {
    Config {
        database_url: "postgres://localhost/jobtrack_test".to_string(),
        s3_bucket: "jobtrack".to_string(),
        s3_endpoint: "http://localhost:9000".to_string(),
        s3_public_url: "http://localhost:9000".to_string(),
        aws_access_key_id: "test".to_string(),
        aws_secret_access_key: "test".to_string(),
        anthropic_api_key: None,
        openai_api_key: None,
        default_model: "gpt-4".to_string(),
        port: 3000,
        rust_log: "debug".to_string(),
        options_path: workspace.join("options.json"),
        cv_workspace: workspace.to_path_buf(),
        resume_text_dir: workspace.join("resumes"),
        submit_token: submit_token.map(str::to_string),
    }
}

pub struct TestApp {
    pub state: AppState,
    pub records: Arc<MemoryRecordStore>,
    pub documents: Arc<MemoryDocumentStore>,
    _workspace: tempfile::TempDir,
}

/// App state over in-memory stores, with a CV workspace holding only `cv.tex`.
pub fn test_state(submit_token: Option<&str>) -> TestApp {
    let workspace = tempfile::tempdir().unwrap();
    std::fs::write(workspace.path().join(MAIN_DOCUMENT), "\\input{content}").unwrap();

    let config = Arc::new(test_config(workspace.path(), submit_token));
    let options = Arc::new(test_options());
    let records = Arc::new(MemoryRecordStore::new());
    let documents = Arc::new(MemoryDocumentStore::new());
    let llm = Arc::new(ScriptedLlm::new(&[]));

    let cv = Arc::new(CvTailor::new(
        llm.clone(),
        Arc::new(FakeCompiler::succeeding()),
        documents.clone(),
        config.cv_workspace.clone(),
        options.cv_folder.clone(),
        config.default_model.clone(),
    ));
    let cover_letters = Arc::new(CoverLetterWriter::new(
        llm,
        documents.clone(),
        config.resume_text_dir.clone(),
        config.default_model.clone(),
    ));
    let submitter = Submitter::new(records.clone(), documents.clone(), cv, cover_letters, options);

    TestApp {
        state: AppState {
            config,
            submitter,
            scrapers: Arc::new(ScraperRegistry::default()),
        },
        records,
        documents,
        _workspace: workspace,
    }
}
