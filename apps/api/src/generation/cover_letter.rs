//! Cover-letter tailoring into an existing (placeholder) document.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use crate::generation::prompts::{COVER_LETTER_PROMPT_TEMPLATE, COVER_LETTER_SYSTEM};
use crate::generation::resume::{load_resume_body, resume_preset};
use crate::generation::{fill_placeholders, model_or_default, GenerationError};
use crate::llm_client::prompts::TRUTHFULNESS_INSTRUCTION;
use crate::llm_client::{ChatMessage, TextTransform};
use crate::models::job::DEFAULT_MAX_WORDS;
use crate::models::JobRecord;
use crate::storage::{DocumentStore, StoreError};

pub struct CoverLetterWriter {
    llm: Arc<dyn TextTransform>,
    documents: Arc<dyn DocumentStore>,
    resume_dir: PathBuf,
    default_model: String,
}

impl CoverLetterWriter {
    pub fn new(
        llm: Arc<dyn TextTransform>,
        documents: Arc<dyn DocumentStore>,
        resume_dir: PathBuf,
        default_model: String,
    ) -> Self {
        Self {
            llm,
            documents,
            resume_dir,
            default_model,
        }
    }

    /// Generates the letter and replaces the whole body of `document_id` with it.
    pub async fn write(&self, record: &JobRecord, document_id: &str) -> Result<(), GenerationError> {
        let settings = &record.generation_settings;
        let preset = resume_preset(&settings.resume_template).ok_or_else(|| {
            GenerationError::MissingPrerequisite(format!(
                "resume body for template {:?}",
                settings.resume_template
            ))
        })?;
        let resume = load_resume_body(&self.resume_dir, &preset).await;

        let prompt = build_prompt(record, &resume);
        let model = model_or_default(&settings.model, &self.default_model);
        info!(
            "Writing cover letter for {} @ {} (resume {preset}, model {model})",
            record.title, record.company
        );

        let letter = self
            .llm
            .complete(
                model,
                &[
                    ChatMessage::system(COVER_LETTER_SYSTEM),
                    ChatMessage::user(prompt),
                ],
            )
            .await?;

        replace_document_text(self.documents.as_ref(), document_id, &letter).await?;
        info!("Cover letter written to document {document_id}");
        Ok(())
    }
}

fn build_prompt(record: &JobRecord, resume: &str) -> String {
    let settings = &record.generation_settings;
    let max_words = if settings.max_words == 0 {
        DEFAULT_MAX_WORDS
    } else {
        settings.max_words
    };
    let max_words = max_words.to_string();
    fill_placeholders(
        COVER_LETTER_PROMPT_TEMPLATE,
        &[
            ("truthfulness", TRUTHFULNESS_INSTRUCTION),
            ("tone", &settings.tone),
            ("language", &settings.language),
            ("max_words", &max_words),
            ("title", &record.title),
            ("company", &record.company),
            ("job_description", &record.job_description),
            ("company_description", &record.company_description),
            ("resume", resume),
        ],
    )
}

/// Clears the document body and inserts `text` followed by a blank line.
///
/// Running it twice with the same text leaves exactly one copy.
pub async fn replace_document_text(
    store: &dyn DocumentStore,
    id: &str,
    text: &str,
) -> Result<(), StoreError> {
    let existing = store.get(id).await?;
    if !existing.is_empty() {
        debug!("Clearing {} bytes from document {id}", existing.len());
    }
    store
        .update(id, Bytes::from(format!("{}\n\n", text.trim_end())))
        .await?;
    Ok(())
}
