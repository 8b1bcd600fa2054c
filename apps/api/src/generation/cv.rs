//! CV tailoring: template, language model, LaTeX block, PDF, CV folder.
//!
//! The CV workspace holds the fixed main document (`cv.tex`), the current
//! content fragment (`content.tex`), per-language templates under
//! `contentTemplates/<language>/<template>.tex` and an archive of past
//! fragments in `oldContentFiles/`. Builds run in a scratch copy of the
//! workspace (subdirectories included, templates and archive left out) so
//! concurrent builds never read each other's fragment.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use crate::generation::compiler::PdfCompiler;
use crate::generation::prompts::{CV_PROMPT_TEMPLATE, CV_SYSTEM};
use crate::generation::{
    fill_placeholders, model_or_default, single_component, GenerationError,
};
use crate::llm_client::prompts::TRUTHFULNESS_INSTRUCTION;
use crate::llm_client::{ChatMessage, TextTransform};
use crate::models::{GenerationSettings, JobRecord};
use crate::storage::upsert::upsert_by_name;
use crate::storage::{mime, DocumentStore, StoredRef};

pub const MAIN_DOCUMENT: &str = "cv.tex";
pub const CONTENT_FRAGMENT: &str = "content.tex";
pub const TEMPLATES_DIR: &str = "contentTemplates";
pub const ARCHIVE_DIR: &str = "oldContentFiles";
pub const BUILD_ERRORS: &str = "builderrors.txt";

/// Workspace directories a build never needs.
const UNBUILT_DIRS: &[&str] = &[TEMPLATES_DIR, ARCHIVE_DIR];

const BLOCK_START: &str = r"\begin{greenbox}";
const BLOCK_END: &str = r"\vspace{2pt}";

pub struct CvTailor {
    llm: Arc<dyn TextTransform>,
    compiler: Arc<dyn PdfCompiler>,
    documents: Arc<dyn DocumentStore>,
    workspace: PathBuf,
    cv_folder: String,
    default_model: String,
}

impl CvTailor {
    pub fn new(
        llm: Arc<dyn TextTransform>,
        compiler: Arc<dyn PdfCompiler>,
        documents: Arc<dyn DocumentStore>,
        workspace: PathBuf,
        cv_folder: String,
        default_model: String,
    ) -> Self {
        Self {
            llm,
            compiler,
            documents,
            workspace,
            cv_folder,
            default_model,
        }
    }

    /// `contentTemplates/<language>/<template>.tex`. Both names must be a
    /// single path component.
    pub fn template_path(
        &self,
        settings: &GenerationSettings,
    ) -> Result<PathBuf, GenerationError> {
        let (Some(language), Some(template)) = (
            single_component(&settings.language),
            single_component(&settings.resume_template),
        ) else {
            return Err(GenerationError::MissingPrerequisite(format!(
                "template {:?} for language {:?}",
                settings.resume_template, settings.language
            )));
        };
        Ok(self
            .workspace
            .join(TEMPLATES_DIR)
            .join(language)
            .join(format!("{}.tex", template.display())))
    }

    /// Tailors the CV for `record` and uploads it as `<artifact_name>.pdf`.
    pub async fn tailor(
        &self,
        record: &JobRecord,
        artifact_name: &str,
    ) -> Result<StoredRef, GenerationError> {
        let settings = &record.generation_settings;
        let template_path = self.template_path(settings)?;
        let template = match tokio::fs::read_to_string(&template_path).await {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GenerationError::MissingPrerequisite(
                    template_path.display().to_string(),
                ))
            }
            Err(e) => return Err(GenerationError::io(&template_path)(e)),
        };

        let prompt = fill_placeholders(
            CV_PROMPT_TEMPLATE,
            &[
                ("truthfulness", TRUTHFULNESS_INSTRUCTION),
                ("language", &settings.language),
                ("title", &record.title),
                ("company", &record.company),
                ("job_description", &record.job_description),
                ("company_description", &record.company_description),
                ("template", &template),
            ],
        );

        let model = model_or_default(&settings.model, &self.default_model);
        info!(
            "Tailoring CV for {} @ {} (template {}, model {model})",
            record.title,
            record.company,
            template_path.display()
        );

        let response = self
            .llm
            .complete(
                model,
                &[ChatMessage::system(CV_SYSTEM), ChatMessage::user(prompt)],
            )
            .await?;

        let Some(content) = extract_content_block(&response) else {
            let side_file = self.workspace.join(format!("{artifact_name}.response.txt"));
            tokio::fs::write(&side_file, &response)
                .await
                .map_err(GenerationError::io(&side_file))?;
            return Err(GenerationError::MissingBlock(side_file.display().to_string()));
        };

        let current = self.workspace.join(CONTENT_FRAGMENT);
        tokio::fs::write(&current, content)
            .await
            .map_err(GenerationError::io(&current))?;

        let archive_dir = self.workspace.join(ARCHIVE_DIR);
        tokio::fs::create_dir_all(&archive_dir)
            .await
            .map_err(GenerationError::io(&archive_dir))?;
        let archived = archive_dir.join(format!("{artifact_name}.tex"));
        tokio::fs::write(&archived, content)
            .await
            .map_err(GenerationError::io(&archived))?;

        self.publish(artifact_name, Some(content)).await
    }

    /// Compiles the workspace (optionally with a fresh content fragment) and
    /// upserts the PDF as `<artifact_name>.pdf`.
    pub async fn publish(
        &self,
        artifact_name: &str,
        content: Option<&str>,
    ) -> Result<StoredRef, GenerationError> {
        let pdf = self.build_pdf(content).await?;
        let file_name = format!("{artifact_name}.pdf");
        let stored = upsert_by_name(
            self.documents.as_ref(),
            &self.cv_folder,
            &file_name,
            mime::PDF,
            pdf,
        )
        .await?;
        info!("Uploaded CV {file_name} ({})", stored.id);
        Ok(stored)
    }

    async fn build_pdf(&self, content: Option<&str>) -> Result<Bytes, GenerationError> {
        let main = self.workspace.join(MAIN_DOCUMENT);
        if !tokio::fs::try_exists(&main).await.unwrap_or(false) {
            return Err(GenerationError::MissingPrerequisite(
                main.display().to_string(),
            ));
        }

        let scratch = tempfile::tempdir().map_err(GenerationError::io(&self.workspace))?;
        copy_workspace(&self.workspace, scratch.path()).await?;
        if let Some(content) = content {
            let fragment = scratch.path().join(CONTENT_FRAGMENT);
            tokio::fs::write(&fragment, content)
                .await
                .map_err(GenerationError::io(&fragment))?;
        }

        let pdf_path = match self.compiler.compile(scratch.path(), MAIN_DOCUMENT).await {
            Ok(path) => path,
            Err(e) => {
                if let Some(diagnostics) = e.diagnostics() {
                    let log = self.workspace.join(BUILD_ERRORS);
                    match tokio::fs::write(&log, diagnostics).await {
                        Ok(()) => warn!("LaTeX build failed: see {} for details", log.display()),
                        Err(write_err) => {
                            warn!("LaTeX build failed and {} could not be written: {write_err}", log.display())
                        }
                    }
                }
                return Err(e.into());
            }
        };

        let pdf = tokio::fs::read(&pdf_path)
            .await
            .map_err(GenerationError::io(&pdf_path))?;
        Ok(Bytes::from(pdf))
    }
}

/// Returns the text from `\begin{greenbox}` through the last `\vspace{2pt}`.
pub fn extract_content_block(response: &str) -> Option<&str> {
    let start = response.find(BLOCK_START)?;
    let end = response.rfind(BLOCK_END)?;
    if end < start {
        return None;
    }
    Some(&response[start..end + BLOCK_END.len()])
}

/// Copies the build inputs of `from` into `to`, recursing into
/// subdirectories except the top-level `UNBUILT_DIRS`.
async fn copy_workspace(from: &Path, to: &Path) -> Result<(), GenerationError> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((source, target)) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&source)
            .await
            .map_err(GenerationError::io(&source))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(GenerationError::io(&source))?
        {
            let path = entry.path();
            let kind = entry.file_type().await.map_err(GenerationError::io(&path))?;
            let destination = target.join(entry.file_name());
            if kind.is_dir() {
                let unbuilt = source.as_path() == from
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| UNBUILT_DIRS.contains(&name));
                if unbuilt {
                    continue;
                }
                tokio::fs::create_dir(&destination)
                    .await
                    .map_err(GenerationError::io(&destination))?;
                pending.push((path, destination));
            } else if kind.is_file() {
                tokio::fs::copy(&path, &destination)
                    .await
                    .map_err(GenerationError::io(&path))?;
            }
        }
    }
    Ok(())
}
