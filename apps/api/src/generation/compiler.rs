//! External LaTeX compiler.
//!
//! The compiler runs in a working directory holding the main document and its
//! content fragment, and leaves `<main stem>.pdf` next to them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::info;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("LaTeX build failed (exit code {code:?})")]
    Failed {
        code: Option<i32>,
        diagnostics: String,
    },
}

impl CompileError {
    /// Captured compiler output, if the compiler ran at all.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            CompileError::Failed { diagnostics, .. } => Some(diagnostics),
            CompileError::Spawn { .. } => None,
        }
    }
}

#[async_trait]
pub trait PdfCompiler: Send + Sync {
    /// Compiles `main_document` inside `workdir` and returns the produced PDF path.
    async fn compile(&self, workdir: &Path, main_document: &str) -> Result<PathBuf, CompileError>;
}

/// `latexmk -pdf -silent <main>` with a C locale to keep diagnostics stable.
#[derive(Debug, Clone)]
pub struct Latexmk {
    program: String,
}

impl Default for Latexmk {
    fn default() -> Self {
        Self {
            program: "latexmk".to_string(),
        }
    }
}

/// `cv.tex` → `cv.pdf`
pub fn pdf_name(main_document: &str) -> String {
    let stem = Path::new(main_document)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(main_document);
    format!("{stem}.pdf")
}

#[async_trait]
impl PdfCompiler for Latexmk {
    async fn compile(&self, workdir: &Path, main_document: &str) -> Result<PathBuf, CompileError> {
        info!("Building {} with {}", main_document, self.program);

        let output = Command::new(&self.program)
            .args(["-pdf", "-silent", main_document])
            .current_dir(workdir)
            .env("LC_ALL", "C")
            .env("LANG", "C")
            .output()
            .await
            .map_err(|source| CompileError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let mut diagnostics = String::from_utf8_lossy(&output.stderr).into_owned();
            if diagnostics.trim().is_empty() {
                diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
            }
            return Err(CompileError::Failed {
                code: output.status.code(),
                diagnostics,
            });
        }

        Ok(workdir.join(pdf_name(main_document)))
    }
}
