// Generation tasks: CV tailoring and cover-letter tailoring.
// All language-model calls go through llm_client::TextTransform.

pub mod compiler;
pub mod cover_letter;
pub mod cv;
pub mod prompts;
pub mod resume;

use std::path::{Component, Path};

use thiserror::Error;

use crate::generation::compiler::CompileError;
use crate::llm_client::LlmError;
use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Missing prerequisite: {0} not found")]
    MissingPrerequisite(String),

    #[error("Language model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("No LaTeX block found in LLM response (raw response saved to {0})")]
    MissingBlock(String),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl GenerationError {
    pub(crate) fn io(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| GenerationError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// The record's model, or the service default when the record leaves it empty.
pub fn model_or_default<'a>(requested: &'a str, default_model: &'a str) -> &'a str {
    let requested = requested.trim();
    if requested.is_empty() {
        default_model
    } else {
        requested
    }
}

/// `value` as a path, if it is exactly one plain component.
///
/// Template and resume names come from request bodies; anything with a
/// separator, `..`, or a root could resolve outside the directory it is
/// joined onto.
pub fn single_component(value: &str) -> Option<&Path> {
    let path = Path::new(value);
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(path),
        _ => None,
    }
}

/// Fills `{key}` placeholders in one pass. Substituted text is never scanned
/// again, and braces that name no known key are kept as they are.
pub fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let hit = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (close, *value))
        });
        match hit {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
