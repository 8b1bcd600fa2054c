// Submission pipeline: duplicate check, artifact upserts, tracking row append
// and the optional generation tasks.

pub mod dedup;
pub mod handlers;
pub mod naming;
pub mod pipeline;
pub mod row;

use thiserror::Error;

use crate::generation::GenerationError;
use crate::models::RecordError;
use crate::storage::StoreError;

pub use pipeline::{Submitter, Summary};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Job already exists in collection \"{0}\"")]
    Duplicate(String),

    #[error(transparent)]
    Invalid(#[from] RecordError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("Could not serialize job snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("No job snapshot named {0}")]
    SnapshotMissing(String),

    #[error("More than one job snapshot named {0}")]
    SnapshotAmbiguous(String),
}
