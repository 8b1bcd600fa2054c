pub mod dates;
pub mod job;

pub use job::{Deadline, DedupKey, GenerationSettings, JobRecord, RecordError};
