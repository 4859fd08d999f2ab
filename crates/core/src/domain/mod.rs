// Domain Layer - Pure business logic and entities

pub mod error;
pub mod file_outcome;
pub mod job;
pub mod outcome;

// Re-exports
pub use error::DomainError;
pub use file_outcome::FileOutcome;
pub use job::{ExecutionMode, Job, JobState, TaskId};
pub use outcome::{BatchResult, ErrorInfo, ErrorKind, ExecutionStamp, Outcome};
