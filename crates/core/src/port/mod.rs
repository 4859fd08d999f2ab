// Port Layer - Interfaces for external dependencies

pub mod file_classifier;
pub mod file_walker;
pub mod job_executor;
pub mod resource_probe;
pub mod security_validator;
pub mod time_provider;

// Re-exports
pub use file_classifier::FileClassifier;
pub use file_walker::{FileWalker, WalkError};
pub use job_executor::{ExecError, JobExecutor};
pub use resource_probe::{ProbeError, ResourceProbe, ResourceSample};
pub use security_validator::{SecurityError, SecurityValidator};
pub use time_provider::{SystemTimeProvider, TimeProvider};
