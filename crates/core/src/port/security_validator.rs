// Path security validation port

use std::path::Path;

use thiserror::Error;

/// Security validation errors
#[derive(Error, Debug, Clone)]
pub enum SecurityError {
    #[error("Path does not exist: {0}")]
    NotFound(String),

    #[error("Path rejected: {0}")]
    Rejected(String),
}

/// Security validator port
///
/// Gate run before any scheduling: both roots of a directory batch must
/// pass, otherwise nothing is dispatched.
pub trait SecurityValidator: Send + Sync {
    /// Validate a path that will be read from.
    fn validate_input(&self, path: &Path) -> Result<(), SecurityError>;

    /// Validate a path that will be created or written under.
    fn validate_output(&self, path: &Path) -> Result<(), SecurityError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    /// Validator that accepts every path
    pub struct AllowAllValidator;

    impl SecurityValidator for AllowAllValidator {
        fn validate_input(&self, _path: &Path) -> Result<(), SecurityError> {
            Ok(())
        }

        fn validate_output(&self, _path: &Path) -> Result<(), SecurityError> {
            Ok(())
        }
    }

    /// Validator that rejects input and/or output paths with fixed reasons
    pub struct RejectingValidator {
        reject_input: Option<String>,
        reject_output: Option<String>,
    }

    impl RejectingValidator {
        pub fn inputs(reason: impl Into<String>) -> Self {
            Self {
                reject_input: Some(reason.into()),
                reject_output: None,
            }
        }

        pub fn outputs(reason: impl Into<String>) -> Self {
            Self {
                reject_input: None,
                reject_output: Some(reason.into()),
            }
        }
    }

    impl SecurityValidator for RejectingValidator {
        fn validate_input(&self, _path: &Path) -> Result<(), SecurityError> {
            match &self.reject_input {
                Some(reason) => Err(SecurityError::Rejected(reason.clone())),
                None => Ok(()),
            }
        }

        fn validate_output(&self, _path: &Path) -> Result<(), SecurityError> {
            match &self.reject_output {
                Some(reason) => Err(SecurityError::Rejected(reason.clone())),
                None => Ok(()),
            }
        }
    }
}
