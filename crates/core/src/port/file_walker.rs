// Directory enumeration port

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Walk errors
#[derive(Error, Debug)]
pub enum WalkError {
    #[error("Directory walk failed: {0}")]
    Failed(String),
}

/// File walker port
///
/// Yields candidate file paths under a root, either the whole tree or the
/// top level only. Ordering is stable for a given tree so batch task ids
/// are reproducible.
pub trait FileWalker: Send + Sync {
    fn walk(&self, root: &Path, recursive: bool) -> Result<Vec<PathBuf>, WalkError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    /// Walker that returns a fixed list regardless of root
    pub struct StaticWalker {
        paths: Vec<PathBuf>,
    }

    impl StaticWalker {
        pub fn new(paths: Vec<PathBuf>) -> Self {
            Self { paths }
        }
    }

    impl FileWalker for StaticWalker {
        fn walk(&self, _root: &Path, _recursive: bool) -> Result<Vec<PathBuf>, WalkError> {
            Ok(self.paths.clone())
        }
    }

    /// Walker whose every call fails
    pub struct FailingWalker;

    impl FileWalker for FailingWalker {
        fn walk(&self, root: &Path, _recursive: bool) -> Result<Vec<PathBuf>, WalkError> {
            Err(WalkError::Failed(format!(
                "injected walk failure under {}",
                root.display()
            )))
        }
    }
}
