// Path validation for batch roots

use std::path::{Component, Path};

use tracing::{debug, warn};

use docbatch_core::port::{SecurityError, SecurityValidator};

/// Validates the input and output roots of a directory batch.
///
/// Inputs must exist, contain no parent-directory references and not be
/// symbolic links. Output roots are held to the same traversal and
/// symlink rules and are created when missing.
pub struct PathGuard;

impl PathGuard {
    pub fn new() -> Self {
        Self
    }

    fn check_traversal(path: &Path) -> Result<(), SecurityError> {
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(SecurityError::Rejected(format!(
                "contains parent directory reference: {}",
                path.display()
            )));
        }
        Ok(())
    }

    fn check_symlink(path: &Path) -> Result<(), SecurityError> {
        let metadata = path
            .symlink_metadata()
            .map_err(|_| SecurityError::NotFound(path.display().to_string()))?;
        if metadata.file_type().is_symlink() {
            return Err(SecurityError::Rejected(format!(
                "is a symbolic link: {}",
                path.display()
            )));
        }
        Ok(())
    }
}

impl Default for PathGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityValidator for PathGuard {
    fn validate_input(&self, path: &Path) -> Result<(), SecurityError> {
        Self::check_traversal(path)?;
        Self::check_symlink(path)?;
        debug!(path = %path.display(), "input root accepted");
        Ok(())
    }

    fn validate_output(&self, path: &Path) -> Result<(), SecurityError> {
        Self::check_traversal(path)?;

        match path.symlink_metadata() {
            Ok(metadata) => {
                if metadata.file_type().is_symlink() {
                    return Err(SecurityError::Rejected(format!(
                        "is a symbolic link: {}",
                        path.display()
                    )));
                }
                if !metadata.is_dir() {
                    return Err(SecurityError::Rejected(format!(
                        "output path is not a directory: {}",
                        path.display()
                    )));
                }
            }
            Err(_) => {
                std::fs::create_dir_all(path).map_err(|e| {
                    warn!(path = %path.display(), error = %e, "cannot create output root");
                    SecurityError::Rejected(format!(
                        "cannot create directory for output: {}, error: {e}",
                        path.display()
                    ))
                })?;
                debug!(path = %path.display(), "output root created");
            }
        }
        Ok(())
    }
}
