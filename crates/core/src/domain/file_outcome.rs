// Per-file result model for directory batch runs

use std::path::PathBuf;
use std::time::Duration;

/// Result of converting one file in a directory batch.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub input_path: PathBuf,
    /// Where the converted text was written; None when the file failed
    /// before an output path was assigned.
    pub output_path: Option<PathBuf>,
    pub success: bool,
    pub error: Option<String>,
    pub duration: Duration,
}

impl FileOutcome {
    pub fn succeeded(input_path: PathBuf, output_path: PathBuf, duration: Duration) -> Self {
        Self {
            input_path,
            output_path: Some(output_path),
            success: true,
            error: None,
            duration,
        }
    }

    pub fn failed(input_path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            input_path,
            output_path: None,
            success: false,
            error: Some(error.into()),
            duration: Duration::ZERO,
        }
    }

    pub fn failed_after(
        input_path: PathBuf,
        output_path: Option<PathBuf>,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            input_path,
            output_path,
            success: false,
            error: Some(error.into()),
            duration,
        }
    }
}

impl std::fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.success {
            write!(
                f,
                "OK {} ({:.2}s)",
                self.input_path.display(),
                self.duration.as_secs_f64()
            )
        } else {
            write!(
                f,
                "FAILED {}: {}",
                self.input_path.display(),
                self.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}
