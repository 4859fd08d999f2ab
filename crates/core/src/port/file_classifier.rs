// File classification port

use std::path::Path;

/// File classifier port
///
/// Decides which enumerated paths are convertible documents. The optional
/// per-call filter narrows the classifier's own supported set.
pub trait FileClassifier: Send + Sync {
    fn should_process(&self, path: &Path, extension_filter: Option<&[String]>) -> bool;
}

/// Lowercase an extension and strip a leading dot, so "PDF", ".pdf" and
/// "pdf" all compare equal.
pub fn normalize_extension(raw: &str) -> String {
    raw.trim_start_matches('.').to_ascii_lowercase()
}

/// True when `path`'s extension matches `filter` (already normalized);
/// an empty filter matches nothing, `None` matches everything.
pub fn extension_matches(path: &Path, filter: Option<&[String]>) -> bool {
    match filter {
        None => true,
        Some(allowed) => path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| allowed.iter().any(|a| a == &normalize_extension(e)))
            .unwrap_or(false),
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    /// Classifier that admits every path (still honors the per-call filter)
    pub struct AcceptAllClassifier;

    impl FileClassifier for AcceptAllClassifier {
        fn should_process(&self, path: &Path, extension_filter: Option<&[String]>) -> bool {
            extension_matches(path, extension_filter)
        }
    }
}
