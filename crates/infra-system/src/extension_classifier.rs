// Extension-based file classifier

use std::path::Path;

use tracing::info;

use docbatch_core::port::file_classifier::{extension_matches, normalize_extension};
use docbatch_core::port::FileClassifier;

/// Document extensions handled out of the box.
const DEFAULT_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "doc", "odt", "xlsx", "xls", "ods", "pptx", "ppt", "odp", "txt", "md",
    "markdown", "html", "htm", "xhtml", "xml", "json", "csv",
];

/// Classifier driven by an extension allowlist.
///
/// A per-call filter narrows the decision for that call; the classifier's
/// own list is the fallback. An empty per-call filter is treated as
/// absent.
pub struct ExtensionClassifier {
    supported: Vec<String>,
}

impl ExtensionClassifier {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            supported: extensions
                .into_iter()
                .map(|e| normalize_extension(e.as_ref()))
                .collect(),
        }
    }

    /// Add an extension to the supported set.
    pub fn register(&mut self, extension: &str) {
        let normalized = normalize_extension(extension);
        if !self.supported.contains(&normalized) {
            info!(extension = %normalized, "registered extension");
            self.supported.push(normalized);
        }
    }

    pub fn supported_extensions(&self) -> &[String] {
        &self.supported
    }
}

impl Default for ExtensionClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS.iter().copied())
    }
}

impl FileClassifier for ExtensionClassifier {
    fn should_process(&self, path: &Path, extension_filter: Option<&[String]>) -> bool {
        match extension_filter {
            Some(filter) if !filter.is_empty() => extension_matches(path, Some(filter)),
            _ => extension_matches(path, Some(&self.supported)),
        }
    }
}
