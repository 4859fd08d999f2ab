// Filesystem enumeration via walkdir

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use docbatch_core::port::{FileWalker, WalkError};

/// Enumerates regular files under a root, recursively or top-level only.
/// Symlinks are not followed.
pub struct WalkdirWalker;

impl FileWalker for WalkdirWalker {
    fn walk(&self, root: &Path, recursive: bool) -> Result<Vec<PathBuf>, WalkError> {
        let mut walk = WalkDir::new(root).follow_links(false);
        if !recursive {
            walk = walk.max_depth(1);
        }

        let mut files = Vec::new();
        for entry in walk {
            let entry = entry.map_err(|e| WalkError::Failed(e.to_string()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        // Stable candidate order across platforms
        files.sort();

        debug!(
            root = %root.display(),
            recursive,
            files = files.len(),
            "walk complete"
        );
        Ok(files)
    }
}
