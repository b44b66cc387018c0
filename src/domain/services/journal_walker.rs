//! Journal file discovery
//!
//! Recursively finds extracted journal streams (`...$J`) under a
//! directory. The walk is lazy; a directory that cannot be listed is
//! reported as an error instead of being skipped.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Suffix of an extracted journal data stream, compared case-insensitively
pub const JOURNAL_FILE_SUFFIX: &str = "$j";

/// Errors that can occur while walking a directory tree
#[derive(Error, Debug)]
pub enum WalkError {
    #[error("Failed to list directory {path}: {source}")]
    DirectoryList {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Returns whether a file name denotes an extracted journal stream
pub fn is_journal_file_name(name: &str) -> bool {
    name.to_lowercase().ends_with(JOURNAL_FILE_SUFFIX)
}

/// Lazy iterator over journal files below a root directory
pub struct JournalFileWalker {
    root: PathBuf,
    inner: walkdir::IntoIter,
}

impl JournalFileWalker {
    /// Starts a new walk; nothing is read until the first `next()`
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let inner = WalkDir::new(&root).into_iter();
        Self { root, inner }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Iterator for JournalFileWalker {
    type Item = Result<PathBuf, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(source) => {
                    let path = source
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    return Some(Err(WalkError::DirectoryList { path, source }));
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            let matches = is_journal_file_name(&entry.file_name().to_string_lossy());
            if matches && entry.path().is_file() {
                return Some(Ok(entry.into_path()));
            }
        }
    }
}
