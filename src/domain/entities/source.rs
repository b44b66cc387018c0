//! Source kind entity
//!
//! The classified form of an input locator.

use std::fmt;
use std::path::{Path, PathBuf};

/// What an input locator refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// An extracted `$J` stream stored as a regular file
    SingleFile(PathBuf),
    /// A directory tree searched for extracted `$J` files
    DirectoryTree(PathBuf),
    /// A live volume addressed by drive letter (`\\.\C:`)
    LogicalVolumeHandle(String),
    /// A volume shadow copy device path
    VolumeShadowHandle(String),
}

impl SourceKind {
    /// Returns a short name for the kind of source
    pub fn kind_name(&self) -> &'static str {
        match self {
            SourceKind::SingleFile(_) => "file",
            SourceKind::DirectoryTree(_) => "directory",
            SourceKind::LogicalVolumeHandle(_) => "logical volume",
            SourceKind::VolumeShadowHandle(_) => "volume shadow copy",
        }
    }

    /// Returns whether the source must be opened through a file system reader
    pub fn is_volume(&self) -> bool {
        matches!(
            self,
            SourceKind::LogicalVolumeHandle(_) | SourceKind::VolumeShadowHandle(_)
        )
    }

    /// Returns the locator as a path
    pub fn path(&self) -> &Path {
        match self {
            SourceKind::SingleFile(p) | SourceKind::DirectoryTree(p) => p,
            SourceKind::LogicalVolumeHandle(s) | SourceKind::VolumeShadowHandle(s) => Path::new(s),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind_name(), self.path().display())
    }
}
