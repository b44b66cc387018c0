//! Volume and attribute reader traits
//!
//! The capability set needed to reach a named attribute on a volume:
//! open an image, open its file system, open an entry by path, then
//! enumerate and randomly read the entry's attributes.
//!
//! The pipeline only sees these traits, so it can be exercised against
//! an in-memory fake as easily as against a real NTFS volume.

use crate::domain::entities::{AttributeInfo, AttributeType};
use thiserror::Error;

use super::block_device::BlockDeviceError;

/// Errors raised while resolving or reading an attribute on a volume
#[derive(Error, Debug)]
pub enum VolumeError {
    #[error("Failed to open image {path}: {source}")]
    ImageOpen {
        path: String,
        #[source]
        source: BlockDeviceError,
    },

    #[error("Failed to open file system: {0}")]
    FileSystemOpen(String),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Attribute not found on {entry}: {attribute}")]
    AttributeNotFound { entry: String, attribute: String },

    #[error("Corrupted metadata: {0}")]
    CorruptedMetadata(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Read error: {0}")]
    Read(#[from] BlockDeviceError),
}

/// Opens volume images by path
pub trait ImageOpener {
    type Image: VolumeImage;

    fn open_image(&self, path: &str) -> Result<Self::Image, VolumeError>;
}

/// An opened image or volume handle
pub trait VolumeImage {
    type FileSystem: VolumeFileSystem;

    /// Fails with `FileSystemOpen` on unrecognized or corrupt structures
    fn open_filesystem(&self) -> Result<Self::FileSystem, VolumeError>;
}

/// A mounted view of the file system on an image
pub trait VolumeFileSystem {
    type Entry: AttributeSource;

    /// Opens an entry by absolute path (`/$Extend/$UsnJrnl`)
    ///
    /// Fails with `EntryNotFound` when any path component is missing.
    fn open_entry(&self, path: &str) -> Result<Self::Entry, VolumeError>;
}

/// A file system entry whose attributes can be enumerated and read
pub trait AttributeSource {
    fn attributes(&self) -> Result<Vec<AttributeInfo>, VolumeError>;

    /// Reads up to `length` bytes of an attribute starting at `offset`
    ///
    /// May return fewer bytes than requested near the end of the
    /// attribute, never bytes beyond it.
    fn read_at(
        &self,
        offset: u64,
        length: usize,
        attribute_type: AttributeType,
        attribute_id: u16,
    ) -> Result<Vec<u8>, VolumeError>;
}

impl<T: AttributeSource + ?Sized> AttributeSource for &T {
    fn attributes(&self) -> Result<Vec<AttributeInfo>, VolumeError> {
        (**self).attributes()
    }

    fn read_at(
        &self,
        offset: u64,
        length: usize,
        attribute_type: AttributeType,
        attribute_id: u16,
    ) -> Result<Vec<u8>, VolumeError> {
        (**self).read_at(offset, length, attribute_type, attribute_id)
    }
}
