//! Block device reader trait
//!
//! Defines the interface for reading raw bytes from a volume, a shadow
//! copy device or a disk image. File system readers sit on top of it.

use std::io;
use thiserror::Error;

/// Errors that can occur when reading from a block device
#[derive(Error, Debug)]
pub enum BlockDeviceError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Invalid offset: {offset} exceeds device size {device_size}")]
    InvalidOffset { offset: u64, device_size: u64 },

    #[error("Read error at offset {offset}: {message}")]
    ReadError { offset: u64, message: String },
}

/// Trait for reading raw data from block devices
///
/// Implementations must be usable from a shared reference; readers that
/// need a mutable handle serialize access internally.
///
/// # Example
///
/// ```ignore
/// let device = FileBlockDevice::open(r"\\.\C:")?;
/// let boot_sector = device.read_at(0, 512)?;
/// ```
pub trait BlockDeviceReader: Send + Sync {
    /// Opens the device for reading
    fn open(path: &str) -> Result<Self, BlockDeviceError>
    where
        Self: Sized;

    /// Reads `length` bytes at the specified byte offset
    ///
    /// The result is shorter than `length` only when the read reaches the
    /// end of the device.
    fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>, BlockDeviceError>;

    /// Returns the device path
    fn path(&self) -> &str;

    /// Returns the total size in bytes, if the platform reports one
    fn size(&self) -> Option<u64>;
}
