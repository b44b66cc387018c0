//! File-backed block device
//!
//! Provides raw read access to anything the OS opens as a file: disk
//! images, `/dev/sdX1` style devices, and Windows volume handles such as
//! `\\.\C:` or `\\?\GLOBALROOT\Device\HarddiskVolumeShadowCopy3`.
//!
//! Volume handles on Windows only accept sector-aligned reads, so every
//! read is widened to whole sectors and trimmed afterwards.

use crate::domain::repositories::{BlockDeviceError, BlockDeviceReader};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};

/// Alignment applied to every device read
pub const SECTOR_SIZE: u64 = 512;

/// Read-only block device over a file handle
///
/// # Example
///
/// ```ignore
/// let device = FileBlockDevice::open("ntfs.img")?;
/// let boot_sector = device.read_at(0, 512)?;
/// ```
pub struct FileBlockDevice {
    file: Mutex<File>,
    path: String,
    size: Option<u64>,
}

impl FileBlockDevice {
    /// Gets the device/file size
    ///
    /// Volume handles often report neither a length nor a seekable end;
    /// those are left unsized and bounded by the file system instead.
    fn get_size(file: &mut File) -> Option<u64> {
        let metadata = file.metadata().ok()?;
        if metadata.is_file() {
            return Some(metadata.len());
        }

        let size = file.seek(SeekFrom::End(0)).ok()?;
        file.seek(SeekFrom::Start(0)).ok()?;
        (size > 0).then_some(size)
    }

    /// Fills `buffer` from the current position until it is full or EOF
    fn read_full(file: &mut File, buffer: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buffer.len() {
            match file.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl BlockDeviceReader for FileBlockDevice {
    fn open(path: &str) -> Result<Self, BlockDeviceError> {
        let mut file = OpenOptions::new().read(true).open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => BlockDeviceError::DeviceNotFound(path.to_string()),
            io::ErrorKind::PermissionDenied => BlockDeviceError::PermissionDenied(format!(
                "{} - volume handles require administrator rights",
                path
            )),
            _ => BlockDeviceError::IoError(e),
        })?;

        let size = Self::get_size(&mut file);
        tracing::debug!("Opened {} (size: {:?})", path, size);

        Ok(Self {
            file: Mutex::new(file),
            path: path.to_string(),
            size,
        })
    }

    fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>, BlockDeviceError> {
        if length == 0 {
            return Ok(Vec::new());
        }

        let mut end = offset.saturating_add(length as u64);
        if let Some(size) = self.size {
            if offset >= size {
                return Err(BlockDeviceError::InvalidOffset {
                    offset,
                    device_size: size,
                });
            }
            end = end.min(size);
        }

        let aligned_start = offset - offset % SECTOR_SIZE;
        let aligned_end = end.div_ceil(SECTOR_SIZE) * SECTOR_SIZE;
        let mut buffer = vec![0u8; (aligned_end - aligned_start) as usize];

        let filled = {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(aligned_start))?;
            Self::read_full(&mut file, &mut buffer).map_err(|e| BlockDeviceError::ReadError {
                offset: aligned_start,
                message: e.to_string(),
            })?
        };

        let start = (offset - aligned_start) as usize;
        let stop = filled.min(start + (end - offset) as usize);
        if stop <= start {
            return Ok(Vec::new());
        }

        buffer.truncate(stop);
        buffer.drain(..start);
        Ok(buffer)
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn size(&self) -> Option<u64> {
        self.size
    }
}
