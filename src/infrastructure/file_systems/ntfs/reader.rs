//! NTFS implementations of the volume reader traits

use super::record::RawAttribute;
use super::volume::NtfsVolume;
use crate::domain::entities::{AttributeInfo, AttributeType};
use crate::domain::repositories::{
    AttributeSource, BlockDeviceReader, ImageOpener, VolumeError, VolumeFileSystem, VolumeImage,
};
use crate::infrastructure::block_device::FileBlockDevice;
use std::sync::Arc;

/// Opens images, devices and volume handles as NTFS volumes
#[derive(Debug, Default, Clone, Copy)]
pub struct NtfsImageOpener;

impl NtfsImageOpener {
    pub fn new() -> Self {
        Self
    }
}

impl ImageOpener for NtfsImageOpener {
    type Image = NtfsImage<FileBlockDevice>;

    fn open_image(&self, path: &str) -> Result<Self::Image, VolumeError> {
        let device = FileBlockDevice::open(path).map_err(|source| VolumeError::ImageOpen {
            path: path.to_string(),
            source,
        })?;
        Ok(NtfsImage::new(device))
    }
}

/// A block device expected to hold an NTFS volume
pub struct NtfsImage<D: BlockDeviceReader> {
    device: Arc<D>,
}

impl<D: BlockDeviceReader> NtfsImage<D> {
    pub fn new(device: D) -> Self {
        Self {
            device: Arc::new(device),
        }
    }
}

impl<D: BlockDeviceReader> VolumeImage for NtfsImage<D> {
    type FileSystem = NtfsFileSystem<D>;

    fn open_filesystem(&self) -> Result<Self::FileSystem, VolumeError> {
        let volume = NtfsVolume::open(Arc::clone(&self.device))?;
        Ok(NtfsFileSystem {
            volume: Arc::new(volume),
        })
    }
}

/// A mounted NTFS file system
pub struct NtfsFileSystem<D: BlockDeviceReader> {
    volume: Arc<NtfsVolume<D>>,
}

impl<D: BlockDeviceReader> VolumeFileSystem for NtfsFileSystem<D> {
    type Entry = NtfsEntry<D>;

    fn open_entry(&self, path: &str) -> Result<Self::Entry, VolumeError> {
        let record = self.volume.lookup(path)?;
        let attributes = self.volume.attributes_of(&record)?;
        tracing::debug!(
            "Opened {} (MFT record {}, {} attributes)",
            path,
            record.number,
            attributes.len()
        );

        Ok(NtfsEntry {
            volume: Arc::clone(&self.volume),
            path: path.to_string(),
            attributes,
        })
    }
}

/// A file on an NTFS volume with its resolved attributes
pub struct NtfsEntry<D: BlockDeviceReader> {
    volume: Arc<NtfsVolume<D>>,
    path: String,
    attributes: Vec<RawAttribute>,
}

impl<D: BlockDeviceReader> NtfsEntry<D> {
    pub fn path(&self) -> &str {
        &self.path
    }

    fn find(&self, attribute_type: AttributeType, id: u16) -> Result<&RawAttribute, VolumeError> {
        self.attributes
            .iter()
            .find(|a| a.attribute_type == attribute_type && a.id == id)
            .ok_or_else(|| VolumeError::AttributeNotFound {
                entry: self.path.clone(),
                attribute: format!("{} id {}", attribute_type, id),
            })
    }
}

impl<D: BlockDeviceReader> AttributeSource for NtfsEntry<D> {
    fn attributes(&self) -> Result<Vec<AttributeInfo>, VolumeError> {
        Ok(self
            .attributes
            .iter()
            .map(|a| AttributeInfo {
                attribute_type: a.attribute_type,
                name: a.name.clone(),
                id: a.id,
                size: a.size(),
            })
            .collect())
    }

    fn read_at(
        &self,
        offset: u64,
        length: usize,
        attribute_type: AttributeType,
        attribute_id: u16,
    ) -> Result<Vec<u8>, VolumeError> {
        let attribute = self.find(attribute_type, attribute_id)?;
        self.volume.read_attribute(attribute, offset, length as u64)
    }
}
