//! NTFS volume: MFT access, attribute resolution and path lookup

use super::boot_sector::{NtfsBootSector, BOOT_SECTOR_SIZE};
use super::index::{block_in_use, names_equal, parse_index_block, parse_index_root, FILE_NAME_INDEX};
use super::record::{
    merge_fragments, parse_attribute_list, AttributeContent, MftRecord, NonResidentAttribute,
    RawAttribute,
};
use crate::domain::entities::AttributeType;
use crate::domain::repositories::{BlockDeviceReader, VolumeError};
use std::collections::HashMap;
use std::sync::Arc;

/// Record number of the `$MFT` itself
const MFT_RECORD: u64 = 0;

/// Record number of the root directory
pub const ROOT_DIRECTORY_RECORD: u64 = 5;

/// Largest attribute list or index bitmap read whole into memory
pub const MAX_METADATA_VALUE: u64 = 16 * 1024 * 1024;

/// An opened NTFS volume on a block device
pub struct NtfsVolume<D: BlockDeviceReader> {
    device: Arc<D>,
    boot_sector: NtfsBootSector,
    /// Unnamed `$DATA` of `$MFT`, used to locate every other record
    mft_data: NonResidentAttribute,
}

impl<D: BlockDeviceReader> NtfsVolume<D> {
    /// Reads the boot sector and bootstraps the MFT
    pub fn open(device: Arc<D>) -> Result<Self, VolumeError> {
        let data = device.read_at(0, BOOT_SECTOR_SIZE).map_err(|e| {
            VolumeError::FileSystemOpen(format!("Cannot read boot sector of {}: {}", device.path(), e))
        })?;
        let boot_sector = NtfsBootSector::parse(&data)?;
        if !boot_sector.is_valid() {
            return Err(VolumeError::FileSystemOpen(format!(
                "{} does not contain an NTFS boot sector",
                device.path()
            )));
        }

        let record_size = boot_sector.mft_record_size() as usize;
        let raw = device.read_at(boot_sector.mft_offset(), record_size)?;
        if raw.len() < record_size {
            return Err(VolumeError::FileSystemOpen(
                "MFT lies beyond the end of the volume".to_string(),
            ));
        }

        let mft = MftRecord::parse(MFT_RECORD, raw)
            .map_err(|e| VolumeError::FileSystemOpen(e.to_string()))?;
        let mft_data = match mft.find(AttributeType::Data, None).map(|a| &a.content) {
            Some(AttributeContent::NonResident(nr)) => nr.clone(),
            _ => {
                return Err(VolumeError::FileSystemOpen(
                    "$MFT has no non-resident $DATA attribute".to_string(),
                ));
            }
        };

        tracing::debug!(
            "NTFS volume {}: cluster size {}, MFT record size {}, {} MFT records, serial {:016X}",
            device.path(),
            boot_sector.cluster_size(),
            record_size,
            mft_data.data_size / record_size as u64,
            boot_sector.volume_serial()
        );

        Ok(Self {
            device,
            boot_sector,
            mft_data,
        })
    }

    pub fn cluster_size(&self) -> u64 {
        self.boot_sector.cluster_size()
    }

    /// Reads and parses one MFT record
    pub fn read_record(&self, number: u64) -> Result<MftRecord, VolumeError> {
        let record_size = self.boot_sector.mft_record_size();
        let offset = number
            .checked_mul(record_size)
            .filter(|o| *o < self.mft_data.data_size)
            .ok_or_else(|| {
                VolumeError::CorruptedMetadata(format!("MFT record {} is out of range", number))
            })?;

        let raw = self
            .mft_data
            .read(self.device.as_ref(), self.cluster_size(), offset, record_size)?;
        MftRecord::parse(number, raw)
    }

    /// Returns every attribute of a file, following its attribute list
    ///
    /// Fragments of a non-resident attribute spread over extension
    /// records are merged into one attribute.
    pub fn attributes_of(&self, record: &MftRecord) -> Result<Vec<RawAttribute>, VolumeError> {
        let Some(list) = record.find(AttributeType::AttributeList, None) else {
            return Ok(merge_fragments(record.attributes.clone()));
        };

        let entries = parse_attribute_list(&self.attribute_value(list)?)?;
        let mut extensions: HashMap<u64, MftRecord> = HashMap::new();
        let mut attributes = Vec::with_capacity(entries.len());

        for entry in entries {
            let holder = if entry.record == record.number {
                record
            } else {
                if !extensions.contains_key(&entry.record) {
                    let extension = self.read_record(entry.record)?;
                    extensions.insert(entry.record, extension);
                }
                &extensions[&entry.record]
            };

            let found = holder
                .attributes
                .iter()
                .find(|a| a.attribute_type == entry.attribute_type && a.id == entry.id);
            match found {
                Some(attribute) => attributes.push(attribute.clone()),
                None => tracing::warn!(
                    "Attribute list of record {} names {} id {} in record {}, which lacks it",
                    record.number,
                    entry.attribute_type,
                    entry.id,
                    entry.record
                ),
            }
        }

        Ok(merge_fragments(attributes))
    }

    /// Reads up to `length` bytes of an attribute value at `offset`
    pub fn read_attribute(
        &self,
        attribute: &RawAttribute,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, VolumeError> {
        match &attribute.content {
            AttributeContent::Resident(value) => {
                let start = offset.min(value.len() as u64) as usize;
                let end = offset.saturating_add(length).min(value.len() as u64) as usize;
                Ok(value[start..end].to_vec())
            }
            AttributeContent::NonResident(nr) => {
                if attribute.is_compressed() || attribute.is_encrypted() {
                    return Err(VolumeError::Unsupported(format!(
                        "{} attribute {} is compressed or encrypted",
                        attribute.attribute_type, attribute.id
                    )));
                }
                nr.read(self.device.as_ref(), self.cluster_size(), offset, length)
            }
        }
    }

    fn attribute_value(&self, attribute: &RawAttribute) -> Result<Vec<u8>, VolumeError> {
        let size = attribute.size();
        if size > MAX_METADATA_VALUE {
            return Err(VolumeError::CorruptedMetadata(format!(
                "{} attribute {} claims {} bytes",
                attribute.attribute_type, attribute.id, size
            )));
        }
        self.read_attribute(attribute, 0, size)
    }

    /// Looks a name up in a directory's file name index
    pub fn find_child(&self, directory: &MftRecord, name: &str) -> Result<Option<u64>, VolumeError> {
        let attributes = self.attributes_of(directory)?;
        let find = |attribute_type: AttributeType| {
            attributes
                .iter()
                .find(|a| a.matches(attribute_type, Some(FILE_NAME_INDEX)))
        };

        if let Some(root) = find(AttributeType::IndexRoot) {
            let entries = parse_index_root(&self.attribute_value(root)?)?;
            if let Some(entry) = entries.iter().find(|e| names_equal(&e.name, name)) {
                return Ok(Some(entry.record));
            }
        }

        let Some(allocation) = find(AttributeType::IndexAllocation) else {
            return Ok(None);
        };
        let bitmap = match find(AttributeType::Bitmap) {
            Some(bitmap) => Some(self.attribute_value(bitmap)?),
            None => None,
        };

        let block_size = self.boot_sector.index_record_size();
        let blocks = allocation.size() / block_size;
        for block in 0..blocks {
            if bitmap.as_deref().is_some_and(|b| !block_in_use(b, block)) {
                continue;
            }

            let raw = self.read_attribute(allocation, block * block_size, block_size)?;
            let entries = parse_index_block(raw)?;
            if let Some(entry) = entries.iter().find(|e| names_equal(&e.name, name)) {
                return Ok(Some(entry.record));
            }
        }

        Ok(None)
    }

    /// Resolves an absolute path such as `/$Extend/$UsnJrnl` to its record
    pub fn lookup(&self, path: &str) -> Result<MftRecord, VolumeError> {
        let mut record = self.read_record(ROOT_DIRECTORY_RECORD)?;

        for component in path.split(['/', '\\']).filter(|c| !c.is_empty()) {
            if !record.is_directory() {
                return Err(VolumeError::EntryNotFound(path.to_string()));
            }

            let child = self
                .find_child(&record, component)?
                .ok_or_else(|| VolumeError::EntryNotFound(path.to_string()))?;
            tracing::debug!("Resolved {} to MFT record {}", component, child);
            record = self.read_record(child)?;
        }

        if !record.is_in_use() {
            return Err(VolumeError::EntryNotFound(path.to_string()));
        }

        Ok(record)
    }
}
