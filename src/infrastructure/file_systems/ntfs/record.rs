//! MFT records and their attributes
//!
//! Every file on an NTFS volume is described by one or more fixed-size
//! FILE records in the Master File Table. Records are protected by an
//! update sequence array that must be applied before the content can be
//! trusted.

use super::bytes::{le_u16, le_u32, le_u64, le_u8, utf16_name};
use super::data_runs::{decode_data_runs, read_runs, DataRun};
use crate::domain::entities::AttributeType;
use crate::domain::repositories::{BlockDeviceReader, VolumeError};

/// MFT entry signature "FILE"
pub const MFT_RECORD_SIGNATURE: [u8; 4] = *b"FILE";

/// Index block signature "INDX"
pub const INDEX_RECORD_SIGNATURE: [u8; 4] = *b"INDX";

/// Update sequence fixups protect the last two bytes of every 512 bytes
const FIXUP_STRIDE: usize = 512;

const END_OF_ATTRIBUTES: u32 = 0xFFFF_FFFF;

const RECORD_IN_USE: u16 = 0x0001;
const RECORD_IS_DIRECTORY: u16 = 0x0002;

const ATTRIBUTE_COMPRESSED: u16 = 0x0001;
const ATTRIBUTE_ENCRYPTED: u16 = 0x4000;

/// Mask of the record number inside a 64-bit file reference
pub const REFERENCE_RECORD_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;

/// Verifies the signature and applies the update sequence array in place
pub fn apply_fixups(buffer: &mut [u8], signature: &[u8; 4]) -> Result<(), VolumeError> {
    if buffer.len() < 8 || buffer[0..4] != signature[..] {
        return Err(VolumeError::CorruptedMetadata(format!(
            "Missing {} signature",
            String::from_utf8_lossy(signature)
        )));
    }

    let usa_offset = le_u16(buffer, 4, "update sequence offset")? as usize;
    let usa_count = le_u16(buffer, 6, "update sequence count")? as usize;
    if usa_count == 0 || usa_offset + usa_count * 2 > buffer.len() {
        return Err(VolumeError::CorruptedMetadata(
            "Update sequence array out of bounds".to_string(),
        ));
    }

    let usn = [buffer[usa_offset], buffer[usa_offset + 1]];
    for i in 1..usa_count {
        let pos = i * FIXUP_STRIDE - 2;
        if pos + 2 > buffer.len() {
            break;
        }
        if buffer[pos..pos + 2] != usn {
            return Err(VolumeError::CorruptedMetadata(format!(
                "Update sequence mismatch in sector {}",
                i - 1
            )));
        }
        buffer[pos] = buffer[usa_offset + 2 * i];
        buffer[pos + 1] = buffer[usa_offset + 2 * i + 1];
    }

    Ok(())
}

/// Content of a non-resident attribute (or one fragment of it)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonResidentAttribute {
    pub starting_vcn: u64,
    pub last_vcn: u64,
    pub runs: Vec<DataRun>,
    pub allocated_size: u64,
    pub data_size: u64,
    pub initialized_size: u64,
}

impl NonResidentAttribute {
    /// Folds another fragment of the same attribute into this one
    ///
    /// Sizes are only meaningful on the fragment that starts at VCN 0.
    pub fn absorb(&mut self, other: NonResidentAttribute) {
        if other.starting_vcn < self.starting_vcn {
            let mut runs = other.runs;
            runs.append(&mut self.runs);
            self.runs = runs;
            self.starting_vcn = other.starting_vcn;
            if other.starting_vcn == 0 {
                self.allocated_size = other.allocated_size;
                self.data_size = other.data_size;
                self.initialized_size = other.initialized_size;
            }
        } else {
            self.runs.extend(other.runs);
            self.last_vcn = self.last_vcn.max(other.last_vcn);
        }
    }

    /// Reads up to `length` bytes at `offset`, bounded by the data size
    ///
    /// Bytes past the initialized size read as zeros.
    pub fn read<D: BlockDeviceReader + ?Sized>(
        &self,
        device: &D,
        cluster_size: u64,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, VolumeError> {
        if offset >= self.data_size {
            return Ok(Vec::new());
        }

        let end = offset.saturating_add(length).min(self.data_size);
        let mut data = read_runs(device, &self.runs, cluster_size, offset, end - offset)?;

        if self.initialized_size < end {
            let zero_from = (self.initialized_size.saturating_sub(offset) as usize).min(data.len());
            data[zero_from..].fill(0);
        }

        Ok(data)
    }
}

/// Attribute content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeContent {
    Resident(Vec<u8>),
    NonResident(NonResidentAttribute),
}

/// One attribute as stored in an MFT record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub attribute_type: AttributeType,
    pub name: Option<String>,
    pub id: u16,
    pub flags: u16,
    pub content: AttributeContent,
}

impl RawAttribute {
    /// Logical size of the attribute value in bytes
    pub fn size(&self) -> u64 {
        match &self.content {
            AttributeContent::Resident(value) => value.len() as u64,
            AttributeContent::NonResident(nr) => nr.data_size,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & ATTRIBUTE_COMPRESSED != 0
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & ATTRIBUTE_ENCRYPTED != 0
    }

    /// Returns whether this is the given type with the given name
    pub fn matches(&self, attribute_type: AttributeType, name: Option<&str>) -> bool {
        self.attribute_type == attribute_type && self.name.as_deref() == name
    }

    fn parse(data: &[u8]) -> Result<Self, VolumeError> {
        let attribute_type = AttributeType::from(le_u32(data, 0, "attribute type")?);
        let non_resident = le_u8(data, 8, "non-resident flag")? != 0;
        let name_length = le_u8(data, 9, "name length")? as usize;
        let name_offset = le_u16(data, 10, "name offset")? as usize;
        let flags = le_u16(data, 12, "attribute flags")?;
        let id = le_u16(data, 14, "attribute id")?;

        let name = if name_length > 0 {
            Some(utf16_name(data, name_offset, name_length, "attribute name")?)
        } else {
            None
        };

        let content = if non_resident {
            let runs_offset = le_u16(data, 32, "run list offset")? as usize;
            let runs = data.get(runs_offset..).ok_or_else(|| {
                VolumeError::CorruptedMetadata("Run list offset out of bounds".to_string())
            })?;

            AttributeContent::NonResident(NonResidentAttribute {
                starting_vcn: le_u64(data, 16, "starting VCN")?,
                last_vcn: le_u64(data, 24, "last VCN")?,
                runs: decode_data_runs(runs)?,
                allocated_size: le_u64(data, 40, "allocated size")?,
                data_size: le_u64(data, 48, "data size")?,
                initialized_size: le_u64(data, 56, "initialized size")?,
            })
        } else {
            let value_length = le_u32(data, 16, "value length")? as usize;
            let value_offset = le_u16(data, 20, "value offset")? as usize;
            let value = data
                .get(value_offset..value_offset + value_length)
                .ok_or_else(|| {
                    VolumeError::CorruptedMetadata("Resident value out of bounds".to_string())
                })?;
            AttributeContent::Resident(value.to_vec())
        };

        Ok(Self {
            attribute_type,
            name,
            id,
            flags,
            content,
        })
    }
}

/// A parsed FILE record
#[derive(Debug, Clone)]
pub struct MftRecord {
    pub number: u64,
    pub flags: u16,
    pub attributes: Vec<RawAttribute>,
}

impl MftRecord {
    /// Parses a raw record, applying fixups first
    pub fn parse(number: u64, mut buffer: Vec<u8>) -> Result<Self, VolumeError> {
        apply_fixups(&mut buffer, &MFT_RECORD_SIGNATURE)
            .map_err(|e| VolumeError::CorruptedMetadata(format!("MFT record {}: {}", number, e)))?;

        let first_attribute = le_u16(&buffer, 20, "first attribute offset")? as usize;
        let flags = le_u16(&buffer, 22, "record flags")?;
        let bytes_in_use = (le_u32(&buffer, 24, "bytes in use")? as usize).min(buffer.len());

        let mut attributes = Vec::new();
        let mut offset = first_attribute;
        while offset + 8 <= bytes_in_use {
            let attribute_type = le_u32(&buffer, offset, "attribute type")?;
            if attribute_type == END_OF_ATTRIBUTES {
                break;
            }

            let length = le_u32(&buffer, offset + 4, "attribute length")? as usize;
            if length < 16 || offset + length > bytes_in_use {
                return Err(VolumeError::CorruptedMetadata(format!(
                    "MFT record {}: invalid attribute length {} at offset {}",
                    number, length, offset
                )));
            }

            attributes.push(RawAttribute::parse(&buffer[offset..offset + length])?);
            offset += length;
        }

        Ok(Self {
            number,
            flags,
            attributes,
        })
    }

    pub fn is_in_use(&self) -> bool {
        self.flags & RECORD_IN_USE != 0
    }

    pub fn is_directory(&self) -> bool {
        self.flags & RECORD_IS_DIRECTORY != 0
    }

    /// Finds the first attribute of a type with the given name
    pub fn find(&self, attribute_type: AttributeType, name: Option<&str>) -> Option<&RawAttribute> {
        self.attributes.iter().find(|a| a.matches(attribute_type, name))
    }
}

/// One entry of an `$ATTRIBUTE_LIST`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeListEntry {
    pub attribute_type: AttributeType,
    pub name: Option<String>,
    /// Record holding the attribute
    pub record: u64,
    pub id: u16,
}

/// Parses the value of an `$ATTRIBUTE_LIST` attribute
pub fn parse_attribute_list(value: &[u8]) -> Result<Vec<AttributeListEntry>, VolumeError> {
    let mut entries = Vec::new();
    let mut pos = 0usize;

    while pos + 26 <= value.len() {
        let type_code = le_u32(value, pos, "attribute list type")?;
        if type_code == 0 || type_code == END_OF_ATTRIBUTES {
            break;
        }

        let length = le_u16(value, pos + 4, "attribute list entry length")? as usize;
        if length < 26 {
            return Err(VolumeError::CorruptedMetadata(format!(
                "Invalid attribute list entry length {}",
                length
            )));
        }

        let name_length = le_u8(value, pos + 6, "attribute list name length")? as usize;
        let name_offset = le_u8(value, pos + 7, "attribute list name offset")? as usize;
        let name = if name_length > 0 {
            Some(utf16_name(value, pos + name_offset, name_length, "attribute list name")?)
        } else {
            None
        };

        entries.push(AttributeListEntry {
            attribute_type: AttributeType::from(type_code),
            name,
            record: le_u64(value, pos + 16, "attribute list reference")? & REFERENCE_RECORD_MASK,
            id: le_u16(value, pos + 24, "attribute list id")?,
        });

        pos += length;
    }

    Ok(entries)
}

/// Merges the fragments of non-resident attributes split across records
pub fn merge_fragments(attributes: Vec<RawAttribute>) -> Vec<RawAttribute> {
    let mut merged: Vec<RawAttribute> = Vec::with_capacity(attributes.len());

    for attr in attributes {
        if let AttributeContent::NonResident(fragment) = &attr.content {
            let target = merged.iter_mut().find(|m| {
                m.attribute_type == attr.attribute_type
                    && m.name == attr.name
                    && matches!(m.content, AttributeContent::NonResident(_))
            });
            if let Some(RawAttribute {
                content: AttributeContent::NonResident(existing),
                ..
            }) = target
            {
                existing.absorb(fragment.clone());
                continue;
            }
        }
        merged.push(attr);
    }

    merged
}
