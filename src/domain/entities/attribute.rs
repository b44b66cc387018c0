//! File system attribute entities
//!
//! An attribute is a typed, optionally named data stream attached to a
//! file system entry. The change journal lives in the `$J` data stream
//! of `/$Extend/$UsnJrnl`.

use std::fmt;

/// NTFS attribute type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    StandardInformation,
    AttributeList,
    FileName,
    ObjectId,
    SecurityDescriptor,
    VolumeName,
    VolumeInformation,
    /// File data, the only type a journal stream can have
    Data,
    IndexRoot,
    IndexAllocation,
    Bitmap,
    ReparsePoint,
    Other(u32),
}

impl AttributeType {
    /// Returns the on-disk type code
    pub fn code(&self) -> u32 {
        match self {
            AttributeType::StandardInformation => 0x10,
            AttributeType::AttributeList => 0x20,
            AttributeType::FileName => 0x30,
            AttributeType::ObjectId => 0x40,
            AttributeType::SecurityDescriptor => 0x50,
            AttributeType::VolumeName => 0x60,
            AttributeType::VolumeInformation => 0x70,
            AttributeType::Data => 0x80,
            AttributeType::IndexRoot => 0x90,
            AttributeType::IndexAllocation => 0xA0,
            AttributeType::Bitmap => 0xB0,
            AttributeType::ReparsePoint => 0xC0,
            AttributeType::Other(code) => *code,
        }
    }
}

impl From<u32> for AttributeType {
    fn from(code: u32) -> Self {
        match code {
            0x10 => AttributeType::StandardInformation,
            0x20 => AttributeType::AttributeList,
            0x30 => AttributeType::FileName,
            0x40 => AttributeType::ObjectId,
            0x50 => AttributeType::SecurityDescriptor,
            0x60 => AttributeType::VolumeName,
            0x70 => AttributeType::VolumeInformation,
            0x80 => AttributeType::Data,
            0x90 => AttributeType::IndexRoot,
            0xA0 => AttributeType::IndexAllocation,
            0xB0 => AttributeType::Bitmap,
            0xC0 => AttributeType::ReparsePoint,
            other => AttributeType::Other(other),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeType::StandardInformation => "$STANDARD_INFORMATION",
            AttributeType::AttributeList => "$ATTRIBUTE_LIST",
            AttributeType::FileName => "$FILE_NAME",
            AttributeType::ObjectId => "$OBJECT_ID",
            AttributeType::SecurityDescriptor => "$SECURITY_DESCRIPTOR",
            AttributeType::VolumeName => "$VOLUME_NAME",
            AttributeType::VolumeInformation => "$VOLUME_INFORMATION",
            AttributeType::Data => "$DATA",
            AttributeType::IndexRoot => "$INDEX_ROOT",
            AttributeType::IndexAllocation => "$INDEX_ALLOCATION",
            AttributeType::Bitmap => "$BITMAP",
            AttributeType::ReparsePoint => "$REPARSE_POINT",
            AttributeType::Other(code) => return write!(f, "0x{:X}", code),
        };
        f.write_str(name)
    }
}

/// One attribute as enumerated on an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub attribute_type: AttributeType,
    /// Stream name; `None` for the unnamed stream
    pub name: Option<String>,
    pub id: u16,
    /// Logical size in bytes
    pub size: u64,
}

impl AttributeInfo {
    /// Returns whether this is the data stream with the given name
    pub fn is_named_data(&self, stream_name: &str) -> bool {
        self.attribute_type == AttributeType::Data && self.name.as_deref() == Some(stream_name)
    }
}

/// Identifies the one attribute a stream adapter reads from
///
/// The size is captured once when the descriptor is built and never
/// re-queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    entry_path: String,
    attribute_id: u16,
    attribute_type: AttributeType,
    attribute_name: Option<String>,
    size: u64,
}

impl AttributeDescriptor {
    /// Builds a descriptor for an attribute of the entry at `entry_path`
    pub fn new(entry_path: impl Into<String>, info: &AttributeInfo) -> Self {
        Self {
            entry_path: entry_path.into(),
            attribute_id: info.id,
            attribute_type: info.attribute_type,
            attribute_name: info.name.clone(),
            size: info.size,
        }
    }

    pub fn entry_path(&self) -> &str {
        &self.entry_path
    }

    pub fn attribute_id(&self) -> u16 {
        self.attribute_id
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    pub fn attribute_name(&self) -> Option<&str> {
        self.attribute_name.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl fmt::Display for AttributeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute_name {
            Some(name) => write!(f, "{}:{}", self.entry_path, name),
            None => write!(f, "{}", self.entry_path),
        }
    }
}
