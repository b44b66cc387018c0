//! USN change journal record entities
//!
//! A `UsnEntry` is one decoded record plus where it came from. The core
//! pipeline never looks inside it; it only hands it to the output sink.

use bitflags::Flags;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

bitflags::bitflags! {
    /// Reasons a change was journaled (`USN_REASON_*`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UsnReason: u32 {
        const DATA_OVERWRITE = 0x0000_0001;
        const DATA_EXTEND = 0x0000_0002;
        const DATA_TRUNCATION = 0x0000_0004;
        const NAMED_DATA_OVERWRITE = 0x0000_0010;
        const NAMED_DATA_EXTEND = 0x0000_0020;
        const NAMED_DATA_TRUNCATION = 0x0000_0040;
        const FILE_CREATE = 0x0000_0100;
        const FILE_DELETE = 0x0000_0200;
        const EA_CHANGE = 0x0000_0400;
        const SECURITY_CHANGE = 0x0000_0800;
        const RENAME_OLD_NAME = 0x0000_1000;
        const RENAME_NEW_NAME = 0x0000_2000;
        const INDEXABLE_CHANGE = 0x0000_4000;
        const BASIC_INFO_CHANGE = 0x0000_8000;
        const HARD_LINK_CHANGE = 0x0001_0000;
        const COMPRESSION_CHANGE = 0x0002_0000;
        const ENCRYPTION_CHANGE = 0x0004_0000;
        const OBJECT_ID_CHANGE = 0x0008_0000;
        const REPARSE_POINT_CHANGE = 0x0010_0000;
        const STREAM_CHANGE = 0x0020_0000;
        const TRANSACTED_CHANGE = 0x0040_0000;
        const INTEGRITY_CHANGE = 0x0080_0000;
        const DESIRED_STORAGE_CLASS_CHANGE = 0x0100_0000;
        const CLOSE = 0x8000_0000;
    }
}

bitflags::bitflags! {
    /// Source information of a change (`USN_SOURCE_*`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UsnSourceInfo: u32 {
        const DATA_MANAGEMENT = 0x0000_0001;
        const AUXILIARY_DATA = 0x0000_0002;
        const REPLICATION_MANAGEMENT = 0x0000_0004;
        const CLIENT_REPLICATION_MANAGEMENT = 0x0000_0008;
    }
}

/// Joins the names of the set flags, e.g. `USN_REASON_FILE_CREATE | USN_REASON_CLOSE`
fn flag_names<F: Flags>(flags: &F, prefix: &str) -> String {
    flags
        .iter_names()
        .map(|(name, _)| format!("{}{}", prefix, name))
        .collect::<Vec<_>>()
        .join(" | ")
}

impl fmt::Display for UsnReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&flag_names(self, "USN_REASON_"))
    }
}

impl fmt::Display for UsnSourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&flag_names(self, "USN_SOURCE_"))
    }
}

fn serialize_display<T: fmt::Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// 64-bit MFT reference: 48-bit entry number and 16-bit sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FileReference {
    pub entry: u64,
    pub sequence: u16,
}

impl From<u64> for FileReference {
    fn from(raw: u64) -> Self {
        Self {
            entry: raw & 0x0000_FFFF_FFFF_FFFF,
            sequence: (raw >> 48) as u16,
        }
    }
}

/// `USN_RECORD_V2`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsnRecordV2 {
    pub record_length: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub file_reference: FileReference,
    pub parent_reference: FileReference,
    pub usn: u64,
    #[serde(serialize_with = "serialize_display")]
    pub timestamp: DateTime<Utc>,
    #[serde(serialize_with = "serialize_display")]
    pub reason: UsnReason,
    #[serde(serialize_with = "serialize_display")]
    pub source_info: UsnSourceInfo,
    pub security_id: u32,
    pub file_attributes: u32,
    pub file_name_length: u16,
    pub file_name_offset: u16,
    pub file_name: String,
}

/// A decoded record together with its label and stream offset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsnEntry {
    #[serde(rename = "_source")]
    pub source: String,
    #[serde(rename = "_offset")]
    pub offset: u64,
    #[serde(flatten)]
    pub record: UsnRecordV2,
}
