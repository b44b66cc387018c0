//! Directory index ($I30) parsing
//!
//! A directory's children are listed as index entries keyed by their
//! `$FILE_NAME`. Small directories keep every entry in `$INDEX_ROOT`;
//! larger ones spill into INDX blocks of `$INDEX_ALLOCATION`.

use super::bytes::{le_u16, le_u32, le_u64, le_u8, utf16_name};
use super::record::{apply_fixups, INDEX_RECORD_SIGNATURE, REFERENCE_RECORD_MASK};
use crate::domain::repositories::VolumeError;

/// Name of the file name index on directories
pub const FILE_NAME_INDEX: &str = "$I30";

const INDEX_ROOT_NODE_HEADER: usize = 16;
const INDEX_BLOCK_NODE_HEADER: usize = 24;
const INDEX_ENTRY_HEADER: usize = 16;

const ENTRY_LAST: u16 = 0x0002;

/// A directory entry from a file name index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// MFT record number of the child
    pub record: u64,
    pub name: String,
}

/// Parses the entries of an `$INDEX_ROOT` value
pub fn parse_index_root(value: &[u8]) -> Result<Vec<IndexEntry>, VolumeError> {
    parse_node(value, INDEX_ROOT_NODE_HEADER)
}

/// Parses the entries of one INDX block, applying its fixups
pub fn parse_index_block(mut block: Vec<u8>) -> Result<Vec<IndexEntry>, VolumeError> {
    apply_fixups(&mut block, &INDEX_RECORD_SIGNATURE)?;
    parse_node(&block, INDEX_BLOCK_NODE_HEADER)
}

fn parse_node(data: &[u8], header: usize) -> Result<Vec<IndexEntry>, VolumeError> {
    let entries_offset = le_u32(data, header, "index entries offset")? as usize;
    let total_size = le_u32(data, header + 4, "index node size")? as usize;

    let mut pos = header + entries_offset;
    let end = (header + total_size).min(data.len());
    let mut entries = Vec::new();

    while pos + INDEX_ENTRY_HEADER <= end {
        let length = le_u16(data, pos + 8, "index entry length")? as usize;
        let key_length = le_u16(data, pos + 10, "index key length")? as usize;
        let flags = le_u16(data, pos + 12, "index entry flags")?;

        if flags & ENTRY_LAST != 0 {
            break;
        }
        if length < INDEX_ENTRY_HEADER || pos + length > end {
            return Err(VolumeError::CorruptedMetadata(format!(
                "Invalid index entry length {} at offset {}",
                length, pos
            )));
        }

        if key_length > 0 {
            let key = pos + INDEX_ENTRY_HEADER;
            let name_length = le_u8(data, key + 64, "file name length")? as usize;
            entries.push(IndexEntry {
                record: le_u64(data, pos, "index entry reference")? & REFERENCE_RECORD_MASK,
                name: utf16_name(data, key + 66, name_length, "file name")?,
            });
        }

        pos += length;
    }

    Ok(entries)
}

/// Returns whether the allocation bitmap marks index block `block` as in use
pub fn block_in_use(bitmap: &[u8], block: u64) -> bool {
    bitmap
        .get((block / 8) as usize)
        .map(|byte| byte & (1 << (block % 8)) != 0)
        .unwrap_or(false)
}

/// Compares two file names the way NTFS directory lookups do
pub fn names_equal(a: &str, b: &str) -> bool {
    a.to_uppercase() == b.to_uppercase()
}
