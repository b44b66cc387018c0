//! Bounds-checked little-endian field access for on-disk structures

use crate::domain::repositories::VolumeError;
use byteorder::{ByteOrder, LittleEndian};

fn field<'a>(data: &'a [u8], offset: usize, len: usize, what: &str) -> Result<&'a [u8], VolumeError> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            VolumeError::CorruptedMetadata(format!(
                "{} at offset {} runs past the end of a {} byte structure",
                what,
                offset,
                data.len()
            ))
        })
}

pub(super) fn le_u8(data: &[u8], offset: usize, what: &str) -> Result<u8, VolumeError> {
    field(data, offset, 1, what).map(|b| b[0])
}

pub(super) fn le_u16(data: &[u8], offset: usize, what: &str) -> Result<u16, VolumeError> {
    field(data, offset, 2, what).map(LittleEndian::read_u16)
}

pub(super) fn le_u32(data: &[u8], offset: usize, what: &str) -> Result<u32, VolumeError> {
    field(data, offset, 4, what).map(LittleEndian::read_u32)
}

pub(super) fn le_u64(data: &[u8], offset: usize, what: &str) -> Result<u64, VolumeError> {
    field(data, offset, 8, what).map(LittleEndian::read_u64)
}

/// Decodes `chars` UTF-16LE code units starting at `offset`
pub(super) fn utf16_name(
    data: &[u8],
    offset: usize,
    chars: usize,
    what: &str,
) -> Result<String, VolumeError> {
    let raw = field(data, offset, chars * 2, what)?;
    let units: Vec<u16> = raw.chunks_exact(2).map(LittleEndian::read_u16).collect();
    Ok(String::from_utf16_lossy(&units))
}
