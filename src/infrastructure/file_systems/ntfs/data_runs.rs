//! Non-resident attribute data runs
//!
//! Non-resident attribute content is described by a run list: a packed
//! sequence of (cluster count, signed LCN delta) pairs. A run without an
//! LCN delta is sparse and reads as zeros.

use crate::domain::repositories::{BlockDeviceReader, VolumeError};

/// Upper bound on the buffer reserved ahead of a read
const MAX_PREALLOCATION: u64 = 1024 * 1024;

/// One contiguous extent of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRun {
    /// Starting cluster on the volume; `None` for a sparse run
    pub lcn: Option<u64>,
    /// Length in clusters
    pub length: u64,
}

/// Reads an unsigned little-endian integer of 1 to 8 bytes
fn read_unsigned(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, b)| acc | (*b as u64) << (8 * i))
}

/// Reads a sign-extended little-endian integer of 1 to 8 bytes
fn read_signed(bytes: &[u8]) -> i64 {
    let value = read_unsigned(bytes) as i64;
    let bits = 8 * bytes.len() as u32;
    if bits < 64 && (value >> (bits - 1)) & 1 == 1 {
        value | (-1i64 << bits)
    } else {
        value
    }
}

/// Decodes a packed run list into absolute runs
pub fn decode_data_runs(data: &[u8]) -> Result<Vec<DataRun>, VolumeError> {
    let mut runs = Vec::new();
    let mut pos = 0usize;
    let mut lcn: i64 = 0;

    while pos < data.len() {
        let header = data[pos];
        if header == 0 {
            break;
        }
        pos += 1;

        let length_size = (header & 0x0F) as usize;
        let offset_size = (header >> 4) as usize;
        if length_size == 0 || length_size > 8 || offset_size > 8 {
            return Err(VolumeError::CorruptedMetadata(format!(
                "Invalid data run header 0x{:02X}",
                header
            )));
        }
        if pos + length_size + offset_size > data.len() {
            return Err(VolumeError::CorruptedMetadata(
                "Data run list is truncated".to_string(),
            ));
        }

        let length = read_unsigned(&data[pos..pos + length_size]);
        pos += length_size;

        let run_lcn = if offset_size == 0 {
            None
        } else {
            let delta = read_signed(&data[pos..pos + offset_size]);
            lcn = lcn
                .checked_add(delta)
                .filter(|l| *l >= 0)
                .ok_or_else(|| {
                    VolumeError::CorruptedMetadata("Data run LCN out of range".to_string())
                })?;
            Some(lcn as u64)
        };
        pos += offset_size;

        runs.push(DataRun {
            lcn: run_lcn,
            length,
        });
    }

    Ok(runs)
}

/// Reads `length` bytes at byte `offset` of the content mapped by `runs`
///
/// Fails if any part of the range is not covered by the run list.
pub fn read_runs<D: BlockDeviceReader + ?Sized>(
    device: &D,
    runs: &[DataRun],
    cluster_size: u64,
    offset: u64,
    length: u64,
) -> Result<Vec<u8>, VolumeError> {
    let overflow = || VolumeError::CorruptedMetadata("Data run extent overflows".to_string());

    let end = offset.checked_add(length).ok_or_else(overflow)?;
    let mut extents = Vec::with_capacity(runs.len());
    let mut run_start = 0u64;
    for run in runs {
        let run_end = run
            .length
            .checked_mul(cluster_size)
            .and_then(|bytes| run_start.checked_add(bytes))
            .ok_or_else(overflow)?;
        extents.push((run_start, run_end, run.lcn));
        run_start = run_end;
    }

    if end > run_start {
        return Err(VolumeError::CorruptedMetadata(format!(
            "Offset {} is not mapped by the run list",
            offset.max(run_start)
        )));
    }

    let mut out = Vec::with_capacity(length.min(MAX_PREALLOCATION) as usize);
    let mut pos = offset;

    for (run_start, run_end, lcn) in extents {
        if pos >= end {
            break;
        }
        if pos < run_start || pos >= run_end {
            continue;
        }

        let chunk_end = end.min(run_end);
        let chunk = usize::try_from(chunk_end - pos).map_err(|_| overflow())?;

        match lcn {
            None => out.resize(out.len() + chunk, 0),
            Some(lcn) => {
                let disk_offset = lcn
                    .checked_mul(cluster_size)
                    .and_then(|start| start.checked_add(pos - run_start))
                    .ok_or_else(overflow)?;
                if device.size().is_some_and(|size| disk_offset >= size) {
                    return Err(VolumeError::CorruptedMetadata(format!(
                        "Data run at cluster {} lies beyond the end of the volume",
                        lcn
                    )));
                }
                let data = device.read_at(disk_offset, chunk)?;
                if data.len() != chunk {
                    return Err(VolumeError::CorruptedMetadata(format!(
                        "Data run at cluster {} extends past the end of the volume",
                        lcn
                    )));
                }
                out.extend_from_slice(&data);
            }
        }
        pos = chunk_end;
    }

    Ok(out)
}
