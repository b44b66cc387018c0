//! Shared builders for journal records and synthetic NTFS images

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// USN_RECORD_V2 builder
// ============================================================================

/// 2024-01-01T00:00:00Z as a FILETIME
pub const RECORD_FILETIME: u64 = 133_485_408_000_000_000;
pub const RECORD_TIMESTAMP: &str = "2024-01-01 00:00:00 UTC";

pub const REASON_FILE_CREATE: u32 = 0x0000_0100;
pub const REASON_CLOSE: u32 = 0x8000_0000;

/// Builds one 8-byte aligned `USN_RECORD_V2`
pub fn usn_record(usn: u64, name: &str, reason: u32) -> Vec<u8> {
    let name_bytes: Vec<u8> = name.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    let length = (60 + name_bytes.len()).div_ceil(8) * 8;

    let mut record = vec![0u8; length];
    record[0..4].copy_from_slice(&(length as u32).to_le_bytes());
    record[4..6].copy_from_slice(&2u16.to_le_bytes());
    record[6..8].copy_from_slice(&0u16.to_le_bytes());
    record[8..16].copy_from_slice(&(40u64 | 3 << 48).to_le_bytes());
    record[16..24].copy_from_slice(&(5u64 | 5 << 48).to_le_bytes());
    record[24..32].copy_from_slice(&usn.to_le_bytes());
    record[32..40].copy_from_slice(&RECORD_FILETIME.to_le_bytes());
    record[40..44].copy_from_slice(&reason.to_le_bytes());
    record[52..56].copy_from_slice(&0x20u32.to_le_bytes());
    record[56..58].copy_from_slice(&(name_bytes.len() as u16).to_le_bytes());
    record[58..60].copy_from_slice(&60u16.to_le_bytes());
    record[60..60 + name_bytes.len()].copy_from_slice(&name_bytes);
    record
}

/// Concatenates `count` records named `file_<n>.txt`
pub fn usn_records(count: usize) -> Vec<u8> {
    let mut data = Vec::new();
    for i in 0..count {
        let usn = data.len() as u64;
        data.extend(usn_record(usn, &format!("file_{}.txt", i), REASON_FILE_CREATE));
    }
    data
}

// ============================================================================
// Synthetic NTFS image
// ============================================================================

pub const CLUSTER_SIZE: usize = 4096;
pub const MFT_RECORD_SIZE: usize = 1024;
pub const IMAGE_CLUSTERS: usize = 16;

const MFT_LCN: usize = 4;
const MFT_RECORDS: usize = 16;
const EXTEND_INDEX_LCN: u8 = 9;
const JOURNAL_LCN: u8 = 10;

const ROOT_RECORD: u64 = 5;
const EXTEND_RECORD: u64 = 11;
const USN_JOURNAL_RECORD: u64 = 12;
const JOURNAL_EXTENSION_RECORD: u64 = 13;

/// `$J` is one sparse cluster followed by one allocated cluster
pub const JOURNAL_DATA_SIZE: u64 = 2 * CLUSTER_SIZE as u64;
pub const JOURNAL_ALLOCATED_OFFSET: u64 = CLUSTER_SIZE as u64;

const RECORD_IN_USE: u16 = 0x0001;
const RECORD_IS_DIRECTORY: u16 = 0x0002;

fn align8(n: usize) -> usize {
    n.div_ceil(8) * 8
}

fn utf16(name: &str) -> Vec<u8> {
    name.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

/// Writes the update sequence array and stamps every sector tail
fn protect(block: &mut [u8], usa_offset: usize) {
    let sectors = block.len() / 512;
    block[4..6].copy_from_slice(&(usa_offset as u16).to_le_bytes());
    block[6..8].copy_from_slice(&((sectors + 1) as u16).to_le_bytes());
    block[usa_offset..usa_offset + 2].copy_from_slice(&[0x2A, 0x00]);
    for i in 1..=sectors {
        let tail = i * 512 - 2;
        let (saved, stamp) = (usa_offset + 2 * i, [0x2A, 0x00]);
        block[saved] = block[tail];
        block[saved + 1] = block[tail + 1];
        block[tail..tail + 2].copy_from_slice(&stamp);
    }
}

fn resident(attribute_type: u32, name: Option<&str>, id: u16, value: &[u8]) -> Vec<u8> {
    let name_bytes = name.map(utf16).unwrap_or_default();
    let value_offset = align8(24 + name_bytes.len());
    let length = align8(value_offset + value.len());

    let mut attr = vec![0u8; length];
    attr[0..4].copy_from_slice(&attribute_type.to_le_bytes());
    attr[4..8].copy_from_slice(&(length as u32).to_le_bytes());
    attr[9] = (name_bytes.len() / 2) as u8;
    attr[10..12].copy_from_slice(&24u16.to_le_bytes());
    attr[14..16].copy_from_slice(&id.to_le_bytes());
    attr[16..20].copy_from_slice(&(value.len() as u32).to_le_bytes());
    attr[20..22].copy_from_slice(&(value_offset as u16).to_le_bytes());
    attr[24..24 + name_bytes.len()].copy_from_slice(&name_bytes);
    attr[value_offset..value_offset + value.len()].copy_from_slice(value);
    attr
}

fn non_resident(
    attribute_type: u32,
    name: Option<&str>,
    id: u16,
    runs: &[u8],
    starting_vcn: u64,
    last_vcn: u64,
    data_size: u64,
) -> Vec<u8> {
    let name_bytes = name.map(utf16).unwrap_or_default();
    let runs_offset = align8(64 + name_bytes.len());
    let length = align8(runs_offset + runs.len());

    let mut attr = vec![0u8; length];
    attr[0..4].copy_from_slice(&attribute_type.to_le_bytes());
    attr[4..8].copy_from_slice(&(length as u32).to_le_bytes());
    attr[8] = 1;
    attr[9] = (name_bytes.len() / 2) as u8;
    attr[10..12].copy_from_slice(&64u16.to_le_bytes());
    attr[14..16].copy_from_slice(&id.to_le_bytes());
    attr[16..24].copy_from_slice(&starting_vcn.to_le_bytes());
    attr[24..32].copy_from_slice(&last_vcn.to_le_bytes());
    attr[32..34].copy_from_slice(&(runs_offset as u16).to_le_bytes());
    attr[40..48].copy_from_slice(&data_size.to_le_bytes());
    attr[48..56].copy_from_slice(&data_size.to_le_bytes());
    attr[56..64].copy_from_slice(&data_size.to_le_bytes());
    attr[64..64 + name_bytes.len()].copy_from_slice(&name_bytes);
    attr[runs_offset..runs_offset + runs.len()].copy_from_slice(runs);
    attr
}

fn mft_record(flags: u16, base_record: u64, attributes: &[Vec<u8>]) -> Vec<u8> {
    let mut record = vec![0u8; MFT_RECORD_SIZE];
    let first_attribute = 56usize;

    record[0..4].copy_from_slice(b"FILE");
    record[16..18].copy_from_slice(&1u16.to_le_bytes());
    record[20..22].copy_from_slice(&(first_attribute as u16).to_le_bytes());
    record[22..24].copy_from_slice(&flags.to_le_bytes());
    record[28..32].copy_from_slice(&(MFT_RECORD_SIZE as u32).to_le_bytes());
    record[32..40].copy_from_slice(&base_record.to_le_bytes());

    let mut pos = first_attribute;
    for attr in attributes {
        record[pos..pos + attr.len()].copy_from_slice(attr);
        pos += attr.len();
    }
    record[pos..pos + 4].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
    record[24..28].copy_from_slice(&((pos + 8) as u32).to_le_bytes());

    protect(&mut record, 48);
    record
}

fn index_entry(record: u64, name: &str) -> Vec<u8> {
    let name_bytes = utf16(name);
    let key_length = 66 + name_bytes.len();
    let length = align8(16 + key_length);

    let mut entry = vec![0u8; length];
    entry[0..8].copy_from_slice(&(record | 1 << 48).to_le_bytes());
    entry[8..10].copy_from_slice(&(length as u16).to_le_bytes());
    entry[10..12].copy_from_slice(&(key_length as u16).to_le_bytes());
    entry[16..24].copy_from_slice(&(ROOT_RECORD | 5 << 48).to_le_bytes());
    entry[16 + 64] = (name_bytes.len() / 2) as u8;
    entry[16 + 65] = 3; // Win32 and DOS
    entry[16 + 66..16 + 66 + name_bytes.len()].copy_from_slice(&name_bytes);
    entry
}

fn last_index_entry(has_subnode: bool) -> Vec<u8> {
    let length = if has_subnode { 24 } else { 16 };
    let flags: u16 = if has_subnode { 0x0003 } else { 0x0002 };
    let mut entry = vec![0u8; length];
    entry[8..10].copy_from_slice(&(length as u16).to_le_bytes());
    entry[12..14].copy_from_slice(&flags.to_le_bytes());
    entry
}

fn index_root(entries: &[Vec<u8>], has_subnode: bool) -> Vec<u8> {
    let mut body = entries.concat();
    body.extend(last_index_entry(has_subnode));

    let mut value = vec![0u8; 32];
    value[0..4].copy_from_slice(&0x30u32.to_le_bytes());
    value[4..8].copy_from_slice(&1u32.to_le_bytes());
    value[8..12].copy_from_slice(&(CLUSTER_SIZE as u32).to_le_bytes());
    value[12] = 1;
    value[16..20].copy_from_slice(&16u32.to_le_bytes());
    value[20..24].copy_from_slice(&((16 + body.len()) as u32).to_le_bytes());
    value[24..28].copy_from_slice(&((16 + body.len()) as u32).to_le_bytes());
    value[28] = has_subnode as u8;
    value.extend(body);
    value
}

fn index_block(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut block = vec![0u8; CLUSTER_SIZE];
    let mut body = entries.concat();
    body.extend(last_index_entry(false));

    let entries_start = 64usize;
    block[0..4].copy_from_slice(b"INDX");
    block[24..28].copy_from_slice(&((entries_start - 24) as u32).to_le_bytes());
    block[28..32].copy_from_slice(&((entries_start - 24 + body.len()) as u32).to_le_bytes());
    block[32..36].copy_from_slice(&((CLUSTER_SIZE - 24) as u32).to_le_bytes());
    block[entries_start..entries_start + body.len()].copy_from_slice(&body);

    protect(&mut block, 40);
    block
}

fn attribute_list_entry(attribute_type: u32, name: &str, vcn: u64, record: u64, id: u16) -> Vec<u8> {
    let name_bytes = utf16(name);
    let length = align8(26 + name_bytes.len());
    let mut entry = vec![0u8; length];
    entry[0..4].copy_from_slice(&attribute_type.to_le_bytes());
    entry[4..6].copy_from_slice(&(length as u16).to_le_bytes());
    entry[6] = (name_bytes.len() / 2) as u8;
    entry[7] = 26;
    entry[8..16].copy_from_slice(&vcn.to_le_bytes());
    entry[16..24].copy_from_slice(&(record | 1 << 48).to_le_bytes());
    entry[24..26].copy_from_slice(&id.to_le_bytes());
    entry[26..26 + name_bytes.len()].copy_from_slice(&name_bytes);
    entry
}

/// Builds a small NTFS image holding `/$Extend/$UsnJrnl`
///
/// Layout (4 KiB clusters): boot sector in cluster 0, a 16 record MFT in
/// clusters 4-7, the `$Extend` INDX block in cluster 9 and the allocated
/// half of `$J` in cluster 10. The first cluster of `$J` is sparse.
pub struct NtfsImageBuilder {
    journal_cluster: Vec<u8>,
    stream_name: String,
    split_journal: bool,
    forged_bitmap_size: Option<u64>,
    boot_patches: Vec<(usize, Vec<u8>)>,
}

impl Default for NtfsImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NtfsImageBuilder {
    pub fn new() -> Self {
        Self {
            journal_cluster: Vec::new(),
            stream_name: "$J".to_string(),
            split_journal: false,
            forged_bitmap_size: None,
            boot_patches: Vec::new(),
        }
    }

    /// Content of the allocated `$J` cluster, zero padded
    pub fn with_journal_cluster(mut self, data: Vec<u8>) -> Self {
        assert!(data.len() <= CLUSTER_SIZE);
        self.journal_cluster = data;
        self
    }

    /// Names the journal stream differently
    pub fn with_stream_name(mut self, name: &str) -> Self {
        self.stream_name = name.to_string();
        self
    }

    /// Moves the second `$J` fragment to an extension record
    pub fn with_split_journal(mut self) -> Self {
        self.split_journal = true;
        self
    }

    /// Makes the `$Extend` index bitmap non-resident with a bogus size
    pub fn with_forged_bitmap_size(mut self, size: u64) -> Self {
        self.forged_bitmap_size = Some(size);
        self
    }

    /// Overwrites boot sector bytes at `offset` after the image is laid out
    pub fn with_boot_bytes(mut self, offset: usize, bytes: &[u8]) -> Self {
        assert!(offset + bytes.len() <= 512);
        self.boot_patches.push((offset, bytes.to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut image = vec![0u8; IMAGE_CLUSTERS * CLUSTER_SIZE];

        // Boot sector
        image[3..11].copy_from_slice(b"NTFS    ");
        image[11..13].copy_from_slice(&512u16.to_le_bytes());
        image[13] = (CLUSTER_SIZE / 512) as u8;
        let sectors = (image.len() / 512) as u64;
        image[40..48].copy_from_slice(&sectors.to_le_bytes());
        image[48..56].copy_from_slice(&(MFT_LCN as u64).to_le_bytes());
        image[56..64].copy_from_slice(&8u64.to_le_bytes());
        image[64] = (-10i8) as u8;
        image[68] = 1;
        image[72..80].copy_from_slice(&0x1234_5678_9ABC_DEF0u64.to_le_bytes());
        image[510..512].copy_from_slice(&[0x55, 0xAA]);

        let mut records: Vec<(u64, Vec<u8>)> = Vec::new();

        // $MFT
        let mft_runs = [0x11, MFT_RECORDS as u8 / 4, MFT_LCN as u8, 0x00];
        records.push((
            0,
            mft_record(
                RECORD_IN_USE,
                0,
                &[non_resident(0x80, None, 1, &mft_runs, 0, 3, (MFT_RECORDS * MFT_RECORD_SIZE) as u64)],
            ),
        ));

        // Root directory: small index held in $INDEX_ROOT
        records.push((
            ROOT_RECORD,
            mft_record(
                RECORD_IN_USE | RECORD_IS_DIRECTORY,
                0,
                &[resident(
                    0x90,
                    Some("$I30"),
                    1,
                    &index_root(&[index_entry(EXTEND_RECORD, "$Extend")], false),
                )],
            ),
        ));

        // $Extend: entries live in an INDX block
        let allocation_runs = [0x11, 0x01, EXTEND_INDEX_LCN, 0x00];
        let bitmap = match self.forged_bitmap_size {
            Some(size) => non_resident(0xB0, Some("$I30"), 3, &[0x01, 0x01, 0x00], 0, 0, size),
            None => resident(0xB0, Some("$I30"), 3, &[0x01, 0, 0, 0, 0, 0, 0, 0]),
        };
        records.push((
            EXTEND_RECORD,
            mft_record(
                RECORD_IN_USE | RECORD_IS_DIRECTORY,
                0,
                &[
                    resident(0x90, Some("$I30"), 1, &index_root(&[], true)),
                    non_resident(0xA0, Some("$I30"), 2, &allocation_runs, 0, 0, CLUSTER_SIZE as u64),
                    bitmap,
                ],
            ),
        ));
        let extend_index = index_block(&[
            index_entry(24, "$ObjId"),
            index_entry(USN_JOURNAL_RECORD, "$UsnJrnl"),
        ]);
        let at = EXTEND_INDEX_LCN as usize * CLUSTER_SIZE;
        image[at..at + CLUSTER_SIZE].copy_from_slice(&extend_index);

        // $UsnJrnl with $Max and $J
        let max_value = [0u8; 32];
        let stream = self.stream_name.as_str();
        if self.split_journal {
            let list = [
                attribute_list_entry(0x80, "$Max", 0, USN_JOURNAL_RECORD, 1),
                attribute_list_entry(0x80, stream, 0, USN_JOURNAL_RECORD, 2),
                attribute_list_entry(0x80, stream, 1, JOURNAL_EXTENSION_RECORD, 0),
            ]
            .concat();
            records.push((
                USN_JOURNAL_RECORD,
                mft_record(
                    RECORD_IN_USE,
                    0,
                    &[
                        resident(0x20, None, 4, &list),
                        resident(0x80, Some("$Max"), 1, &max_value),
                        non_resident(0x80, Some(stream), 2, &[0x01, 0x01, 0x00], 0, 0, JOURNAL_DATA_SIZE),
                    ],
                ),
            ));
            records.push((
                JOURNAL_EXTENSION_RECORD,
                mft_record(
                    RECORD_IN_USE,
                    USN_JOURNAL_RECORD | 1 << 48,
                    &[non_resident(0x80, Some(stream), 0, &[0x11, 0x01, JOURNAL_LCN, 0x00], 1, 1, 0)],
                ),
            ));
        } else {
            let journal_runs = [0x01, 0x01, 0x11, 0x01, JOURNAL_LCN, 0x00];
            records.push((
                USN_JOURNAL_RECORD,
                mft_record(
                    RECORD_IN_USE,
                    0,
                    &[
                        resident(0x80, Some("$Max"), 1, &max_value),
                        non_resident(0x80, Some(stream), 2, &journal_runs, 0, 1, JOURNAL_DATA_SIZE),
                    ],
                ),
            ));
        }

        for (number, record) in records {
            let at = MFT_LCN * CLUSTER_SIZE + number as usize * MFT_RECORD_SIZE;
            image[at..at + MFT_RECORD_SIZE].copy_from_slice(&record);
        }

        let at = JOURNAL_LCN as usize * CLUSTER_SIZE;
        image[at..at + self.journal_cluster.len()].copy_from_slice(&self.journal_cluster);

        for (offset, bytes) in &self.boot_patches {
            image[*offset..*offset + bytes.len()].copy_from_slice(bytes);
        }

        image
    }

    /// Writes the image to `dir/ntfs.img` and returns its path
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        let path = dir.join("ntfs.img");
        fs::write(&path, self.build()).unwrap();
        path
    }
}
