//! NTFS boot sector
//!
//! The BIOS Parameter Block at the start of the volume gives the cluster
//! geometry and the location of the Master File Table.

use crate::domain::repositories::VolumeError;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// NTFS boot sector signature "NTFS    "
pub const NTFS_OEM_ID: [u8; 8] = [0x4E, 0x54, 0x46, 0x53, 0x20, 0x20, 0x20, 0x20];

/// Boot sector size
pub const BOOT_SECTOR_SIZE: usize = 512;

/// Largest cluster size NTFS supports (2 MiB)
const MAX_CLUSTER_SIZE: u64 = 2 * 1024 * 1024;

/// FILE and INDX records span at least one fixup stride
const MIN_RECORD_SIZE: u64 = 512;
const MAX_RECORD_SIZE: u64 = 64 * 1024;

/// NTFS boot sector fields needed to locate metadata
#[derive(Debug, Clone)]
pub struct NtfsBootSector {
    /// OEM ID "NTFS    "
    oem_id: [u8; 8],
    /// Bytes per sector
    bytes_per_sector: u16,
    /// Raw sectors per cluster byte (values above 0x80 encode a power of two)
    sectors_per_cluster: u8,
    /// Total sectors in volume
    total_sectors: u64,
    /// LCN of MFT
    mft_lcn: u64,
    /// Clusters per MFT record (negative means 2^|value| bytes)
    clusters_per_mft_record: i8,
    /// Clusters per index record (same encoding)
    clusters_per_index_record: i8,
    /// Volume serial number
    volume_serial: u64,
}

impl NtfsBootSector {
    /// Parses boot sector from raw bytes
    pub fn parse(data: &[u8]) -> Result<Self, VolumeError> {
        if data.len() < BOOT_SECTOR_SIZE {
            return Err(VolumeError::FileSystemOpen(
                "NTFS boot sector too small".to_string(),
            ));
        }

        let invalid = |e: std::io::Error| VolumeError::FileSystemOpen(e.to_string());
        let mut cursor = Cursor::new(data);

        // OEM ID at offset 3
        cursor.set_position(3);
        let mut oem_id = [0u8; 8];
        for byte in &mut oem_id {
            *byte = cursor.read_u8().map_err(invalid)?;
        }

        // Bytes per sector at offset 11, sectors per cluster at 13
        let bytes_per_sector = cursor.read_u16::<LittleEndian>().map_err(invalid)?;
        let sectors_per_cluster = cursor.read_u8().map_err(invalid)?;

        // Total sectors at offset 40, then MFT LCN and MFT mirror LCN
        cursor.set_position(40);
        let total_sectors = cursor.read_u64::<LittleEndian>().map_err(invalid)?;
        let mft_lcn = cursor.read_u64::<LittleEndian>().map_err(invalid)?;
        let _mft_mirror_lcn = cursor.read_u64::<LittleEndian>().map_err(invalid)?;

        // Clusters per MFT record at offset 64
        let clusters_per_mft_record = cursor.read_i8().map_err(invalid)?;

        // Clusters per index record at offset 68
        cursor.set_position(68);
        let clusters_per_index_record = cursor.read_i8().map_err(invalid)?;

        // Volume serial at offset 72
        cursor.set_position(72);
        let volume_serial = cursor.read_u64::<LittleEndian>().map_err(invalid)?;

        Ok(Self {
            oem_id,
            bytes_per_sector,
            sectors_per_cluster,
            total_sectors,
            mft_lcn,
            clusters_per_mft_record,
            clusters_per_index_record,
            volume_serial,
        })
    }

    /// Validates the boot sector
    ///
    /// Besides the signature, every derived size must be representable and
    /// within the limits NTFS itself supports.
    pub fn is_valid(&self) -> bool {
        let record_size_ok =
            |size: Option<u64>| size.is_some_and(|s| (MIN_RECORD_SIZE..=MAX_RECORD_SIZE).contains(&s));

        self.oem_id == NTFS_OEM_ID
            && self.bytes_per_sector >= 256
            && self.bytes_per_sector.is_power_of_two()
            && self.sectors_per_cluster > 0
            && self.total_sectors > 0
            && self
                .checked_cluster_size()
                .is_some_and(|size| size <= MAX_CLUSTER_SIZE)
            && record_size_ok(self.checked_record_size(self.clusters_per_mft_record))
            && record_size_ok(self.checked_record_size(self.clusters_per_index_record))
            && self.checked_mft_offset().is_some()
    }

    fn checked_cluster_size(&self) -> Option<u64> {
        let sectors = if self.sectors_per_cluster > 0x80 {
            1u64.checked_shl(256 - self.sectors_per_cluster as u32)?
        } else {
            self.sectors_per_cluster as u64
        };
        (self.bytes_per_sector as u64).checked_mul(sectors)
    }

    fn checked_record_size(&self, clusters_per_record: i8) -> Option<u64> {
        if clusters_per_record > 0 {
            self.checked_cluster_size()?
                .checked_mul(clusters_per_record as u64)
        } else {
            1u64.checked_shl(-(clusters_per_record as i32) as u32)
        }
    }

    fn checked_mft_offset(&self) -> Option<u64> {
        self.mft_lcn.checked_mul(self.checked_cluster_size()?)
    }

    /// Returns the cluster size in bytes; 0 unless `is_valid()`
    pub fn cluster_size(&self) -> u64 {
        self.checked_cluster_size().unwrap_or(0)
    }

    /// Returns the MFT record size in bytes; 0 unless `is_valid()`
    pub fn mft_record_size(&self) -> u64 {
        self.checked_record_size(self.clusters_per_mft_record)
            .unwrap_or(0)
    }

    /// Returns the index record (INDX block) size in bytes; 0 unless `is_valid()`
    pub fn index_record_size(&self) -> u64 {
        self.checked_record_size(self.clusters_per_index_record)
            .unwrap_or(0)
    }

    /// Returns the MFT offset in bytes; 0 unless `is_valid()`
    pub fn mft_offset(&self) -> u64 {
        self.checked_mft_offset().unwrap_or(0)
    }

    /// Returns total volume size in bytes
    pub fn volume_size(&self) -> u64 {
        self.total_sectors.saturating_mul(self.bytes_per_sector as u64)
    }

    pub fn volume_serial(&self) -> u64 {
        self.volume_serial
    }
}
