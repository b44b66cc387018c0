//! NTFS volume reader
//!
//! Reads just enough NTFS to reach a named attribute by path: the boot
//! sector, MFT records with their attribute lists, and directory indexes.
//! Only uncompressed, unencrypted non-resident streams are readable.

mod boot_sector;
mod bytes;
mod data_runs;
mod index;
mod reader;
mod record;
mod volume;

pub use boot_sector::NtfsBootSector;
pub use reader::{NtfsEntry, NtfsFileSystem, NtfsImage, NtfsImageOpener};
pub use volume::{NtfsVolume, ROOT_DIRECTORY_RECORD};
