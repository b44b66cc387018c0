//! File system readers

pub mod ntfs;

pub use ntfs::NtfsImageOpener;
