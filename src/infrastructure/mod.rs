//! Infrastructure layer
//!
//! Concrete implementations of the domain repositories: block devices,
//! the NTFS volume reader, the USN record decoder and the JSON lines writer.
//! This layer contains all external dependencies and platform-specific code.

pub mod block_device;
pub mod decoders;
pub mod file_systems;
pub mod persistence;
