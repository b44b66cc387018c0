//! Repository traits (interfaces)
//!
//! These traits define the contracts for external collaborators: raw
//! device access, volume/attribute lookup, record decoding and output.

mod block_device;
mod record_decoder;
mod record_sink;
mod volume;

pub use block_device::{BlockDeviceError, BlockDeviceReader};
pub use record_decoder::{ByteStream, DecodeError, RecordDecoder};
pub use record_sink::{RecordSink, SinkError};
pub use volume::{
    AttributeSource, ImageOpener, VolumeError, VolumeFileSystem, VolumeImage,
};
