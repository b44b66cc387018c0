//! Record decoder trait
//!
//! A decoder turns a labelled byte stream into a lazy, finite sequence of
//! records. The pipeline pulls one record at a time and never restarts a
//! sequence.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek};
use thiserror::Error;

/// Errors raised while decoding a journal stream
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("I/O error at stream offset {offset}: {error}")]
    Io {
        offset: u64,
        #[source]
        error: io::Error,
    },

    #[error("Invalid record at offset {offset}: {reason}")]
    InvalidRecord { offset: u64, reason: String },

    #[error("Unsupported record version {major}.{minor} at offset {offset}")]
    UnsupportedVersion { offset: u64, major: u16, minor: u16 },

    #[error("Truncated record at offset {offset}: expected {expected} bytes, {available} available")]
    Truncated {
        offset: u64,
        expected: u32,
        available: usize,
    },
}

impl DecodeError {
    /// Returns the stream offset the error was raised at
    pub fn offset(&self) -> u64 {
        match self {
            DecodeError::Io { offset, .. }
            | DecodeError::InvalidRecord { offset, .. }
            | DecodeError::UnsupportedVersion { offset, .. }
            | DecodeError::Truncated { offset, .. } => *offset,
        }
    }
}

/// A readable, seekable stream of known size
pub trait ByteStream: Read + Seek {
    /// Returns the total size of the stream in bytes
    fn stream_size(&mut self) -> io::Result<u64>;
}

impl ByteStream for File {
    fn stream_size(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

impl<T: AsRef<[u8]>> ByteStream for Cursor<T> {
    fn stream_size(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().as_ref().len() as u64)
    }
}

impl<S: ByteStream + ?Sized> ByteStream for Box<S> {
    fn stream_size(&mut self) -> io::Result<u64> {
        (**self).stream_size()
    }
}

/// Trait for decoding journal records from a byte stream
pub trait RecordDecoder {
    /// The decoded record type
    type Record;

    /// Lazy record sequence over one stream
    type Records<S: ByteStream>: Iterator<Item = Result<Self::Record, DecodeError>>;

    /// Starts decoding `stream`; `label` identifies the stream in each record
    fn decode<S: ByteStream>(&self, label: &str, stream: S) -> Self::Records<S>;
}
