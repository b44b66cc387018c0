//! Random-access attribute stream
//!
//! Adapts an attribute's random-read primitive (`read_at(offset, length,
//! type, id)`) into a cursor-based stream. Every read goes straight to
//! the primitive; nothing is buffered or read ahead.

use crate::domain::entities::AttributeDescriptor;
use crate::domain::repositories::{AttributeSource, ByteStream, VolumeError};
use std::io::{self, Read, Seek, SeekFrom};
use thiserror::Error;

/// Errors raised by stream cursor operations
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Invalid current offset value less than zero: {0}")]
    NegativeOffset(i64),

    #[error("Invalid offset value: {0}")]
    InvalidOffset(i128),

    #[error("Unsupported whence: {0}")]
    UnsupportedWhence(i32),

    #[error("Failed to read {descriptor} at offset {offset}: {source}")]
    Read {
        descriptor: String,
        offset: u64,
        #[source]
        source: VolumeError,
    },
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Read { .. } => io::Error::other(err),
            _ => io::Error::new(io::ErrorKind::InvalidInput, err),
        }
    }
}

/// Reference point for a seek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl TryFrom<i32> for Whence {
    type Error = StreamError;

    /// Maps the conventional `SEEK_SET`/`SEEK_CUR`/`SEEK_END` codes
    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Whence::Start),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            other => Err(StreamError::UnsupportedWhence(other)),
        }
    }
}

/// Read position within one attribute
///
/// Owned by exactly one stream. The offset may sit past the end of the
/// attribute after a seek, in which case reads return nothing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamCursor {
    offset: i64,
}

impl StreamCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Reads up to `requested` bytes (all remaining bytes if `None`)
    ///
    /// Returns an empty buffer at or past the end of the attribute and
    /// advances by the number of bytes the primitive actually returned.
    pub fn read<E: AttributeSource + ?Sized>(
        &mut self,
        source: &E,
        descriptor: &AttributeDescriptor,
        requested: Option<usize>,
    ) -> Result<Vec<u8>, StreamError> {
        if self.offset < 0 {
            return Err(StreamError::NegativeOffset(self.offset));
        }

        let offset = self.offset as u64;
        let size = descriptor.size();
        if offset >= size {
            return Ok(Vec::new());
        }

        let remaining = size - offset;
        let length = requested.map_or(remaining, |n| (n as u64).min(remaining));
        let length = usize::try_from(length).unwrap_or(usize::MAX);
        if length == 0 {
            return Ok(Vec::new());
        }

        let mut data = source
            .read_at(
                offset,
                length,
                descriptor.attribute_type(),
                descriptor.attribute_id(),
            )
            .map_err(|source| StreamError::Read {
                descriptor: descriptor.to_string(),
                offset,
                source,
            })?;

        // A primitive must never hand back bytes beyond the clamp
        data.truncate(length);
        self.offset += data.len() as i64;

        Ok(data)
    }

    /// Moves the cursor and returns the new absolute offset
    pub fn seek(&mut self, delta: i64, whence: Whence, size: u64) -> Result<u64, StreamError> {
        let base: i128 = match whence {
            Whence::Start => 0,
            Whence::Current => self.offset as i128,
            Whence::End => size as i128,
        };

        let candidate = base + delta as i128;
        if candidate < 0 || candidate > i64::MAX as i128 {
            return Err(StreamError::InvalidOffset(candidate));
        }

        self.offset = candidate as i64;
        Ok(self.offset as u64)
    }
}

/// Seekable byte stream over one attribute of a file system entry
///
/// # Example
///
/// ```ignore
/// let descriptor = AttributeDescriptor::new("/$Extend/$UsnJrnl", &info);
/// let mut stream = AttributeStream::new(entry, descriptor);
/// let header = stream.read_bytes(Some(60))?;
/// stream.seek_to(0, Whence::End)?;
/// assert!(stream.read_bytes(None)?.is_empty());
/// ```
pub struct AttributeStream<E: AttributeSource> {
    source: E,
    descriptor: AttributeDescriptor,
    cursor: StreamCursor,
}

impl<E: AttributeSource> AttributeStream<E> {
    pub fn new(source: E, descriptor: AttributeDescriptor) -> Self {
        Self {
            source,
            descriptor,
            cursor: StreamCursor::new(),
        }
    }

    pub fn descriptor(&self) -> &AttributeDescriptor {
        &self.descriptor
    }

    pub fn source(&self) -> &E {
        &self.source
    }

    /// Reads up to `requested` bytes from the current position
    pub fn read_bytes(&mut self, requested: Option<usize>) -> Result<Vec<u8>, StreamError> {
        self.cursor
            .read(&self.source, &self.descriptor, requested)
    }

    /// Seeks relative to `whence` and returns the new position
    pub fn seek_to(&mut self, delta: i64, whence: Whence) -> Result<u64, StreamError> {
        self.cursor.seek(delta, whence, self.descriptor.size())
    }

    /// Seeks with a raw `SEEK_*` whence code
    pub fn seek_raw(&mut self, delta: i64, whence: i32) -> Result<u64, StreamError> {
        let whence = Whence::try_from(whence)?;
        self.seek_to(delta, whence)
    }

    /// Current offset from the start of the attribute
    pub fn position(&self) -> u64 {
        self.cursor.offset().max(0) as u64
    }

    /// Attribute size captured when the stream was opened
    pub fn size(&self) -> u64 {
        self.descriptor.size()
    }
}

impl<E: AttributeSource> Read for AttributeStream<E> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.read_bytes(Some(buf.len()))?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

impl<E: AttributeSource> Seek for AttributeStream<E> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_offset = match pos {
            SeekFrom::Start(offset) => {
                let offset = i64::try_from(offset)
                    .map_err(|_| StreamError::InvalidOffset(offset as i128))?;
                self.seek_to(offset, Whence::Start)?
            }
            SeekFrom::Current(delta) => self.seek_to(delta, Whence::Current)?,
            SeekFrom::End(delta) => self.seek_to(delta, Whence::End)?,
        };
        Ok(new_offset)
    }
}

impl<E: AttributeSource> ByteStream for AttributeStream<E> {
    fn stream_size(&mut self) -> io::Result<u64> {
        Ok(self.size())
    }
}
