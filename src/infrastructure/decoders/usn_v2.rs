//! `USN_RECORD_V2` stream decoder
//!
//! The `$J` stream is a sequence of 8-byte aligned records. Its head is
//! usually sparse and pages end in zero padding, so zero-filled stretches
//! are skipped rather than treated as records.

use crate::domain::entities::{FileReference, UsnEntry, UsnReason, UsnRecordV2, UsnSourceInfo};
use crate::domain::repositories::{ByteStream, DecodeError, RecordDecoder};
use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};
use std::io::{Read, SeekFrom};

/// Fixed part of a `USN_RECORD_V2`, up to the file name
pub const USN_V2_HEADER_SIZE: u32 = 60;

/// Largest record length accepted before the stream is declared corrupt
pub const MAX_RECORD_LENGTH: u32 = 0x1_0000;

/// Default number of bytes pulled from the stream per read
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

const RECORD_ALIGNMENT: usize = 8;

/// Seconds between 1601-01-01 and 1970-01-01
const FILETIME_UNIX_EPOCH_SECS: i64 = 11_644_473_600;
const FILETIME_TICKS_PER_SEC: u64 = 10_000_000;

/// Converts a FILETIME (100ns ticks since 1601) to UTC
pub fn filetime_to_utc(filetime: u64) -> Option<DateTime<Utc>> {
    let secs = (filetime / FILETIME_TICKS_PER_SEC) as i64 - FILETIME_UNIX_EPOCH_SECS;
    let nanos = ((filetime % FILETIME_TICKS_PER_SEC) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

/// Decoder for version 2 change journal records
#[derive(Debug, Clone, Copy)]
pub struct UsnJournalDecoder {
    chunk_size: usize,
}

impl UsnJournalDecoder {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(USN_V2_HEADER_SIZE as usize),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Default for UsnJournalDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl RecordDecoder for UsnJournalDecoder {
    type Record = UsnEntry;
    type Records<S: ByteStream> = UsnRecords<S>;

    fn decode<S: ByteStream>(&self, label: &str, stream: S) -> UsnRecords<S> {
        tracing::debug!("Decoding USN records from {}", label);
        UsnRecords {
            label: label.to_string(),
            stream,
            chunk_size: self.chunk_size,
            buffer: Vec::with_capacity(self.chunk_size),
            buffer_offset: 0,
            position: 0,
            size: None,
            finished: false,
        }
    }
}

/// Lazy iterator over the records of one stream
///
/// Yields at most one error, after which it is exhausted.
pub struct UsnRecords<S: ByteStream> {
    label: String,
    stream: S,
    chunk_size: usize,
    /// Bytes read ahead from the stream, starting at `buffer_offset`
    buffer: Vec<u8>,
    buffer_offset: u64,
    /// Stream offset of the next record
    position: u64,
    size: Option<u64>,
    finished: bool,
}

impl<S: ByteStream> UsnRecords<S> {
    fn io_error(&self, error: std::io::Error) -> DecodeError {
        DecodeError::Io {
            offset: self.position,
            error,
        }
    }

    fn stream_size(&mut self) -> Result<u64, DecodeError> {
        if let Some(size) = self.size {
            return Ok(size);
        }

        let size = self.stream.stream_size().map_err(|e| self.io_error(e))?;
        self.stream
            .seek(SeekFrom::Start(0))
            .map_err(|e| self.io_error(e))?;
        self.size = Some(size);
        Ok(size)
    }

    /// Bytes available from the current position
    fn window(&self) -> &[u8] {
        let start = (self.position - self.buffer_offset) as usize;
        &self.buffer[start.min(self.buffer.len())..]
    }

    /// Buffers at least `needed` bytes from the current position, fewer at EOF
    fn fill(&mut self, needed: usize) -> Result<usize, DecodeError> {
        let consumed = ((self.position - self.buffer_offset) as usize).min(self.buffer.len());
        if consumed > 0 {
            self.buffer.drain(..consumed);
            self.buffer_offset += consumed as u64;
        }

        while self.buffer.len() < needed {
            let want = self.chunk_size.max(needed - self.buffer.len()) as u64;
            let read = (&mut self.stream)
                .take(want)
                .read_to_end(&mut self.buffer)
                .map_err(|e| DecodeError::Io {
                    offset: self.position,
                    error: e,
                })?;
            if read == 0 {
                break;
            }
        }

        Ok(self.window().len())
    }

    /// Moves past a zero-filled stretch; returns false at end of stream
    fn skip_zeros(&mut self) -> Result<bool, DecodeError> {
        loop {
            if self.fill(self.chunk_size)? == 0 {
                return Ok(false);
            }

            let window = self.window();
            match window.iter().position(|b| *b != 0) {
                Some(index) => {
                    self.position += (index - index % RECORD_ALIGNMENT) as u64;
                    return Ok(true);
                }
                None => self.position += window.len() as u64,
            }
        }
    }

    fn next_record(&mut self) -> Result<Option<UsnEntry>, DecodeError> {
        let size = self.stream_size()?;

        loop {
            if self.position >= size {
                return Ok(None);
            }

            let available = self.fill(4)?;
            if available < 4 {
                if self.window().iter().all(|b| *b == 0) {
                    return Ok(None);
                }
                return Err(DecodeError::Truncated {
                    offset: self.position,
                    expected: 4,
                    available,
                });
            }

            let record_length = LittleEndian::read_u32(self.window());
            if record_length == 0 {
                if !self.skip_zeros()? {
                    return Ok(None);
                }
                if self.fill(4)? >= 4 && LittleEndian::read_u32(self.window()) == 0 {
                    // Non-zero bytes further inside this aligned word
                    self.position += RECORD_ALIGNMENT as u64;
                    return Err(DecodeError::InvalidRecord {
                        offset: self.position - RECORD_ALIGNMENT as u64,
                        reason: "non-zero padding without a record length".to_string(),
                    });
                }
                continue;
            }

            return self.parse_record(record_length).map(Some);
        }
    }

    fn parse_record(&mut self, record_length: u32) -> Result<UsnEntry, DecodeError> {
        let offset = self.position;
        if !(USN_V2_HEADER_SIZE..=MAX_RECORD_LENGTH).contains(&record_length) {
            return Err(DecodeError::InvalidRecord {
                offset,
                reason: format!("record length {} out of range", record_length),
            });
        }

        let available = self.fill(record_length as usize)?;
        if available < record_length as usize {
            return Err(DecodeError::Truncated {
                offset,
                expected: record_length,
                available,
            });
        }

        let data = &self.window()[..record_length as usize];
        let major_version = LittleEndian::read_u16(&data[4..]);
        let minor_version = LittleEndian::read_u16(&data[6..]);
        if major_version != 2 {
            return Err(DecodeError::UnsupportedVersion {
                offset,
                major: major_version,
                minor: minor_version,
            });
        }

        let file_name_length = LittleEndian::read_u16(&data[56..]);
        let file_name_offset = LittleEndian::read_u16(&data[58..]);
        let name_start = file_name_offset as usize;
        let name_end = name_start + file_name_length as usize;
        if name_start < USN_V2_HEADER_SIZE as usize || name_end > data.len() {
            return Err(DecodeError::InvalidRecord {
                offset,
                reason: format!(
                    "file name ({} bytes at {}) outside the record",
                    file_name_length, file_name_offset
                ),
            });
        }
        let units: Vec<u16> = data[name_start..name_end]
            .chunks_exact(2)
            .map(LittleEndian::read_u16)
            .collect();

        let filetime = LittleEndian::read_u64(&data[32..]);
        let timestamp = filetime_to_utc(filetime).ok_or_else(|| DecodeError::InvalidRecord {
            offset,
            reason: format!("timestamp {} out of range", filetime),
        })?;

        let record = UsnRecordV2 {
            record_length,
            major_version,
            minor_version,
            file_reference: FileReference::from(LittleEndian::read_u64(&data[8..])),
            parent_reference: FileReference::from(LittleEndian::read_u64(&data[16..])),
            usn: LittleEndian::read_u64(&data[24..]),
            timestamp,
            reason: UsnReason::from_bits_retain(LittleEndian::read_u32(&data[40..])),
            source_info: UsnSourceInfo::from_bits_retain(LittleEndian::read_u32(&data[44..])),
            security_id: LittleEndian::read_u32(&data[48..]),
            file_attributes: LittleEndian::read_u32(&data[52..]),
            file_name_length,
            file_name_offset,
            file_name: String::from_utf16_lossy(&units),
        };

        self.position += record_length as u64;

        Ok(UsnEntry {
            source: self.label.clone(),
            offset,
            record,
        })
    }
}

impl<S: ByteStream> Iterator for UsnRecords<S> {
    type Item = Result<UsnEntry, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.next_record() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                tracing::debug!("Stopping {} at offset {}: {}", self.label, e.offset(), e);
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
