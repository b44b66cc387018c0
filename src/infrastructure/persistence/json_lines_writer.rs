//! JSON lines record writer
//!
//! Writes each record as one self-contained JSON object followed by a
//! newline, flushing after every record so a consumer reading the pipe
//! sees records as soon as they are decoded.

use crate::domain::repositories::{RecordSink, SinkError};
use serde::Serialize;
use std::io::Write;

/// Record sink serializing to JSON lines
pub struct JsonLinesWriter<W: Write> {
    writer: W,
    records_emitted: u64,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            records_emitted: 0,
        }
    }

    /// Returns the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write, R: Serialize> RecordSink<R> for JsonLinesWriter<W> {
    fn emit(&mut self, record: &R) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, record)
            .map_err(|e| SinkError::Serialization(e.to_string()))?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.records_emitted += 1;
        Ok(())
    }

    fn records_emitted(&self) -> u64 {
        self.records_emitted
    }
}
