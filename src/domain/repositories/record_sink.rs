//! Record sink trait
//!
//! Where decoded records go. Each record is emitted as soon as it is
//! handed over; sinks do not batch.

use std::io;
use thiserror::Error;

/// Errors that can occur when emitting a record
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

/// Trait for emitting decoded records in order
pub trait RecordSink<R> {
    fn emit(&mut self, record: &R) -> Result<(), SinkError>;

    /// Number of records emitted so far
    fn records_emitted(&self) -> u64;
}
