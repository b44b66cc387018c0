//! Dump report DTO

use std::time::Duration;

/// Summary of a dump run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpReport {
    /// Locator the run was started with
    pub source: String,
    /// Streams decoded to completion
    pub streams_processed: usize,
    /// Records handed to the sink
    pub records_emitted: u64,
    pub duration: Duration,
}

impl DumpReport {
    pub fn new(source: String) -> Self {
        Self {
            source,
            streams_processed: 0,
            records_emitted: 0,
            duration: Duration::ZERO,
        }
    }

    /// Records a fully decoded stream
    pub fn add_stream(&mut self, records: u64) {
        self.streams_processed += 1;
        self.records_emitted += records;
    }

    /// Returns a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "Dumped {} records from {} stream(s) of {} in {:.2}s",
            self.records_emitted,
            self.streams_processed,
            self.source,
            self.duration.as_secs_f64()
        )
    }
}
