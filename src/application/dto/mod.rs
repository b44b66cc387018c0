//! Data Transfer Objects

mod dump_options;
mod dump_report;

pub use dump_options::{DumpOptions, DEFAULT_JOURNAL_ENTRY_PATH, DEFAULT_JOURNAL_STREAM_NAME};
pub use dump_report::DumpReport;
