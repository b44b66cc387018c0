//! Record output writers

mod json_lines_writer;

pub use json_lines_writer::JsonLinesWriter;
