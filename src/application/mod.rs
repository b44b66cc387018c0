//! Application layer
//!
//! Use cases that orchestrate the domain services and repositories.

pub mod dto;
mod dump_journal;

pub use dump_journal::{volume_label, DumpError, DumpJournalUseCase};
