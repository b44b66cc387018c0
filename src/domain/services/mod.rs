//! Domain services
//!
//! Source classification, journal file discovery and the attribute
//! stream adapter. None of these know about NTFS or the record format.

mod attribute_stream;
mod journal_walker;
mod source_classifier;

pub use attribute_stream::{AttributeStream, StreamCursor, StreamError, Whence};
pub use journal_walker::{is_journal_file_name, JournalFileWalker, WalkError, JOURNAL_FILE_SUFFIX};
pub use source_classifier::{classify_source, match_volume_pattern, ClassifyError, VolumePattern};
