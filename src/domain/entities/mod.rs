//! Domain entities
//!
//! Core objects of the journal dumping domain: what a locator refers to,
//! which attribute holds the journal, and what a decoded record looks like.

mod attribute;
mod source;
mod usn_record;

pub use attribute::{AttributeDescriptor, AttributeInfo, AttributeType};
pub use source::SourceKind;
pub use usn_record::{FileReference, UsnEntry, UsnReason, UsnRecordV2, UsnSourceInfo};
