//! usn_dump
//!
//! Locates the NTFS change journal (`$UsnJrnl:$J`) behind a file, a
//! directory tree, a disk image or a volume handle, streams its bytes to a
//! record decoder and emits every decoded record as a JSON line.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
