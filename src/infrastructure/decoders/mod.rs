//! Journal record decoders

mod usn_v2;

pub use usn_v2::{
    filetime_to_utc, UsnJournalDecoder, UsnRecords, DEFAULT_CHUNK_SIZE, MAX_RECORD_LENGTH,
    USN_V2_HEADER_SIZE,
};
