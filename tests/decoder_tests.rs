//! USN_RECORD_V2 decoder tests

mod common;

use common::{usn_record, usn_records, RECORD_TIMESTAMP, REASON_CLOSE, REASON_FILE_CREATE};
use rstest::*;
use std::io::Cursor;
use usn_dump::domain::entities::{UsnEntry, UsnReason};
use usn_dump::domain::repositories::{DecodeError, RecordDecoder};
use usn_dump::infrastructure::decoders::UsnJournalDecoder;

#[fixture]
fn decoder() -> UsnJournalDecoder {
    UsnJournalDecoder::default()
}

fn decode_all(decoder: &UsnJournalDecoder, data: Vec<u8>) -> Vec<Result<UsnEntry, DecodeError>> {
    decoder.decode("journal$J", Cursor::new(data)).collect()
}

// ============================================================================
// Well-formed streams
// ============================================================================

#[rstest]
fn test_decodes_record_fields(decoder: UsnJournalDecoder) {
    let data = usn_record(0x4000, "report.docx", REASON_FILE_CREATE | REASON_CLOSE);
    let results = decode_all(&decoder, data.clone());

    assert_eq!(results.len(), 1);
    let entry = results[0].as_ref().unwrap();
    assert_eq!(entry.source, "journal$J");
    assert_eq!(entry.offset, 0);

    let record = &entry.record;
    assert_eq!(record.record_length as usize, data.len());
    assert_eq!(record.major_version, 2);
    assert_eq!(record.file_reference.entry, 40);
    assert_eq!(record.file_reference.sequence, 3);
    assert_eq!(record.parent_reference.entry, 5);
    assert_eq!(record.usn, 0x4000);
    assert_eq!(record.reason, UsnReason::FILE_CREATE | UsnReason::CLOSE);
    assert_eq!(record.file_attributes, 0x20);
    assert_eq!(record.file_name, "report.docx");
    assert_eq!(record.timestamp.to_rfc3339(), "2024-01-01T00:00:00+00:00");
}

#[rstest]
#[case(1)]
#[case(5)]
#[case(200)]
fn test_n_records_in_order(decoder: UsnJournalDecoder, #[case] count: usize) {
    let entries: Vec<UsnEntry> = decode_all(&decoder, usn_records(count))
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(entries.len(), count);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.record.file_name, format!("file_{}.txt", i));
        assert_eq!(entry.offset, entry.record.usn);
    }
}

#[rstest]
fn test_empty_stream(decoder: UsnJournalDecoder) {
    assert!(decode_all(&decoder, Vec::new()).is_empty());
}

#[rstest]
fn test_skips_sparse_head_and_padding(decoder: UsnJournalDecoder) {
    let mut data = vec![0u8; 8192];
    data.extend(usn_record(8192, "a.txt", REASON_FILE_CREATE));
    data.extend(vec![0u8; 4096 - data.len() % 4096]);
    let second = data.len() as u64;
    data.extend(usn_record(second, "b.txt", REASON_CLOSE));
    data.extend(vec![0u8; 100]);

    let entries: Vec<UsnEntry> = decode_all(&decoder, data)
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].offset, 8192);
    assert_eq!(entries[1].offset, second);
    assert_eq!(entries[1].record.file_name, "b.txt");
}

#[rstest]
#[case(64)]
#[case(100)]
#[case(4096)]
fn test_result_independent_of_chunk_size(#[case] chunk_size: usize) {
    let mut data = vec![0u8; 1000];
    data.extend(usn_records(50));

    let small = UsnJournalDecoder::new(chunk_size);
    let large = UsnJournalDecoder::new(1 << 20);
    let a: Vec<UsnEntry> = decode_all(&small, data.clone()).into_iter().map(Result::unwrap).collect();
    let b: Vec<UsnEntry> = decode_all(&large, data).into_iter().map(Result::unwrap).collect();
    assert_eq!(a, b);
}

#[rstest]
fn test_json_shape(decoder: UsnJournalDecoder) {
    let entry = decode_all(&decoder, usn_record(8, "a.txt", REASON_FILE_CREATE | REASON_CLOSE))
        .remove(0)
        .unwrap();
    let value = serde_json::to_value(&entry).unwrap();

    assert_eq!(value["_source"], "journal$J");
    assert_eq!(value["_offset"], 0);
    assert_eq!(value["usn"], 8);
    assert_eq!(value["file_name"], "a.txt");
    assert_eq!(value["timestamp"], RECORD_TIMESTAMP);
    assert_eq!(value["reason"], "USN_REASON_FILE_CREATE | USN_REASON_CLOSE");
    assert_eq!(value["file_reference"]["entry"], 40);
    assert_eq!(value["file_reference"]["sequence"], 3);
}

// ============================================================================
// Malformed streams
// ============================================================================

#[rstest]
fn test_truncated_record(decoder: UsnJournalDecoder) {
    let mut data = usn_records(2);
    let cut = data.len() - 10;
    data.truncate(cut);

    let results = decode_all(&decoder, data);
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(DecodeError::Truncated { .. })));
}

#[rstest]
fn test_unsupported_major_version(decoder: UsnJournalDecoder) {
    let mut data = usn_record(0, "a.txt", REASON_CLOSE);
    data[4..6].copy_from_slice(&3u16.to_le_bytes());

    let results = decode_all(&decoder, data);
    assert!(matches!(
        results[..],
        [Err(DecodeError::UnsupportedVersion { major: 3, offset: 0, .. })]
    ));
}

#[rstest]
#[case(8)]
#[case(0x20_0000)]
fn test_record_length_out_of_range(decoder: UsnJournalDecoder, #[case] length: u32) {
    let mut data = usn_records(1);
    let bad_offset = data.len() as u64;
    let mut bad = usn_record(0, "bad", REASON_CLOSE);
    bad[0..4].copy_from_slice(&length.to_le_bytes());
    data.extend(bad);

    let results = decode_all(&decoder, data);
    assert_eq!(results.len(), 2);
    match &results[1] {
        Err(DecodeError::InvalidRecord { offset, .. }) => assert_eq!(*offset, bad_offset),
        other => panic!("expected InvalidRecord, got {:?}", other),
    }
}

#[rstest]
fn test_name_outside_record(decoder: UsnJournalDecoder) {
    let mut data = usn_record(0, "a.txt", REASON_CLOSE);
    data[56..58].copy_from_slice(&200u16.to_le_bytes());

    let results = decode_all(&decoder, data);
    assert!(matches!(results[..], [Err(DecodeError::InvalidRecord { .. })]));
}

#[rstest]
fn test_iteration_stops_after_error(decoder: UsnJournalDecoder) {
    let mut data = usn_record(0, "a.txt", REASON_CLOSE);
    data[4..6].copy_from_slice(&9u16.to_le_bytes());
    data.extend(usn_records(3));

    let mut records = decoder.decode("j", Cursor::new(data));
    assert!(records.next().unwrap().is_err());
    assert!(records.next().is_none());
    assert!(records.next().is_none());
}
