//! Crate-level round-trip coverage: frame -> compress -> archive bytes ->
//! read back -> decompress, exercising the full outer pipeline end to end.

use std::collections::BTreeMap;

use ecomp_core::{compress, decompress, read_archive_bytes, write_archive, AlignmentFrame, CompressConfig};

fn ids(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| s.to_string()).collect()
}

fn rows(seqs: &[&str]) -> Vec<String> {
    seqs.iter().map(|s| s.to_string()).collect()
}

/// Scenario 1 from the testable-properties section: one deviation column.
#[test]
fn archive_round_trip_scenario_one() {
    let frame = AlignmentFrame::new(
        ids(&["seq1", "seq2", "seq3", "seq4"]),
        rows(&["ACGTACGT", "ACGTACGT", "ACGTTCGT", "ACGTACGT"]),
        BTreeMap::new(),
    )
    .unwrap();

    let config = CompressConfig::default();
    let (payload, metadata) = compress(&frame, &config).unwrap();
    let archive_bytes = write_archive(&payload, &metadata).unwrap();

    let parsed = read_archive_bytes(&archive_bytes).unwrap();
    assert_eq!(parsed.metadata, metadata);
    assert_eq!(parsed.payload, payload);

    let restored = decompress(&parsed.payload, &parsed.metadata, true).unwrap();
    assert_eq!(restored.ids(), frame.ids());
    assert_eq!(restored.rows(), frame.rows());
}

/// Scenario 2: every row identical, single consensus block, no deviations.
#[test]
fn archive_round_trip_uniform_rows() {
    let frame = AlignmentFrame::new(
        ids(&["a", "b", "c"]),
        rows(&["AAAA", "AAAA", "AAAA"]),
        BTreeMap::new(),
    )
    .unwrap();

    let (payload, metadata) = compress(&frame, &CompressConfig::default()).unwrap();
    assert_eq!(metadata.deviation_column_count, 0);

    let archive_bytes = write_archive(&payload, &metadata).unwrap();
    let parsed = read_archive_bytes(&archive_bytes).unwrap();
    let restored = decompress(&parsed.payload, &parsed.metadata, true).unwrap();
    assert_eq!(restored.rows(), frame.rows());
}

/// Tampering with the archive payload after writing must be caught by the
/// checksum verification on decompress, not silently accepted.
#[test]
fn tampered_archive_payload_fails_checksum() {
    let frame = AlignmentFrame::new(
        ids(&["a", "b", "c", "d"]),
        rows(&["ACGTACGTAC", "ACGTACGTAC", "ACGTTCGTAC", "ACGAACGTAC"]),
        BTreeMap::new(),
    )
    .unwrap();

    let (payload, metadata) = compress(&frame, &CompressConfig::default()).unwrap();
    let mut archive_bytes = write_archive(&payload, &metadata).unwrap();

    // Flip a byte inside the payload region (right after the 19-byte header).
    let victim = 19 + payload.len() / 2;
    archive_bytes[victim] ^= 0xFF;

    let parsed = read_archive_bytes(&archive_bytes).unwrap();
    let result = decompress(&parsed.payload, &parsed.metadata, true);
    assert!(result.is_err(), "tampered payload should fail checksum verification");
}

/// Reordering via the sequence-order optimizer must not change the set of
/// rows recovered, only their on-disk grouping.
#[test]
fn reordered_rows_recover_in_original_order() {
    let frame = AlignmentFrame::new(
        ids(&["c", "a", "d", "b"]),
        rows(&["CCCC", "AAAA", "GGGG", "TTTT"]),
        BTreeMap::new(),
    )
    .unwrap();

    let (payload, metadata) = compress(&frame, &CompressConfig::default()).unwrap();
    let restored = decompress(&payload, &metadata, true).unwrap();
    assert_eq!(restored.ids(), frame.ids());
    assert_eq!(restored.rows(), frame.rows());
}

/// Legacy metadata-codec-version mismatch in a compressed metadata blob is a
/// format error, not a panic.
#[test]
fn unsupported_metadata_codec_version_is_format_error() {
    let frame = AlignmentFrame::new(ids(&["a", "b"]), rows(&["ACGT", "ACGT"]), BTreeMap::new()).unwrap();
    let (payload, metadata) = compress(&frame, &CompressConfig::default()).unwrap();
    let mut archive_bytes = write_archive(&payload, &metadata).unwrap();

    if let Some(pos) = archive_bytes
        .windows(4)
        .position(|w| w == b"ECMZ")
    {
        archive_bytes[pos + 4] = 0xFF; // corrupt the codec-version byte
        let err = read_archive_bytes(&archive_bytes).unwrap_err();
        assert!(err.to_string().contains("metadata codec version"));
    }
}
