//! Archive Container (spec §4.10/§6): framed binary file with magic,
//! version, payload length, and embedded or sidecar metadata.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{EcompError, Result};
use crate::metadata::Metadata;

const MAGIC: &[u8; 4] = b"ECMP";
const MAJOR: u8 = 1;
const MINOR: u8 = 0;
const PATCH: u8 = 0;
const HEADER_SIZE: usize = 19;
const LEGACY_HEADER_SIZE: usize = 16;
const METADATA_COMPRESSED_MAGIC: &[u8; 4] = b"ECMZ";
const METADATA_CODEC_VERSION: u8 = 1;

/// Serializes the archive: header, payload, and metadata blob (compressed
/// only when doing so is strictly smaller than the canonical JSON).
pub fn write_archive(payload: &[u8], metadata: &Metadata) -> Result<Vec<u8>> {
    let json = metadata.to_canonical_json()?;

    let mut compressed = Vec::new();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(9));
    encoder
        .write_all(&json)
        .and_then(|_| {
            compressed = encoder.finish()?;
            Ok(())
        })
        .map_err(EcompError::Io)?;

    let compressed_blob_len = METADATA_COMPRESSED_MAGIC.len() + 1 + compressed.len();
    let metadata_blob = if compressed_blob_len < json.len() {
        let mut blob = Vec::with_capacity(compressed_blob_len);
        blob.extend_from_slice(METADATA_COMPRESSED_MAGIC);
        blob.push(METADATA_CODEC_VERSION);
        blob.extend_from_slice(&compressed);
        blob
    } else {
        json
    };

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len() + metadata_blob.len());
    out.extend_from_slice(MAGIC);
    out.push(MAJOR);
    out.push(MINOR);
    out.push(PATCH);
    out.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    out.extend_from_slice(&(metadata_blob.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&metadata_blob);
    Ok(out)
}

pub struct ReadArchive {
    pub payload: Vec<u8>,
    pub metadata: Metadata,
    pub version: (u8, u8, u8),
}

fn decode_metadata_blob(blob: &[u8]) -> Result<Metadata> {
    if blob.len() >= 5 && &blob[0..4] == METADATA_COMPRESSED_MAGIC {
        let codec_version = blob[4];
        if codec_version != METADATA_CODEC_VERSION {
            return Err(EcompError::format(format!(
                "unsupported metadata codec version {codec_version}"
            )));
        }
        let mut decoder = ZlibDecoder::new(&blob[5..]);
        let mut json = Vec::new();
        decoder
            .read_to_end(&mut json)
            .map_err(|e| EcompError::format(format!("metadata decompression failed: {e}")))?;
        Metadata::from_json(&json)
    } else {
        Metadata::from_json(blob)
    }
}

/// Parses an in-memory archive. State machine: `SEEK_HEADER -> VALIDATE_MAGIC
/// -> READ_PAYLOAD -> READ_METADATA -> DONE`; any failure is fatal.
pub fn read_archive_bytes(bytes: &[u8]) -> Result<ReadArchive> {
    if bytes.len() < 4 || &bytes[0..4] != MAGIC {
        return Err(EcompError::format("bad archive magic"));
    }
    if bytes.len() >= HEADER_SIZE {
        let major = bytes[4];
        let minor = bytes[5];
        let patch = bytes[6];
        let payload_len = u64::from_be_bytes(bytes[7..15].try_into().unwrap()) as usize;
        let metadata_len = u32::from_be_bytes(bytes[15..19].try_into().unwrap()) as usize;
        let payload_start = HEADER_SIZE;
        let payload_end = payload_start + payload_len;
        let metadata_end = payload_end + metadata_len;
        if bytes.len() >= metadata_end {
            let payload = bytes[payload_start..payload_end].to_vec();
            let metadata = decode_metadata_blob(&bytes[payload_end..metadata_end])?;
            return Ok(ReadArchive {
                payload,
                metadata,
                version: (major, minor, patch),
            });
        }
    }
    Err(EcompError::format("truncated archive: declared lengths exceed file size"))
}

/// Legacy 16-byte header (magic + 3 version bytes + 4-byte payload length),
/// with metadata read from a sibling `<name>.json` file.
fn read_legacy_archive(bytes: &[u8], sidecar_path: &Path) -> Result<ReadArchive> {
    let major = bytes[4];
    let minor = bytes[5];
    let patch = bytes[6];
    let payload_len = u32::from_be_bytes(bytes[7..11].try_into().unwrap()) as usize;
    let payload = bytes
        .get(LEGACY_HEADER_SIZE - 5..LEGACY_HEADER_SIZE - 5 + payload_len)
        .ok_or_else(|| EcompError::format("truncated legacy archive payload"))?
        .to_vec();
    let json = fs::read(sidecar_path).map_err(EcompError::Io)?;
    let metadata = Metadata::from_json(&json)?;
    Ok(ReadArchive {
        payload,
        metadata,
        version: (major, minor, patch),
    })
}

pub fn write_archive_file(path: &Path, payload: &[u8], metadata: &Metadata) -> Result<()> {
    let bytes = write_archive(payload, metadata)?;
    fs::write(path, bytes).map_err(EcompError::Io)
}

pub fn read_archive_file(path: &Path) -> Result<ReadArchive> {
    let bytes = fs::read(path).map_err(EcompError::Io)?;
    if bytes.len() >= HEADER_SIZE {
        if let Ok(archive) = read_archive_bytes(&bytes) {
            return Ok(archive);
        }
    }
    if bytes.len() >= LEGACY_HEADER_SIZE && &bytes[0..4] == MAGIC {
        let sidecar = path.with_extension("json");
        if sidecar.exists() {
            return read_legacy_archive(&bytes, &sidecar);
        }
    }
    Err(EcompError::format(
        "not a recognized ecomp archive (bad magic, truncated, or missing legacy sidecar)",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample_metadata() -> Metadata {
        Metadata {
            format_version: "1.0.0".to_string(),
            codec: "ecomp".to_string(),
            row_count: 2,
            column_count: 4,
            alphabet: "-ACGT".to_string(),
            source_format: "fasta".to_string(),
            checksum_sha256: "a".repeat(64),
            block_count: 1,
            max_run_length: 4,
            deviation_column_count: 0,
            bitmask_byte_width: 1,
            bits_per_symbol: 3,
            payload_encoding: "raw".to_string(),
            raw_payload_size: 10,
            encoded_payload_size: 10,
            ordering_strategy: "baseline".to_string(),
            fallback: None,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn round_trips_header_and_metadata() {
        let payload = b"hello ecomp payload".to_vec();
        let metadata = sample_metadata();
        let archive = write_archive(&payload, &metadata).unwrap();
        assert_eq!(&archive[0..4], MAGIC);
        let parsed = read_archive_bytes(&archive).unwrap();
        assert_eq!(parsed.payload, payload);
        assert_eq!(parsed.metadata, metadata);
        assert_eq!(parsed.version, (MAJOR, MINOR, PATCH));
    }

    #[test]
    fn rejects_bad_magic() {
        let err = read_archive_bytes(b"NOPE0000000000000000").unwrap_err();
        assert!(matches!(err, EcompError::FormatError(_)));
    }

    #[test]
    fn rejects_truncated_archive() {
        let payload = b"hello".to_vec();
        let metadata = sample_metadata();
        let mut archive = write_archive(&payload, &metadata).unwrap();
        archive.truncate(archive.len() - 5);
        assert!(read_archive_bytes(&archive).is_err());
    }
}
