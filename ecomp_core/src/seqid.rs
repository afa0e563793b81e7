//! Sequence-ID Block (spec §4.7): row identifiers with optional general-purpose
//! compression, prefixed `ECID`.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{EcompError, Result};
use crate::varint::{read_varint, write_varint};

const MAGIC: &[u8; 4] = b"ECID";
const VERSION: u8 = 2;

const MODE_PLAIN: u8 = 0;
const MODE_ZSTD: u8 = 1;
const MODE_ZLIB: u8 = 2;

fn encode_plain(ids: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    for id in ids {
        write_varint(&mut out, id.len() as u64);
        out.extend_from_slice(id.as_bytes());
    }
    out
}

/// Consumes varint-length-prefixed identifiers until `buf` is exhausted.
fn decode_plain(buf: &[u8]) -> Result<Vec<String>> {
    let mut pos = 0;
    let mut ids = Vec::new();
    while pos < buf.len() {
        let len = read_varint(buf, &mut pos)? as usize;
        let bytes = buf
            .get(pos..pos + len)
            .ok_or_else(|| EcompError::format("truncated sequence identifier"))?;
        ids.push(
            String::from_utf8(bytes.to_vec())
                .map_err(|_| EcompError::format("sequence identifier is not valid UTF-8"))?,
        );
        pos += len;
    }
    Ok(ids)
}

/// Writes the `ECID` block: version 2, picking the smallest of plain/zstd/zlib
/// that beats plain by at least 2 bytes (plain itself is always eligible).
pub fn encode_seqid_block(ids: &[String]) -> Vec<u8> {
    let plain = encode_plain(ids);

    let zstd_compressed = zstd::bulk::compress(&plain, 3).ok();
    let zlib_compressed = {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(9));
        encoder
            .write_all(&plain)
            .and_then(|_| encoder.finish())
            .ok()
    };

    let mut best_mode = MODE_PLAIN;
    let mut best_len = plain.len();
    if let Some(candidate) = &zstd_compressed {
        if plain.len() >= candidate.len() + 2 && candidate.len() < best_len {
            best_mode = MODE_ZSTD;
            best_len = candidate.len();
        }
    }
    if let Some(candidate) = &zlib_compressed {
        if plain.len() >= candidate.len() + 2 && candidate.len() < best_len {
            best_mode = MODE_ZLIB;
            best_len = candidate.len();
        }
    }
    let best_payload = match best_mode {
        MODE_ZSTD => zstd_compressed.unwrap(),
        MODE_ZLIB => zlib_compressed.unwrap(),
        _ => plain,
    };

    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    write_varint(&mut out, (best_payload.len() + 1) as u64);
    out.push(best_mode);
    out.extend_from_slice(&best_payload);
    out
}

/// Decodes an `ECID` block starting at `*pos`, advancing `*pos` past it.
/// Accepts version 1 (no mode byte, always plain) for backward compatibility.
pub fn decode_seqid_block(buf: &[u8], pos: &mut usize) -> Result<Vec<String>> {
    let magic = buf
        .get(*pos..*pos + 4)
        .ok_or_else(|| EcompError::format("truncated sequence-ID block magic"))?;
    if magic != MAGIC {
        return Err(EcompError::format("bad sequence-ID block magic"));
    }
    *pos += 4;
    let version = *buf
        .get(*pos)
        .ok_or_else(|| EcompError::format("truncated sequence-ID block version"))?;
    *pos += 1;

    match version {
        1 => {
            let len = read_varint(buf, pos)? as usize;
            let payload = buf
                .get(*pos..*pos + len)
                .ok_or_else(|| EcompError::format("truncated sequence-ID payload"))?;
            *pos += len;
            decode_plain(payload)
        }
        2 => {
            let block_len = read_varint(buf, pos)? as usize;
            let block = buf
                .get(*pos..*pos + block_len)
                .ok_or_else(|| EcompError::format("truncated sequence-ID block"))?;
            *pos += block_len;
            let (&mode, payload) = block
                .split_first()
                .ok_or_else(|| EcompError::format("truncated sequence-ID mode byte"))?;
            let plain = match mode {
                MODE_PLAIN => payload.to_vec(),
                MODE_ZSTD => zstd::decode_all(payload)
                    .map_err(|e| EcompError::format(format!("zstd decode failed: {e}")))?,
                MODE_ZLIB => {
                    let mut decoder = ZlibDecoder::new(payload);
                    let mut out = Vec::new();
                    decoder
                        .read_to_end(&mut out)
                        .map_err(|e| EcompError::format(format!("zlib decode failed: {e}")))?;
                    out
                }
                other => return Err(EcompError::format(format!("unknown sequence-ID mode {other}"))),
            };
            decode_plain(&plain)
        }
        other => Err(EcompError::format(format!(
            "unsupported sequence-ID block version {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_small_id_list() {
        let ids = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let block = encode_seqid_block(&ids);
        let mut pos = 0;
        let decoded = decode_seqid_block(&block, &mut pos).unwrap();
        assert_eq!(decoded, ids);
        assert_eq!(pos, block.len());
    }

    #[test]
    fn version_one_legacy_plain_decode() {
        let ids = vec!["s1".to_string(), "s2".to_string()];
        let plain = encode_plain(&ids);
        let mut legacy = Vec::new();
        legacy.extend_from_slice(MAGIC);
        legacy.push(1u8);
        write_varint(&mut legacy, plain.len() as u64);
        legacy.extend_from_slice(&plain);

        let mut pos = 0;
        let decoded = decode_seqid_block(&legacy, &mut pos).unwrap();
        assert_eq!(decoded, ids);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut pos = 0;
        let err = decode_seqid_block(b"XXXX\x02", &mut pos).unwrap_err();
        assert!(matches!(err, EcompError::FormatError(_)));
    }
}
