//! Outer Pipeline (spec §4.8/§4.9): orchestrates ordering, profiling,
//! grouping, block encoding, the generic-compressor contest, and the gzip
//! fallback; and its inverse.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::alignment::AlignmentFrame;
use crate::block_stream::{decode_block_stream, encode_block_stream};
use crate::config::CompressConfig;
use crate::consensus::profile_columns;
use crate::error::{EcompError, Result};
use crate::metadata::{FallbackDescriptor, Metadata};
use crate::order::optimize_order;
use crate::permutation::{encode_permutation, try_decode_permutation};
use crate::rle::{bits_per_symbol, group_runs};
use crate::seqid::{decode_seqid_block, encode_seqid_block};

const FORMAT_VERSION: &str = "1.0.0";
const CODEC_ECOMP: &str = "ecomp";
const CODEC_FALLBACK_GZIP: &str = "fallback-gzip";

fn sha256_hex(rows: &[String]) -> String {
    let mut hasher = Sha256::new();
    for row in rows {
        hasher.update(row.as_bytes());
    }
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Headerless canonical FASTA: `>id\nseq\n` repeated, in frame row order.
fn frame_to_fasta(frame: &AlignmentFrame) -> Vec<u8> {
    let mut out = Vec::new();
    for (id, row) in frame.ids().iter().zip(frame.rows().iter()) {
        out.push(b'>');
        out.extend_from_slice(id.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(row.as_bytes());
        out.push(b'\n');
    }
    out
}

fn fasta_to_frame(bytes: &[u8], metadata: &Metadata) -> Result<AlignmentFrame> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| EcompError::format("fallback FASTA payload is not valid UTF-8"))?;
    let mut ids = Vec::new();
    let mut rows = Vec::new();
    let mut current_id: Option<String> = None;
    let mut current_seq = String::new();
    for line in text.lines() {
        if let Some(id) = line.strip_prefix('>') {
            if let Some(prev_id) = current_id.take() {
                ids.push(prev_id);
                rows.push(std::mem::take(&mut current_seq));
            }
            current_id = Some(id.to_string());
        } else {
            current_seq.push_str(line);
        }
    }
    if let Some(prev_id) = current_id {
        ids.push(prev_id);
        rows.push(current_seq);
    }
    let mut meta = BTreeMap::new();
    meta.insert(
        "source_format".to_string(),
        crate::alignment::MetadataValue::Text(metadata.source_format.clone()),
    );
    AlignmentFrame::new(ids, rows, meta)
}

/// Builds the structured `ecomp` payload (sequence-ID block + block stream)
/// for a frame already in its final row order.
fn build_structured_payload(frame: &AlignmentFrame) -> (Vec<u8>, u64, u64, u64) {
    let profiles = profile_columns(frame);
    let blocks = group_runs(frame, &profiles);
    let bits = bits_per_symbol(frame.alphabet().len());
    let stream = encode_block_stream(&blocks, frame.alphabet(), bits);

    let max_run_length = blocks.iter().map(|b| b.run_length as u64).max().unwrap_or(0);
    let deviation_columns: u64 = blocks
        .iter()
        .filter(|b| b.deviation_count > 0)
        .map(|b| b.run_length as u64)
        .sum();

    let mut payload = Vec::new();
    payload.extend_from_slice(&encode_seqid_block(frame.ids()));
    payload.extend_from_slice(&stream.bytes);

    (payload, blocks.len() as u64, max_run_length, deviation_columns)
}

/// Compresses `frame` into `(payload_bytes, metadata)` per spec §4.8.
pub fn compress(frame: &AlignmentFrame, config: &CompressConfig) -> Result<(Vec<u8>, Metadata)> {
    let checksum = sha256_hex(frame.rows());

    let ordering = optimize_order(
        frame,
        config.ordering_strategy,
        config.tree_newick.as_deref(),
    );
    let is_identity = ordering.permutation.iter().enumerate().all(|(i, &p)| i == p);
    let reordered = if is_identity {
        frame.clone()
    } else {
        frame.reorder(&ordering.permutation)
    };

    let (structured_payload, block_count, max_run_length, deviation_columns) =
        build_structured_payload(&reordered);

    let mut payload = Vec::new();
    if !is_identity {
        payload.extend_from_slice(&encode_permutation(&ordering.permutation));
    }
    payload.extend_from_slice(&structured_payload);

    let (encoding_tag, encoded_payload) = ecomp_codecs::compress_smallest(&payload);
    let payload_encoding = tag_name(encoding_tag);

    let bits = bits_per_symbol(frame.alphabet().len());
    let row_count = frame.row_count() as u64;

    let mut metadata = Metadata {
        format_version: FORMAT_VERSION.to_string(),
        codec: CODEC_ECOMP.to_string(),
        row_count,
        column_count: frame.column_count() as u64,
        alphabet: String::from_utf8_lossy(frame.alphabet()).into_owned(),
        source_format: source_format_of(frame),
        checksum_sha256: checksum,
        block_count,
        max_run_length,
        deviation_column_count: deviation_columns,
        bitmask_byte_width: (frame.row_count() as u64).div_ceil(8),
        bits_per_symbol: bits as u64,
        payload_encoding: payload_encoding.to_string(),
        raw_payload_size: payload.len() as u64,
        encoded_payload_size: encoded_payload.len() as u64,
        ordering_strategy: ordering.label.clone(),
        fallback: None,
        extra: BTreeMap::new(),
    };

    let mut final_payload = encoded_payload;

    if config.allow_gzip_fallback {
        let fasta = frame_to_fasta(frame);
        let gzip_codec = ecomp_codecs::GzipCodec::default();
        if let Ok(gzipped) = ecomp_codecs::PayloadCodec::compress(&gzip_codec, &fasta) {
            let beats_structured = final_payload.len() >= gzipped.len() + 2;
            let beats_fasta = gzipped.len() < fasta.len();
            if beats_structured && beats_fasta {
                metadata.codec = CODEC_FALLBACK_GZIP.to_string();
                metadata.payload_encoding = "gzip".to_string();
                metadata.ordering_strategy = "baseline".to_string();
                metadata.encoded_payload_size = gzipped.len() as u64;
                metadata.fallback = Some(FallbackDescriptor {
                    kind: "gzip".to_string(),
                    source_format: metadata.source_format.clone(),
                });
                final_payload = gzipped;
            }
        }
    }

    Ok((final_payload, metadata))
}

fn source_format_of(frame: &AlignmentFrame) -> String {
    match frame.metadata().get("source_format") {
        Some(crate::alignment::MetadataValue::Text(s)) => s.clone(),
        _ => "fasta".to_string(),
    }
}

fn tag_name(tag: u8) -> &'static str {
    match tag {
        ecomp_codecs::TAG_RAW => "raw",
        ecomp_codecs::TAG_ZLIB => "zlib",
        ecomp_codecs::TAG_ZSTD => "zstd",
        ecomp_codecs::TAG_XZ => "xz",
        _ => "raw",
    }
}

/// Restores the frame from `(payload_bytes, metadata)` per spec §4.9.
pub fn decompress(
    payload: &[u8],
    metadata: &Metadata,
    verify_checksum: bool,
) -> Result<AlignmentFrame> {
    let frame = if metadata.fallback.as_ref().map(|f| f.kind.as_str()) == Some("gzip") {
        let gzip_codec = ecomp_codecs::GzipCodec::default();
        let fasta = ecomp_codecs::PayloadCodec::decompress(&gzip_codec, payload)
            .map_err(|e| EcompError::format(format!("gzip fallback decode failed: {e}")))?;
        fasta_to_frame(&fasta, metadata)?
    } else {
        let codec = ecomp_codecs::codec_by_tag(encoding_tag(&metadata.payload_encoding)?)
            .map_err(|e| EcompError::format(e.to_string()))?;
        let decoded = ecomp_codecs::PayloadCodec::decompress(&*codec, payload)
            .map_err(|e| EcompError::format(format!("payload decode failed: {e}")))?;

        let mut pos = 0;
        let permutation = try_decode_permutation(&decoded, &mut pos)?;

        let ids = decode_seqid_block(&decoded, &mut pos)?;
        let row_count = ids.len();

        let mut alphabet: Vec<u8> = metadata.alphabet.as_bytes().to_vec();
        alphabet.sort_unstable();
        alphabet.dedup();
        let bits = metadata.bits_per_symbol as u32;

        let decoded_blocks =
            decode_block_stream(&decoded[pos..], &alphabet, bits, row_count)?;

        let column_count = decoded_blocks
            .iter()
            .map(|b| b.run_length as usize)
            .sum();
        let mut rows = vec![Vec::with_capacity(column_count); row_count];
        for block in &decoded_blocks {
            for _ in 0..block.run_length {
                for row in 0..row_count {
                    rows[row].push(block.consensus);
                }
            }
            let mut deviation_idx = 0usize;
            for row in 0..row_count {
                if block.bitmask[row / 8] & (0x80 >> (row % 8)) != 0 {
                    let residue = block.residues[deviation_idx];
                    let start_col = rows[row].len() - block.run_length as usize;
                    // Grouping only coalesces columns sharing the exact same deviation
                    // set, so one stored residue applies to every column in the run.
                    for col_offset in 0..block.run_length as usize {
                        rows[row][start_col + col_offset] = residue;
                    }
                    deviation_idx += 1;
                }
            }
        }

        let reordered_rows: Vec<String> = rows
            .into_iter()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .collect();

        let mut meta = BTreeMap::new();
        meta.insert(
            "source_format".to_string(),
            crate::alignment::MetadataValue::Text(metadata.source_format.clone()),
        );
        let reordered = AlignmentFrame::new(ids, reordered_rows, meta)?;

        match permutation {
            Some(perm) => invert_and_apply(&reordered, &perm)?,
            None => reordered,
        }
    };

    if verify_checksum {
        let actual = sha256_hex(frame.rows());
        if actual != metadata.checksum_sha256 {
            return Err(EcompError::integrity(format!(
                "checksum mismatch: expected {}, computed {actual}",
                metadata.checksum_sha256
            )));
        }
    }

    Ok(frame)
}

fn encoding_tag(name: &str) -> Result<u8> {
    match name {
        "raw" => Ok(ecomp_codecs::TAG_RAW),
        "zlib" => Ok(ecomp_codecs::TAG_ZLIB),
        "zstd" => Ok(ecomp_codecs::TAG_ZSTD),
        "xz" => Ok(ecomp_codecs::TAG_XZ),
        other => Err(EcompError::format(format!("unknown payload encoding {other}"))),
    }
}

/// `reordered` holds rows in the order `permutation[i] = original_index`; to
/// restore the original order, place each reordered row back at its original
/// index.
fn invert_and_apply(reordered: &AlignmentFrame, permutation: &[usize]) -> Result<AlignmentFrame> {
    let row_count = reordered.row_count();
    let mut ids = vec![String::new(); row_count];
    let mut rows = vec![String::new(); row_count];
    for (new_index, &original_index) in permutation.iter().enumerate() {
        ids[original_index] = reordered.ids()[new_index].clone();
        rows[original_index] = reordered.rows()[new_index].clone();
    }
    AlignmentFrame::new(ids, rows, reordered.metadata().clone())
}
