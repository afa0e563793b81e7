//! Bitmask Codec (spec §4.3): three competing storage modes for a block's
//! per-row deviation bitmask, smallest wins.

use crate::error::{EcompError, Result};
use crate::varint::{read_varint, write_varint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmaskMode {
    Raw = 0,
    Sparse = 1,
    Rle = 2,
}

impl BitmaskMode {
    fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(BitmaskMode::Raw),
            1 => Ok(BitmaskMode::Sparse),
            2 => Ok(BitmaskMode::Rle),
            other => Err(EcompError::format(format!("unknown bitmask mode {other}"))),
        }
    }
}

/// Trailing zero bytes stripped; length-prefixed with a varint.
fn encode_raw(mask: &[u8]) -> Vec<u8> {
    let mut end = mask.len();
    while end > 0 && mask[end - 1] == 0 {
        end -= 1;
    }
    let mut out = Vec::new();
    write_varint(&mut out, end as u64);
    out.extend_from_slice(&mask[..end]);
    out
}

fn decode_raw(payload: &[u8], full_len: usize) -> Result<Vec<u8>> {
    let mut pos = 0;
    let len = read_varint(payload, &mut pos)? as usize;
    let body = payload
        .get(pos..pos + len)
        .ok_or_else(|| EcompError::format("raw bitmask payload truncated"))?;
    let mut mask = vec![0u8; full_len];
    mask[..body.len()].copy_from_slice(body);
    Ok(mask)
}

/// Ascending set-bit indices as varint deltas from the previous index (first
/// delta is from -1), length-prefixed by the number of set bits.
fn encode_sparse(mask: &[u8], row_count: usize) -> Vec<u8> {
    let mut indices = Vec::new();
    for row in 0..row_count {
        if mask[row / 8] & (0x80 >> (row % 8)) != 0 {
            indices.push(row as u64);
        }
    }
    let mut out = Vec::new();
    write_varint(&mut out, indices.len() as u64);
    let mut prev: i64 = -1;
    for idx in indices {
        write_varint(&mut out, (idx as i64 - prev) as u64);
        prev = idx as i64;
    }
    out
}

fn decode_sparse(payload: &[u8], full_len: usize) -> Result<Vec<u8>> {
    let mut pos = 0;
    let count = read_varint(payload, &mut pos)?;
    let mut mask = vec![0u8; full_len];
    let mut prev: i64 = -1;
    for _ in 0..count {
        let delta = read_varint(payload, &mut pos)? as i64;
        let idx = prev + delta;
        mask[idx as usize / 8] |= 0x80 >> (idx as usize % 8);
        prev = idx;
    }
    Ok(mask)
}

/// Alternating run lengths of 0-bits and 1-bits across the mask, each a
/// varint; the first run (possibly zero-length) is always a run of 0-bits.
/// Operating at bit granularity (not byte granularity) is what makes this
/// mode correct for any bitmask, not just ones whose set bytes happen to be
/// entirely `0x00` or `0xff`.
fn encode_rle(mask: &[u8]) -> Vec<u8> {
    let total_bits = mask.len() * 8;
    let mut out = Vec::new();
    let mut runs = Vec::new();
    let mut current_bit = 0u8;
    let mut run_len: u64 = 0;
    for i in 0..total_bits {
        let bit = (mask[i / 8] >> (7 - (i % 8))) & 1;
        if bit == current_bit {
            run_len += 1;
        } else {
            runs.push(run_len);
            current_bit = bit;
            run_len = 1;
        }
    }
    runs.push(run_len);
    write_varint(&mut out, runs.len() as u64);
    for run in runs {
        write_varint(&mut out, run);
    }
    out
}

fn decode_rle(payload: &[u8], full_len: usize) -> Result<Vec<u8>> {
    let mut pos = 0;
    let run_count = read_varint(payload, &mut pos)?;
    let mut mask = vec![0u8; full_len];
    let total_bits = full_len * 8;
    let mut current_bit = 0u8;
    let mut bit_idx: usize = 0;
    for _ in 0..run_count {
        let run = read_varint(payload, &mut pos)?;
        if current_bit == 1 {
            for _ in 0..run {
                if bit_idx < total_bits {
                    mask[bit_idx / 8] |= 0x80 >> (bit_idx % 8);
                }
                bit_idx += 1;
            }
        } else {
            bit_idx += run as usize;
        }
        current_bit = 1 - current_bit;
    }
    Ok(mask)
}

/// Tries all three modes, returns `(mode, payload)` for the smallest.
pub fn encode_bitmask(mask: &[u8], row_count: usize) -> (BitmaskMode, Vec<u8>) {
    let candidates = [
        (BitmaskMode::Raw, encode_raw(mask)),
        (BitmaskMode::Sparse, encode_sparse(mask, row_count)),
        (BitmaskMode::Rle, encode_rle(mask)),
    ];
    candidates
        .into_iter()
        .min_by_key(|(_, payload)| payload.len())
        .expect("three candidates always present")
}

pub fn decode_bitmask(mode_tag: u8, payload: &[u8], full_len: usize) -> Result<Vec<u8>> {
    match BitmaskMode::from_tag(mode_tag)? {
        BitmaskMode::Raw => decode_raw(payload, full_len),
        BitmaskMode::Sparse => decode_sparse(payload, full_len),
        BitmaskMode::Rle => decode_rle(payload, full_len),
    }
}
