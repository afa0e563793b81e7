//! Canonical Huffman codes for the residue codec (spec §4.4).
//!
//! Code *lengths* come from a standard frequency-weighted binary merge
//! (ties broken by insertion order, which follows ascending symbol order, so
//! the resulting lengths are deterministic). Code *values* are then assigned
//! by the canonical rule the spec mandates: symbols sorted by
//! `(length ascending, symbol ascending)`, codes assigned from 0 and
//! incremented, left-shifted whenever length increases.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::bitio::{BitReader, BitWriter};
use crate::error::{EcompError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalHuffman {
    /// `(symbol, code_length)` pairs, sorted by symbol ascending — this is the
    /// serialized form; code values are derived from it deterministically.
    pub lengths: Vec<(u8, u8)>,
}

struct HeapEntry {
    freq: u64,
    seq: u32,
    length_contribution: Vec<(u8, u8)>, // (symbol, depth-so-far) leaves under this node
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.freq == other.freq && self.seq == other.seq
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.freq, self.seq).cmp(&(other.freq, other.seq))
    }
}

/// Builds code lengths from symbol frequencies. `frequencies` must be
/// non-empty and sorted by ascending symbol (callers iterate a bucket's
/// alphabet in that order).
fn build_lengths(frequencies: &[(u8, u64)]) -> Vec<(u8, u8)> {
    if frequencies.len() == 1 {
        return vec![(frequencies[0].0, 1)];
    }

    let mut heap = BinaryHeap::new();
    for (seq, &(symbol, freq)) in frequencies.iter().enumerate() {
        heap.push(Reverse(HeapEntry {
            freq,
            seq: seq as u32,
            length_contribution: vec![(symbol, 0)],
        }));
    }
    let mut next_seq = frequencies.len() as u32;
    while heap.len() > 1 {
        let Reverse(a) = heap.pop().unwrap();
        let Reverse(b) = heap.pop().unwrap();
        let mut merged: Vec<(u8, u8)> = a
            .length_contribution
            .into_iter()
            .map(|(s, d)| (s, d + 1))
            .chain(b.length_contribution.into_iter().map(|(s, d)| (s, d + 1)))
            .collect();
        merged.sort_unstable_by_key(|&(s, _)| s);
        heap.push(Reverse(HeapEntry {
            freq: a.freq + b.freq,
            seq: next_seq,
            length_contribution: merged,
        }));
        next_seq += 1;
    }
    let Reverse(root) = heap.pop().unwrap();
    let mut lengths = root.length_contribution;
    lengths.sort_unstable_by_key(|&(s, _)| s);
    lengths
}

impl CanonicalHuffman {
    pub fn build(frequencies: &[(u8, u64)]) -> Self {
        Self {
            lengths: build_lengths(frequencies),
        }
    }

    /// Derives `(symbol -> (code, length))` from the stored lengths using the
    /// canonical assignment rule.
    fn assign_codes(&self) -> Vec<(u8, u32, u8)> {
        let mut ordered = self.lengths.clone();
        ordered.sort_unstable_by_key(|&(symbol, length)| (length, symbol));
        let mut code: u32 = 0;
        let mut prev_length = ordered.first().map(|&(_, l)| l).unwrap_or(1);
        let mut out = Vec::with_capacity(ordered.len());
        for (symbol, length) in ordered {
            code <<= length.saturating_sub(prev_length);
            out.push((symbol, code, length));
            code += 1;
            prev_length = length;
        }
        out
    }

    pub fn encode(&self, symbols: &[u8]) -> Vec<u8> {
        let assignments = self.assign_codes();
        let mut table = std::collections::HashMap::new();
        for (symbol, code, length) in assignments {
            table.insert(symbol, (code, length));
        }
        let mut writer = BitWriter::new();
        for &s in symbols {
            let (code, length) = table[&s];
            writer.write_bits(code as u64, length as u32);
        }
        writer.into_bytes()
    }

    pub fn decode(&self, payload: &[u8], symbol_count: usize) -> Result<Vec<u8>> {
        let assignments = self.assign_codes();
        // Decode table keyed by (length, code) -> symbol.
        let mut table = std::collections::HashMap::new();
        let max_length = assignments.iter().map(|&(_, _, l)| l).max().unwrap_or(1);
        for (symbol, code, length) in &assignments {
            table.insert((*length, *code), *symbol);
        }
        let mut reader = BitReader::new(payload);
        let mut out = Vec::with_capacity(symbol_count);
        for _ in 0..symbol_count {
            let mut code: u32 = 0;
            let mut found = None;
            for length in 1..=max_length {
                let bit = reader.read_bits(1)?;
                code = (code << 1) | bit as u32;
                if let Some(&symbol) = table.get(&(length, code)) {
                    found = Some(symbol);
                    break;
                }
            }
            out.push(
                found.ok_or_else(|| EcompError::format("invalid Huffman code in residue stream"))?,
            );
        }
        Ok(out)
    }

    /// Serializes as: 1-byte symbol count, then `(symbol, length)` pairs.
    pub fn write_header(&self, out: &mut Vec<u8>) {
        out.push(self.lengths.len() as u8);
        for &(symbol, length) in &self.lengths {
            out.push(symbol);
            out.push(length);
        }
    }

    pub fn read_header(buf: &[u8], pos: &mut usize) -> Result<Self> {
        let count = *buf
            .get(*pos)
            .ok_or_else(|| EcompError::format("truncated Huffman header"))? as usize;
        *pos += 1;
        let mut lengths = Vec::with_capacity(count);
        for _ in 0..count {
            let symbol = *buf
                .get(*pos)
                .ok_or_else(|| EcompError::format("truncated Huffman header"))?;
            let length = *buf
                .get(*pos + 1)
                .ok_or_else(|| EcompError::format("truncated Huffman header"))?;
            lengths.push((symbol, length));
            *pos += 2;
        }
        Ok(Self { lengths })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_skewed_frequencies() {
        let freqs = [(b'A', 10u64), (b'C', 1), (b'G', 1), (b'T', 2)];
        let huffman = CanonicalHuffman::build(&freqs);
        let symbols = [b'A', b'A', b'T', b'C', b'A', b'G'];
        let encoded = huffman.encode(&symbols);
        let decoded = huffman.decode(&encoded, symbols.len()).unwrap();
        assert_eq!(decoded, symbols);
    }

    #[test]
    fn single_symbol_bucket_uses_one_bit_code() {
        let freqs = [(b'A', 5u64)];
        let huffman = CanonicalHuffman::build(&freqs);
        assert_eq!(huffman.lengths, vec![(b'A', 1)]);
        let encoded = huffman.encode(&[b'A', b'A', b'A']);
        let decoded = huffman.decode(&encoded, 3).unwrap();
        assert_eq!(decoded, vec![b'A', b'A', b'A']);
    }

    #[test]
    fn canonical_codes_sort_by_length_then_symbol() {
        let freqs = [(b'A', 1u64), (b'C', 1), (b'G', 2), (b'T', 4)];
        let huffman = CanonicalHuffman::build(&freqs);
        let assignments = huffman.assign_codes();
        let mut sorted = assignments.clone();
        sorted.sort_by_key(|&(symbol, _, length)| (length, symbol));
        assert_eq!(
            assignments.iter().map(|a| a.0).collect::<Vec<_>>(),
            sorted.iter().map(|a| a.0).collect::<Vec<_>>()
        );
    }

    #[test]
    fn header_round_trips() {
        let huffman = CanonicalHuffman::build(&[(b'A', 3u64), (b'C', 1)]);
        let mut buf = Vec::new();
        huffman.write_header(&mut buf);
        let mut pos = 0;
        let parsed = CanonicalHuffman::read_header(&buf, &mut pos).unwrap();
        assert_eq!(parsed, huffman);
        assert_eq!(pos, buf.len());
    }
}
