//! Block Stream Codec (spec §4.5): dictionary-coded serialization of the
//! run-length block sequence.

use std::collections::HashMap;

use crate::bitmask::{decode_bitmask, encode_bitmask, BitmaskMode};
use crate::error::{EcompError, Result};
use crate::residue::{build_residue_models, decode_block_residues, encode_block_residues, ResidueModelHeader};
use crate::rle::RunLengthBlock;
use crate::varint::{read_varint, write_varint};

/// The serialized tail shared by dictionary entries and literal blocks:
/// consensus, bitmask mode+payload, deviation count, residue payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryBody {
    consensus: u8,
    bitmask_mode: u8,
    mask_payload: Vec<u8>,
    deviation_count: u32,
    residues_payload: Vec<u8>,
}

impl EntryBody {
    fn cost(&self) -> u64 {
        1 // consensus
            + 1 // bitmask_mode
            + varint_len(self.deviation_count as u64)
            + varint_len(self.mask_payload.len() as u64)
            + self.mask_payload.len() as u64
            + 2 // residues_length (u16 be)
            + self.residues_payload.len() as u64
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.push(self.consensus);
        out.push(self.bitmask_mode);
        write_varint(out, self.deviation_count as u64);
        write_varint(out, self.mask_payload.len() as u64);
        out.extend_from_slice(&self.mask_payload);
        out.extend_from_slice(&(self.residues_payload.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.residues_payload);
    }

    fn read(buf: &[u8], pos: &mut usize) -> Result<Self> {
        let consensus = *buf
            .get(*pos)
            .ok_or_else(|| EcompError::format("truncated block entry"))?;
        let bitmask_mode = *buf
            .get(*pos + 1)
            .ok_or_else(|| EcompError::format("truncated block entry"))?;
        *pos += 2;
        let deviation_count = read_varint(buf, pos)? as u32;
        let mask_len = read_varint(buf, pos)? as usize;
        let mask_payload = buf
            .get(*pos..*pos + mask_len)
            .ok_or_else(|| EcompError::format("truncated bitmask payload"))?
            .to_vec();
        *pos += mask_len;
        let res_len_bytes = buf
            .get(*pos..*pos + 2)
            .ok_or_else(|| EcompError::format("truncated residues length"))?;
        let residues_len = u16::from_be_bytes([res_len_bytes[0], res_len_bytes[1]]) as usize;
        *pos += 2;
        let residues_payload = buf
            .get(*pos..*pos + residues_len)
            .ok_or_else(|| EcompError::format("truncated residues payload"))?
            .to_vec();
        *pos += residues_len;
        Ok(Self {
            consensus,
            bitmask_mode,
            mask_payload,
            deviation_count,
            residues_payload,
        })
    }
}

fn varint_len(mut value: u64) -> u64 {
    let mut len = 1;
    value >>= 7;
    while value != 0 {
        len += 1;
        value >>= 7;
    }
    len
}

fn build_entry_body(
    header: &ResidueModelHeader,
    alphabet: &[u8],
    bits_per_symbol: u32,
    block: &RunLengthBlock,
) -> EntryBody {
    let (mode, mask_payload) = encode_bitmask(&block.bitmask, alphabet_row_count(block));
    let residues_payload =
        encode_block_residues(header, alphabet, bits_per_symbol, block.consensus, &block.residues);
    EntryBody {
        consensus: block.consensus,
        bitmask_mode: mode as u8,
        mask_payload,
        deviation_count: block.deviation_count,
        residues_payload,
    }
}

/// Row count is implicit in the bitmask's byte length (`ceil(row_count/8)`);
/// the bitmask codec's sparse mode needs it to enumerate set bits.
fn alphabet_row_count(block: &RunLengthBlock) -> usize {
    block.bitmask.len() * 8
}

pub struct BlockStream {
    pub residue_header: ResidueModelHeader,
    pub bytes: Vec<u8>,
}

/// Encodes the residue model header, dictionary, and block entries.
pub fn encode_block_stream(
    blocks: &[RunLengthBlock],
    alphabet: &[u8],
    bits_per_symbol: u32,
) -> BlockStream {
    let residue_header = build_residue_models(blocks, alphabet, bits_per_symbol);

    let bodies: Vec<EntryBody> = blocks
        .iter()
        .map(|b| build_entry_body(&residue_header, alphabet, bits_per_symbol, b))
        .collect();

    // Frequency count, preserving first-occurrence order for deterministic
    // tie-breaking within the stable sort below.
    let mut freq: HashMap<EntryBody, (u64, usize)> = HashMap::new();
    for (order, body) in bodies.iter().enumerate() {
        let entry = freq.entry(body.clone()).or_insert((0, order));
        entry.0 += 1;
    }

    const REFERENCE_COST: u64 = 3; // marker + dict_id + run_length

    let mut candidates: Vec<(EntryBody, i64, usize)> = freq
        .into_iter()
        .map(|(body, (count, first_seen))| {
            let entry_cost = body.cost();
            let literal_cost = 1 + 1 + entry_cost; // marker + run_length + body
            let saved = count as i64 * literal_cost as i64
                - (entry_cost as i64 + count as i64 * REFERENCE_COST as i64);
            (body, saved, first_seen)
        })
        .filter(|&(_, saved, _)| saved > 0)
        .collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    candidates.truncate(255);

    let mut dict_ids: HashMap<EntryBody, u8> = HashMap::new();
    let mut dict_entries: Vec<EntryBody> = Vec::new();
    for (body, _, _) in candidates {
        dict_ids.insert(body.clone(), dict_entries.len() as u8);
        dict_entries.push(body);
    }

    let mut out = Vec::new();
    residue_header.write(&mut out);

    out.push(dict_entries.len() as u8);
    for entry in &dict_entries {
        entry.write(&mut out);
    }

    let mut block_bytes = Vec::new();
    for (block, body) in blocks.iter().zip(bodies.iter()) {
        if let Some(&dict_id) = dict_ids.get(body) {
            block_bytes.push(1u8);
            block_bytes.push(dict_id);
            block_bytes.push(block.run_length);
        } else {
            block_bytes.push(0u8);
            block_bytes.push(block.run_length);
            body.write(&mut block_bytes);
        }
    }
    out.extend_from_slice(&(blocks.len() as u32).to_be_bytes());
    out.extend_from_slice(&block_bytes);

    BlockStream {
        residue_header,
        bytes: out,
    }
}

/// A decoded block: the fields needed to materialize columns, independent of
/// how it was represented on the wire.
pub struct DecodedBlock {
    pub consensus: u8,
    pub bitmask: Vec<u8>,
    pub residues: Vec<u8>,
    pub run_length: u8,
}

pub fn decode_block_stream(
    buf: &[u8],
    alphabet: &[u8],
    bits_per_symbol: u32,
    row_count: usize,
) -> Result<Vec<DecodedBlock>> {
    let mut pos = 0;
    let residue_header = ResidueModelHeader::read(buf, &mut pos)?;

    let dict_count = *buf
        .get(pos)
        .ok_or_else(|| EcompError::format("truncated block stream: missing dict count"))? as usize;
    pos += 1;
    let mut dict_entries = Vec::with_capacity(dict_count);
    for _ in 0..dict_count {
        dict_entries.push(EntryBody::read(buf, &mut pos)?);
    }

    let count_bytes = buf
        .get(pos..pos + 4)
        .ok_or_else(|| EcompError::format("truncated block stream: missing block count"))?;
    let block_count = u32::from_be_bytes([count_bytes[0], count_bytes[1], count_bytes[2], count_bytes[3]]);
    pos += 4;

    let mask_byte_len = row_count.div_ceil(8);
    let mut blocks = Vec::with_capacity(block_count as usize);
    for _ in 0..block_count {
        let marker = *buf
            .get(pos)
            .ok_or_else(|| EcompError::format("truncated block entry marker"))?;
        pos += 1;
        let (body, run_length) = match marker {
            1 => {
                let dict_id = *buf
                    .get(pos)
                    .ok_or_else(|| EcompError::format("truncated dict reference"))? as usize;
                let run_length = *buf
                    .get(pos + 1)
                    .ok_or_else(|| EcompError::format("truncated dict reference"))?;
                pos += 2;
                let body = dict_entries
                    .get(dict_id)
                    .ok_or_else(|| EcompError::format("dictionary reference out of range"))?
                    .clone();
                (body, run_length)
            }
            0 => {
                let run_length = *buf
                    .get(pos)
                    .ok_or_else(|| EcompError::format("truncated literal block"))?;
                pos += 1;
                let body = EntryBody::read(buf, &mut pos)?;
                (body, run_length)
            }
            other => return Err(EcompError::format(format!("unknown block marker {other}"))),
        };

        let bitmask = decode_bitmask(body.bitmask_mode, &body.mask_payload, mask_byte_len)?;
        let residues = decode_block_residues(
            &residue_header,
            alphabet,
            bits_per_symbol,
            body.consensus,
            &body.residues_payload,
            body.deviation_count,
        )?;
        blocks.push(DecodedBlock {
            consensus: body.consensus,
            bitmask,
            residues,
            run_length,
        });
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::AlignmentFrame;
    use crate::consensus::profile_columns;
    use crate::rle::{bits_per_symbol, group_runs};
    use std::collections::BTreeMap;

    fn frame(rows: &[&str]) -> AlignmentFrame {
        let ids = (0..rows.len()).map(|i| format!("s{i}")).collect();
        let rows = rows.iter().map(|r| r.to_string()).collect();
        AlignmentFrame::new(ids, rows, BTreeMap::new()).unwrap()
    }

    #[test]
    fn round_trips_block_sequence() {
        let f = frame(&[
            "AAAAAAAAAA",
            "CAAAAAAAAA",
            "GAAAAAAAAA",
            "AAAAAAAAAA",
            "CAAAAAAAAA",
        ]);
        let profiles = profile_columns(&f);
        let blocks = group_runs(&f, &profiles);
        let bits = bits_per_symbol(f.alphabet().len());
        let stream = encode_block_stream(&blocks, f.alphabet(), bits);
        let decoded = decode_block_stream(&stream.bytes, f.alphabet(), bits, f.row_count()).unwrap();

        assert_eq!(decoded.len(), blocks.len());
        for (original, restored) in blocks.iter().zip(decoded.iter()) {
            assert_eq!(original.consensus, restored.consensus);
            assert_eq!(original.bitmask, restored.bitmask);
            assert_eq!(original.residues, restored.residues);
            assert_eq!(original.run_length, restored.run_length);
        }
    }

    #[test]
    fn repeated_profiles_use_dictionary_references() {
        // Many columns sharing the exact same deviation pattern should compress
        // into dictionary references rather than repeating literal bodies.
        let rows: Vec<String> = vec![
            "A".repeat(50),
            "C".repeat(50),
        ];
        let rows: Vec<&str> = rows.iter().map(|s| s.as_str()).collect();
        let f = frame(&rows);
        let profiles = profile_columns(&f);
        let blocks = group_runs(&f, &profiles);
        // A single uniform block of run_length up to 255; with 50 columns it's one block.
        assert_eq!(blocks.len(), 1);
        let bits = bits_per_symbol(f.alphabet().len());
        let stream = encode_block_stream(&blocks, f.alphabet(), bits);
        let decoded = decode_block_stream(&stream.bytes, f.alphabet(), bits, f.row_count()).unwrap();
        assert_eq!(decoded[0].run_length, blocks[0].run_length);
    }

    #[test]
    fn block_count_prefix_is_four_bytes_big_endian() {
        let f = frame(&["AAAA", "AAAA"]);
        let profiles = profile_columns(&f);
        let blocks = group_runs(&f, &profiles);
        let bits = bits_per_symbol(f.alphabet().len());
        let stream = encode_block_stream(&blocks, f.alphabet(), bits);
        // residue header is 1 byte (zero buckets) + 1 byte dict count (zero entries)
        // then the 4-byte block count prefix.
        assert_eq!(stream.bytes[0], 0); // no residue buckets
        assert_eq!(stream.bytes[1], 0); // no dictionary entries
        let count = u32::from_be_bytes([
            stream.bytes[2],
            stream.bytes[3],
            stream.bytes[4],
            stream.bytes[5],
        ]);
        assert_eq!(count, 1);
    }
}
