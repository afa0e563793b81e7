//! Residue Codec (spec §4.4): per-consensus-bucket fixed-width vs canonical
//! Huffman contest for deviation residues.

use std::collections::BTreeMap;

use crate::bitio::{BitReader, BitWriter};
use crate::error::{EcompError, Result};
use crate::huffman::CanonicalHuffman;
use crate::rle::RunLengthBlock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResidueModel {
    Fixed,
    Huffman(CanonicalHuffman),
}

/// Per-consensus-character models, keyed by consensus byte. Buckets with no
/// deviations across any block are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResidueModelHeader {
    pub models: BTreeMap<u8, ResidueModel>,
}

fn symbol_index(alphabet: &[u8], residue: u8) -> u8 {
    alphabet
        .binary_search(&residue)
        .expect("residue must be in the derived alphabet") as u8
}

fn bits_for_block(bits_per_symbol: u32, deviation_count: u32) -> u64 {
    (bits_per_symbol as u64) * (deviation_count as u64)
}

fn huffman_bits_for_block(huffman: &CanonicalHuffman, indices: &[u8]) -> u64 {
    let lengths: BTreeMap<u8, u8> = huffman.lengths.iter().copied().collect();
    indices
        .iter()
        .map(|&s| lengths.get(&s).copied().unwrap_or(1) as u64)
        .sum()
}

/// Builds the per-consensus-bucket models, comparing total byte cost (each
/// block's residue payload is byte-aligned) between fixed-width and Huffman.
pub fn build_residue_models(
    blocks: &[RunLengthBlock],
    alphabet: &[u8],
    bits_per_symbol: u32,
) -> ResidueModelHeader {
    let mut by_consensus: BTreeMap<u8, Vec<Vec<u8>>> = BTreeMap::new();
    for block in blocks {
        if block.deviation_count == 0 {
            continue;
        }
        let indices: Vec<u8> = block
            .residues
            .iter()
            .map(|&r| symbol_index(alphabet, r))
            .collect();
        by_consensus.entry(block.consensus).or_default().push(indices);
    }

    let mut models = BTreeMap::new();
    for (consensus, block_indices) in by_consensus {
        let mut freq = BTreeMap::new();
        for indices in &block_indices {
            for &s in indices {
                *freq.entry(s).or_insert(0u64) += 1;
            }
        }
        let freq_pairs: Vec<(u8, u64)> = freq.into_iter().collect();
        let huffman = CanonicalHuffman::build(&freq_pairs);

        let fixed_bytes: u64 = block_indices
            .iter()
            .map(|indices| bits_for_block(bits_per_symbol, indices.len() as u32).div_ceil(8))
            .sum();
        let huffman_bytes: u64 = block_indices
            .iter()
            .map(|indices| huffman_bits_for_block(&huffman, indices).div_ceil(8))
            .sum();

        let model = if huffman_bytes < fixed_bytes {
            ResidueModel::Huffman(huffman)
        } else {
            ResidueModel::Fixed
        };
        models.insert(consensus, model);
    }
    ResidueModelHeader { models }
}

/// Encodes one block's residues into byte-aligned wire bytes under its
/// bucket's chosen model.
pub fn encode_block_residues(
    header: &ResidueModelHeader,
    alphabet: &[u8],
    bits_per_symbol: u32,
    consensus: u8,
    residues: &[u8],
) -> Vec<u8> {
    if residues.is_empty() {
        return Vec::new();
    }
    let indices: Vec<u8> = residues.iter().map(|&r| symbol_index(alphabet, r)).collect();
    match header.models.get(&consensus) {
        Some(ResidueModel::Huffman(huffman)) => huffman.encode(&indices),
        _ => {
            let mut writer = BitWriter::new();
            for &idx in &indices {
                writer.write_bits(idx as u64, bits_per_symbol);
            }
            writer.into_bytes()
        }
    }
}

/// Decodes `deviation_count` residues for `consensus` from byte-aligned wire bytes.
pub fn decode_block_residues(
    header: &ResidueModelHeader,
    alphabet: &[u8],
    bits_per_symbol: u32,
    consensus: u8,
    payload: &[u8],
    deviation_count: u32,
) -> Result<Vec<u8>> {
    if deviation_count == 0 {
        return Ok(Vec::new());
    }
    let indices: Vec<u8> = match header.models.get(&consensus) {
        Some(ResidueModel::Huffman(huffman)) => huffman.decode(payload, deviation_count as usize)?,
        Some(ResidueModel::Fixed) | None => {
            let mut reader = BitReader::new(payload);
            let mut out = Vec::with_capacity(deviation_count as usize);
            for _ in 0..deviation_count {
                out.push(reader.read_bits(bits_per_symbol)? as u8);
            }
            out
        }
    };
    indices
        .into_iter()
        .map(|idx| {
            alphabet
                .get(idx as usize)
                .copied()
                .ok_or_else(|| EcompError::format("residue symbol index out of range"))
        })
        .collect()
}

/// `0` = fixed, `1` = Huffman — stored per bucket in the header.
fn model_tag(model: &ResidueModel) -> u8 {
    match model {
        ResidueModel::Fixed => 0,
        ResidueModel::Huffman(_) => 1,
    }
}

impl ResidueModelHeader {
    pub fn write(&self, out: &mut Vec<u8>) {
        out.push(self.models.len() as u8);
        for (&consensus, model) in &self.models {
            out.push(consensus);
            out.push(model_tag(model));
            if let ResidueModel::Huffman(huffman) = model {
                huffman.write_header(out);
            }
        }
    }

    pub fn read(buf: &[u8], pos: &mut usize) -> Result<Self> {
        let count = *buf
            .get(*pos)
            .ok_or_else(|| EcompError::format("truncated residue model header"))? as usize;
        *pos += 1;
        let mut models = BTreeMap::new();
        for _ in 0..count {
            let consensus = *buf
                .get(*pos)
                .ok_or_else(|| EcompError::format("truncated residue model header"))?;
            let tag = *buf
                .get(*pos + 1)
                .ok_or_else(|| EcompError::format("truncated residue model header"))?;
            *pos += 2;
            let model = match tag {
                0 => ResidueModel::Fixed,
                1 => ResidueModel::Huffman(CanonicalHuffman::read_header(buf, pos)?),
                other => {
                    return Err(EcompError::format(format!(
                        "unknown residue model tag {other}"
                    )))
                }
            };
            models.insert(consensus, model);
        }
        Ok(Self { models })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::AlignmentFrame;
    use crate::consensus::profile_columns;
    use crate::rle::{bits_per_symbol, group_runs};
    use std::collections::BTreeMap as Map;

    fn frame(rows: &[&str]) -> AlignmentFrame {
        let ids = (0..rows.len()).map(|i| format!("s{i}")).collect();
        let rows = rows.iter().map(|r| r.to_string()).collect();
        AlignmentFrame::new(ids, rows, Map::new()).unwrap()
    }

    #[test]
    fn round_trips_mixed_model_blocks() {
        let f = frame(&[
            "AAAAAAAAAA",
            "CAAAAAAAAA",
            "GAAAAAAAAA",
            "TAAAAAAAAA",
            "AAAAAAAAAC",
        ]);
        let profiles = profile_columns(&f);
        let blocks = group_runs(&f, &profiles);
        let bits = bits_per_symbol(f.alphabet().len());
        let header = build_residue_models(&blocks, f.alphabet(), bits);

        for block in &blocks {
            let encoded = encode_block_residues(
                &header,
                f.alphabet(),
                bits,
                block.consensus,
                &block.residues,
            );
            let decoded = decode_block_residues(
                &header,
                f.alphabet(),
                bits,
                block.consensus,
                &encoded,
                block.deviation_count,
            )
            .unwrap();
            assert_eq!(decoded, block.residues);
        }
    }

    #[test]
    fn header_round_trips_through_bytes() {
        let f = frame(&["AAAA", "CAAA", "GAAA", "TAAA"]);
        let profiles = profile_columns(&f);
        let blocks = group_runs(&f, &profiles);
        let bits = bits_per_symbol(f.alphabet().len());
        let header = build_residue_models(&blocks, f.alphabet(), bits);

        let mut buf = Vec::new();
        header.write(&mut buf);
        let mut pos = 0;
        let parsed = ResidueModelHeader::read(&buf, &mut pos).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(pos, buf.len());
    }

    #[test]
    fn no_deviations_means_empty_header() {
        let f = frame(&["AAAA", "AAAA"]);
        let profiles = profile_columns(&f);
        let blocks = group_runs(&f, &profiles);
        let bits = bits_per_symbol(f.alphabet().len());
        let header = build_residue_models(&blocks, f.alphabet(), bits);
        assert!(header.models.is_empty());
    }
}
