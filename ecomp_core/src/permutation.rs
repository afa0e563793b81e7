//! In-payload permutation chunk (spec §9): prefixed `ECPE`, width-coded,
//! little-endian indices. Stored only when the permutation differs from
//! identity; absent otherwise.

use crate::error::{EcompError, Result};
use crate::varint::{read_varint, write_varint};

const MAGIC: &[u8; 4] = b"ECPE";

fn width_for(row_count: usize) -> u8 {
    if row_count <= u8::MAX as usize {
        1
    } else if row_count <= u16::MAX as usize {
        2
    } else {
        4
    }
}

pub fn encode_permutation(permutation: &[usize]) -> Vec<u8> {
    let width = width_for(permutation.len());
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.push(width);
    write_varint(&mut out, permutation.len() as u64);
    for &index in permutation {
        match width {
            1 => out.push(index as u8),
            2 => out.extend_from_slice(&(index as u16).to_le_bytes()),
            _ => out.extend_from_slice(&(index as u32).to_le_bytes()),
        }
    }
    out
}

/// If `buf[*pos..]` starts with the `ECPE` magic, decodes the permutation and
/// advances `*pos` past the chunk; otherwise leaves `*pos` untouched and
/// returns `None`.
pub fn try_decode_permutation(buf: &[u8], pos: &mut usize) -> Result<Option<Vec<usize>>> {
    if buf.get(*pos..*pos + 4) != Some(MAGIC.as_slice()) {
        return Ok(None);
    }
    let mut cursor = *pos + 4;
    let width = *buf
        .get(cursor)
        .ok_or_else(|| EcompError::format("truncated permutation chunk"))?;
    cursor += 1;
    let count = read_varint(buf, &mut cursor)? as usize;
    let mut permutation = Vec::with_capacity(count);
    for _ in 0..count {
        let index = match width {
            1 => *buf
                .get(cursor)
                .ok_or_else(|| EcompError::format("truncated permutation chunk"))?
                as usize,
            2 => {
                let bytes = buf
                    .get(cursor..cursor + 2)
                    .ok_or_else(|| EcompError::format("truncated permutation chunk"))?;
                u16::from_le_bytes([bytes[0], bytes[1]]) as usize
            }
            4 => {
                let bytes = buf
                    .get(cursor..cursor + 4)
                    .ok_or_else(|| EcompError::format("truncated permutation chunk"))?;
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
            }
            other => return Err(EcompError::format(format!("unknown permutation width {other}"))),
        };
        cursor += width as usize;
        permutation.push(index);
    }
    *pos = cursor;
    Ok(Some(permutation))
}
