//! Minimal FASTA parser/writer: `>id [description]` header lines followed
//! by one or more sequence lines, concatenated until the next header.

use anyhow::{bail, Result};
use ecomp_core::AlignmentFrame;

pub fn parse(text: &str) -> Result<(Vec<String>, Vec<String>)> {
    let mut ids = Vec::new();
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut has_current = false;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix('>') {
            if has_current {
                rows.push(std::mem::take(&mut current));
            }
            let id = rest.split_whitespace().next().unwrap_or("").to_string();
            if id.is_empty() {
                bail!("FASTA header line has no identifier: {line:?}");
            }
            ids.push(id);
            has_current = true;
        } else {
            if !has_current {
                bail!("FASTA sequence data before first header line");
            }
            current.push_str(line.trim());
        }
    }
    if has_current {
        rows.push(current);
    }
    if ids.is_empty() {
        bail!("FASTA input contains no records");
    }
    Ok((ids, rows))
}

/// Renders a frame as headerless-style canonical FASTA: one header line, one
/// sequence line per record (matches the layout `pipeline::frame_to_fasta`
/// uses for the gzip fallback path).
pub fn render(frame: &AlignmentFrame) -> String {
    let mut out = String::new();
    for (id, row) in frame.ids().iter().zip(frame.rows().iter()) {
        out.push('>');
        out.push_str(id);
        out.push('\n');
        out.push_str(row);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn parses_single_line_records() {
        let text = ">a\nACGT\n>b\nACGA\n";
        let (ids, rows) = parse(text).unwrap();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(rows, vec!["ACGT", "ACGA"]);
    }

    #[test]
    fn parses_wrapped_multi_line_sequences() {
        let text = ">a description text\nACGT\nACGT\n>b\nTTTT\n";
        let (ids, rows) = parse(text).unwrap();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(rows, vec!["ACGTACGT", "TTTT"]);
    }

    #[test]
    fn rejects_data_before_any_header() {
        assert!(parse("ACGT\n>a\nACGT\n").is_err());
    }

    #[test]
    fn render_round_trips_through_parse() {
        let frame = AlignmentFrame::new(
            vec!["x".to_string(), "y".to_string()],
            vec!["ACGT".to_string(), "ACGA".to_string()],
            BTreeMap::new(),
        )
        .unwrap();
        let text = render(&frame);
        let (ids, rows) = parse(&text).unwrap();
        assert_eq!(ids, frame.ids());
        assert_eq!(rows, frame.rows());
    }
}
