//! Minimal relaxed-PHYLIP parser/writer (sequential format): a header line
//! `<row_count> <column_count>` followed by one `<id> <sequence>` line per row.

use anyhow::{bail, Context, Result};
use ecomp_core::AlignmentFrame;

pub fn parse(text: &str) -> Result<(Vec<String>, Vec<String>)> {
    let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));
    let header = lines
        .next()
        .ok_or_else(|| anyhow::anyhow!("empty PHYLIP input"))?;
    let mut header_fields = header.split_whitespace();
    let declared_rows: usize = header_fields
        .next()
        .context("missing row count in PHYLIP header")?
        .parse()
        .context("PHYLIP row count is not a valid integer")?;
    let declared_cols: usize = header_fields
        .next()
        .context("missing column count in PHYLIP header")?
        .parse()
        .context("PHYLIP column count is not a valid integer")?;

    let mut ids = Vec::with_capacity(declared_rows);
    let mut rows = Vec::with_capacity(declared_rows);
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.splitn(2, char::is_whitespace);
        let id = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("malformed PHYLIP row: {line:?}"))?
            .to_string();
        let seq: String = parts
            .next()
            .unwrap_or("")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if seq.len() != declared_cols {
            bail!(
                "PHYLIP row {id:?} has {} columns, header declared {declared_cols}",
                seq.len()
            );
        }
        ids.push(id);
        rows.push(seq);
    }
    if rows.len() != declared_rows {
        bail!(
            "PHYLIP header declared {declared_rows} rows, found {}",
            rows.len()
        );
    }
    Ok((ids, rows))
}

pub fn render(frame: &AlignmentFrame) -> String {
    let mut out = format!("{} {}\n", frame.row_count(), frame.column_count());
    for (id, row) in frame.ids().iter().zip(frame.rows().iter()) {
        out.push_str(id);
        out.push(' ');
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
    fn parses_sequential_phylip() {
        let text = "3 4\nseq1 ACGT\nseq2 ACGA\nseq3 TTTT\n";
        let (ids, rows) = parse(text).unwrap();
        assert_eq!(ids, vec!["seq1", "seq2", "seq3"]);
        assert_eq!(rows, vec!["ACGT", "ACGA", "TTTT"]);
    }

    #[test]
    fn rejects_column_count_mismatch() {
        let text = "1 5\nseq1 ACGT\n";
        assert!(parse(text).is_err());
    }

    #[test]
    fn rejects_row_count_mismatch() {
        let text = "2 4\nseq1 ACGT\n";
        assert!(parse(text).is_err());
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
