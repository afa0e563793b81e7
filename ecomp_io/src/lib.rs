//! Alignment file I/O (FASTA/PHYLIP) and `.ecomp` archive wrappers.
//!
//! This crate sits above `ecomp_core`: it turns files on disk into
//! `AlignmentFrame`s and back, and wraps `ecomp_core::{compress, decompress}`
//! with the archive read/write convention used by the CLI.

pub mod fasta;
pub mod phylip;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ecomp_core::{
    compress, decompress, read_archive_file, write_archive_file, AlignmentFrame, CompressConfig,
    MetadataValue,
};

/// Alignment format hint, either declared by the caller or sniffed from the
/// file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentFormat {
    Fasta,
    Phylip,
}

impl AlignmentFormat {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "fasta" | "fa" | "fas" => Ok(AlignmentFormat::Fasta),
            "phylip" | "phy" => Ok(AlignmentFormat::Phylip),
            other => bail!("unknown alignment format '{other}'. Valid options: fasta, phylip"),
        }
    }

    fn sniff(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("phy") || ext.eq_ignore_ascii_case("phylip") => {
                AlignmentFormat::Phylip
            }
            _ => AlignmentFormat::Fasta,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            AlignmentFormat::Fasta => "fasta",
            AlignmentFormat::Phylip => "phylip",
        }
    }
}

/// Reads an alignment from `path`, using `fmt` if given or sniffing from the
/// extension otherwise. Records the resolved format as `source_format` in
/// the frame's metadata.
pub fn read_alignment(path: &Path, fmt: Option<&str>) -> Result<AlignmentFrame> {
    let resolved = match fmt {
        Some(name) => AlignmentFormat::parse(name)?,
        None => AlignmentFormat::sniff(path),
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading alignment file {path:?}"))?;
    let (ids, rows) = match resolved {
        AlignmentFormat::Fasta => fasta::parse(&text)?,
        AlignmentFormat::Phylip => phylip::parse(&text)?,
    };
    let mut metadata = BTreeMap::new();
    metadata.insert(
        "source_format".to_string(),
        MetadataValue::Text(resolved.as_str().to_string()),
    );
    Ok(AlignmentFrame::new(ids, rows, metadata)?)
}

/// Reads a Newick tree hint from `tree_path`, to be attached to a
/// `CompressConfig` and consulted only by the sequence-order optimizer.
pub fn read_tree_hint(tree_path: &Path) -> Result<String> {
    fs::read_to_string(tree_path).with_context(|| format!("reading tree file {tree_path:?}"))
}

/// Writes an alignment to `path` in the requested format.
pub fn write_alignment(frame: &AlignmentFrame, path: &Path, fmt: &str) -> Result<()> {
    let resolved = AlignmentFormat::parse(fmt)?;
    let text = match resolved {
        AlignmentFormat::Fasta => fasta::render(frame),
        AlignmentFormat::Phylip => phylip::render(frame),
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {parent:?}"))?;
        }
    }
    fs::write(path, text).with_context(|| format!("writing alignment file {path:?}"))
}

/// Reads `alignment_path`, compresses it, and writes a single-file archive
/// to `output_path`. Returns the compressed archive byte size.
pub fn compress_file(
    alignment_path: &Path,
    output_path: &Path,
    alignment_format: Option<&str>,
    tree_path: Option<&Path>,
    config: &CompressConfig,
) -> Result<u64> {
    let frame = read_alignment(alignment_path, alignment_format)?;
    let mut config = config.clone();
    if let Some(tree_path) = tree_path {
        config.tree_newick = Some(read_tree_hint(tree_path)?);
    }
    let (payload, metadata) = compress(&frame, &config)?;
    write_archive_file(output_path, &payload, &metadata)?;
    Ok(fs::metadata(output_path)?.len())
}

/// Reads the archive at `archive_path`, decompresses it, and writes the
/// restored alignment to `alignment_output` in the requested format.
pub fn decompress_file(
    archive_path: &Path,
    alignment_output: &Path,
    alignment_format: &str,
    verify_checksum: bool,
) -> Result<()> {
    let archive = read_archive_file(archive_path)?;
    let frame = decompress(&archive.payload, &archive.metadata, verify_checksum)?;
    write_alignment(&frame, alignment_output, alignment_format)
}

/// Default output path for a compressed archive: the alignment path with its
/// suffix replaced by `.ecomp`.
pub fn default_archive_path(alignment_path: &Path) -> std::path::PathBuf {
    alignment_path.with_extension("ecomp")
}

/// Default output path for a decompressed alignment: the archive path with
/// its suffix replaced by the target format's conventional extension.
pub fn default_alignment_path(archive_path: &Path, fmt: &str) -> std::path::PathBuf {
    archive_path.with_extension(fmt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("ecomp_io_test_{name}"));
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn compress_then_decompress_file_round_trip() {
        let fasta = ">s1\nACGTACGT\n>s2\nACGTACGT\n>s3\nACGTTCGT\n";
        let input = temp_file("a.fasta", fasta);
        let archive = std::env::temp_dir().join("ecomp_io_test_a.ecomp");
        let restored = std::env::temp_dir().join("ecomp_io_test_a.restored.fasta");

        compress_file(&input, &archive, None, None, &CompressConfig::default()).unwrap();
        decompress_file(&archive, &restored, "fasta", true).unwrap();

        let restored_frame = read_alignment(&restored, Some("fasta")).unwrap();
        let original_frame = read_alignment(&input, Some("fasta")).unwrap();
        assert_eq!(restored_frame.ids(), original_frame.ids());
        assert_eq!(restored_frame.rows(), original_frame.rows());
    }

    #[test]
    fn default_archive_path_replaces_extension() {
        let p = Path::new("/tmp/alignment.fasta");
        assert_eq!(default_archive_path(p), Path::new("/tmp/alignment.ecomp"));
    }

    #[test]
    fn format_parse_rejects_unknown_names() {
        assert!(AlignmentFormat::parse("nexus").is_err());
    }
}
