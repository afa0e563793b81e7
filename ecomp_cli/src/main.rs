use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use ecomp_core::{read_archive_file, CompressConfig};
use ecomp_io::{compress_file, decompress_file, default_alignment_path, default_archive_path};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "ecomp",
    about = "Evolutionary compression toolkit for multiple sequence alignments",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress an alignment (optionally bundling a companion Newick tree)
    Compress {
        /// Input alignment in FASTA/PHYLIP format
        alignment: PathBuf,
        /// Destination archive path (default: alignment stem + .ecomp)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Alignment format hint passed to the parser (fasta | phylip)
        #[arg(short = 'f', long = "input-format")]
        input_format: Option<String>,
        /// Optional Newick tree used only to guide sequence ordering
        #[arg(long)]
        tree: Option<PathBuf>,
        /// Print compression statistics (sizes and ratio)
        #[arg(long)]
        stats: bool,
        /// Force a sequence-order strategy: auto | baseline | mst | greedy
        #[arg(long)]
        order: Option<String>,
    },
    /// Restore an alignment from an ecomp archive
    Decompress {
        /// Compressed archive produced by `ecomp compress`
        archive: PathBuf,
        /// Alignment output path (default: archive stem + format extension)
        #[arg(short = 'o', long = "alignment-output")]
        alignment_output: Option<PathBuf>,
        /// Alignment output format
        #[arg(short = 'F', long = "format", default_value = "fasta")]
        format: String,
        /// Skip checksum validation during decompression
        #[arg(long = "no-checksum")]
        no_checksum: bool,
    },
    /// Display metadata for an ecomp archive
    Inspect {
        /// Archive to inspect
        archive: PathBuf,
        /// Print a human-readable summary instead of raw JSON
        #[arg(long)]
        summary: bool,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_compress(
    alignment: PathBuf,
    output: Option<PathBuf>,
    input_format: Option<String>,
    tree: Option<PathBuf>,
    stats: bool,
    order: Option<String>,
) -> anyhow::Result<()> {
    if !alignment.exists() {
        anyhow::bail!("alignment not found: {:?}", alignment);
    }
    if let Some(tree_path) = &tree {
        if !tree_path.exists() {
            anyhow::bail!("tree file not found: {:?}", tree_path);
        }
    }

    let output_path = output.unwrap_or_else(|| default_archive_path(&alignment));

    let mut config = CompressConfig::default();
    if let Some(strategy) = &order {
        config.ordering_strategy = ecomp_core::order::parse_ordering_override(strategy);
    }

    let t0 = Instant::now();
    let original_size = std::fs::metadata(&alignment)
        .with_context(|| format!("reading alignment metadata {:?}", alignment))?
        .len();

    let compressed_size = compress_file(
        &alignment,
        &output_path,
        input_format.as_deref(),
        tree.as_deref(),
        &config,
    )
    .with_context(|| format!("compressing {:?}", alignment))?;
    let elapsed = t0.elapsed();

    println!("Created {:?}", output_path);
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());

    if stats {
        let ratio = if compressed_size > 0 {
            original_size as f64 / compressed_size as f64
        } else {
            f64::INFINITY
        };
        println!(
            "Stats: original={} compressed={} ratio={:.3}x",
            human_bytes(original_size),
            human_bytes(compressed_size),
            ratio
        );
    }
    Ok(())
}

fn run_decompress(
    archive: PathBuf,
    alignment_output: Option<PathBuf>,
    format: String,
    no_checksum: bool,
) -> anyhow::Result<()> {
    if !archive.exists() {
        anyhow::bail!("archive not found: {:?}", archive);
    }
    let output_path =
        alignment_output.unwrap_or_else(|| default_alignment_path(&archive, &format));

    let t0 = Instant::now();
    decompress_file(&archive, &output_path, &format, !no_checksum)
        .with_context(|| format!("decompressing {:?}", archive))?;
    let elapsed = t0.elapsed();

    println!("Wrote alignment to {:?}", output_path);
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_inspect(archive: PathBuf, summary: bool) -> anyhow::Result<()> {
    let read = read_archive_file(&archive).with_context(|| format!("inspecting {:?}", archive))?;
    let metadata = read.metadata;

    if summary {
        println!("Codec: {}", metadata.codec);
        println!("Sequences: {}", metadata.row_count);
        println!("Alignment columns: {}", metadata.column_count);
        println!("Payload encoding: {}", metadata.payload_encoding);
        println!("Ordering strategy: {}", metadata.ordering_strategy);
        println!(
            "Raw/encoded payload: {} / {}",
            human_bytes(metadata.raw_payload_size),
            human_bytes(metadata.encoded_payload_size)
        );
        return Ok(());
    }

    let json = metadata
        .to_canonical_json()
        .context("serializing archive metadata")?;
    println!("{}", String::from_utf8_lossy(&json));
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Compress {
            alignment,
            output,
            input_format,
            tree,
            stats,
            order,
        } => run_compress(alignment, output, input_format, tree, stats, order),
        Commands::Decompress {
            archive,
            alignment_output,
            format,
            no_checksum,
        } => run_decompress(archive, alignment_output, format, no_checksum),
        Commands::Inspect { archive, summary } => run_inspect(archive, summary),
    }
}
