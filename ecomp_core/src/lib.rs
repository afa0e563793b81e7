pub mod alignment;
pub mod archive;
pub mod bitio;
pub mod bitmask;
pub mod block_stream;
pub mod config;
pub mod consensus;
pub mod error;
pub mod huffman;
pub mod metadata;
pub mod newick;
pub mod order;
pub mod permutation;
pub mod pipeline;
pub mod residue;
pub mod rle;
pub mod seqid;
pub mod varint;

pub use alignment::{AlignmentFrame, MetadataValue};
pub use archive::{read_archive_bytes, read_archive_file, write_archive, write_archive_file, ReadArchive};
pub use config::CompressConfig;
pub use error::{EcompError, Result};
pub use metadata::{FallbackDescriptor, Metadata};
pub use order::OrderingStrategy;
pub use pipeline::{compress, decompress};
