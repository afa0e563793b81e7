mod gzip_codec;
mod passthrough;
mod xz_codec;
mod zlib_codec;
mod zstd_codec;

pub use gzip_codec::GzipCodec;
pub use passthrough::PassThroughCodec;
pub use xz_codec::XzCodec;
pub use zlib_codec::ZlibCodec;
pub use zstd_codec::ZstdCodec;

/// Stable tags stored as `payload_encoding` in archive metadata.
pub const TAG_RAW: u8 = 0;
pub const TAG_ZLIB: u8 = 1;
pub const TAG_ZSTD: u8 = 2;
pub const TAG_XZ: u8 = 3;

/// Generic byte-stream compressor: compresses/decompresses a whole payload in
/// one call (unlike ANCF's per-block codec, ecomp has no random-access
/// requirement, so there is no block-independence invariant to preserve).
pub trait PayloadCodec {
    fn tag(&self) -> u8;
    fn name(&self) -> &'static str;
    fn compress(&self, raw: &[u8]) -> anyhow::Result<Vec<u8>>;
    fn decompress(&self, data: &[u8]) -> anyhow::Result<Vec<u8>>;
}

/// The four candidates in the outer pipeline's generic-compressor contest
/// (spec §4.8): raw, zlib(level=9), zstd(level=5), xz(preset=6).
pub fn contest_codecs() -> Vec<Box<dyn PayloadCodec>> {
    vec![
        Box::new(PassThroughCodec),
        Box::new(ZlibCodec::default()),
        Box::new(ZstdCodec::default()),
        Box::new(XzCodec::default()),
    ]
}

/// Resolves a codec by its on-disk tag, e.g. when decoding a payload tagged
/// with `payload_encoding`.
pub fn codec_by_tag(tag: u8) -> anyhow::Result<Box<dyn PayloadCodec>> {
    match tag {
        TAG_RAW => Ok(Box::new(PassThroughCodec)),
        TAG_ZLIB => Ok(Box::new(ZlibCodec::default())),
        TAG_ZSTD => Ok(Box::new(ZstdCodec::default())),
        TAG_XZ => Ok(Box::new(XzCodec::default())),
        other => anyhow::bail!("unknown payload encoding tag {other}"),
    }
}

/// Runs the full contest and returns `(tag, encoded_bytes)` for the smallest
/// candidate. Ties favor the candidate listed first in [`contest_codecs`].
pub fn compress_smallest(raw: &[u8]) -> (u8, Vec<u8>) {
    let mut best_tag = TAG_RAW;
    let mut best_bytes = raw.to_vec();
    for codec in contest_codecs() {
        if let Ok(candidate) = codec.compress(raw) {
            if candidate.len() < best_bytes.len() {
                best_tag = codec.tag();
                best_bytes = candidate;
            }
        }
    }
    (best_tag, best_bytes)
}
