use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::PayloadCodec;

/// Gzip codec used only by the outer pipeline's fallback path (spec §4.8):
/// gzips the reconstructed FASTA of the *original* frame, not the structured
/// payload, so it is not one of the four generic-compressor contest
/// candidates and carries no `contest_codecs` tag.
pub struct GzipCodec {
    pub level: u32,
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl PayloadCodec for GzipCodec {
    fn tag(&self) -> u8 {
        u8::MAX // not used in the generic-compressor contest's tag space
    }

    fn name(&self) -> &'static str {
        "gzip"
    }

    fn compress(&self, raw: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(raw)?;
        Ok(encoder.finish()?)
    }

    fn decompress(&self, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}
