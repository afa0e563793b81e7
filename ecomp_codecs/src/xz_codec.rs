use std::io::{Read, Write};

use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

use crate::{PayloadCodec, TAG_XZ};

/// Xz (LZMA2) codec at preset 6, per spec §4.8's `xz(preset=6)` candidate.
pub struct XzCodec {
    pub preset: u32,
}

impl Default for XzCodec {
    fn default() -> Self {
        Self { preset: 6 }
    }
}

impl PayloadCodec for XzCodec {
    fn tag(&self) -> u8 {
        TAG_XZ
    }

    fn name(&self) -> &'static str {
        "xz"
    }

    fn compress(&self, raw: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut encoder = XzEncoder::new(Vec::new(), self.preset);
        encoder.write_all(raw)?;
        Ok(encoder.finish()?)
    }

    fn decompress(&self, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut decoder = XzDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}
