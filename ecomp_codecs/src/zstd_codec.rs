use crate::{PayloadCodec, TAG_ZSTD};

/// Zstandard codec at level 5, per spec §4.8's `zstd(level=5)` candidate.
pub struct ZstdCodec {
    pub level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self { level: 5 }
    }
}

impl PayloadCodec for ZstdCodec {
    fn tag(&self) -> u8 {
        TAG_ZSTD
    }

    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress(&self, raw: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(zstd::bulk::compress(raw, self.level)?)
    }

    fn decompress(&self, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(zstd::decode_all(data)?)
    }
}
