use crate::{PayloadCodec, TAG_RAW};

/// No-op codec: stores the payload verbatim. Always available, so the
/// contest never comes up empty even if every compressed candidate fails.
pub struct PassThroughCodec;

impl PayloadCodec for PassThroughCodec {
    fn tag(&self) -> u8 {
        TAG_RAW
    }

    fn name(&self) -> &'static str {
        "raw"
    }

    fn compress(&self, raw: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(raw.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}
