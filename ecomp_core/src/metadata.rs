//! Metadata Record (spec §3/§6): the string-keyed map persisted alongside the
//! payload. Known fields live on this struct; anything else round-trips
//! through `extra` untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EcompError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    pub source_format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub format_version: String,
    pub codec: String,
    pub row_count: u64,
    pub column_count: u64,
    pub alphabet: String,
    pub source_format: String,
    pub checksum_sha256: String,
    pub block_count: u64,
    pub max_run_length: u64,
    pub deviation_column_count: u64,
    pub bitmask_byte_width: u64,
    pub bits_per_symbol: u64,
    pub payload_encoding: String,
    pub raw_payload_size: u64,
    pub encoded_payload_size: u64,
    pub ordering_strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackDescriptor>,
    /// Unknown keys preserved verbatim across round-trips.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Metadata {
    /// Canonical JSON: sorted keys, compact separators. `serde_json` sorts
    /// object keys only when the map type does (`BTreeMap`/`#[serde(flatten)]`
    /// fields do, but the struct's declared fields serialize in declaration
    /// order); to guarantee full key-sortedness we route through a `Value`
    /// and re-sort before printing.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>> {
        let value = serde_json::to_value(self)
            .map_err(|e| EcompError::format(format!("metadata serialization failed: {e}")))?;
        let sorted = sort_value(value);
        serde_json::to_vec(&sorted)
            .map_err(|e| EcompError::format(format!("metadata serialization failed: {e}")))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| EcompError::format(format!("invalid metadata JSON: {e}")))
    }
}

fn sort_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: serde_json::Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, sort_value(v)))
                .collect::<BTreeMap<_, _>>()
                .into_iter()
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_value).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Metadata {
        Metadata {
            format_version: "1.0.0".to_string(),
            codec: "ecomp".to_string(),
            row_count: 2,
            column_count: 8,
            alphabet: "-ACGT".to_string(),
            source_format: "fasta".to_string(),
            checksum_sha256: "0".repeat(64),
            block_count: 3,
            max_run_length: 4,
            deviation_column_count: 1,
            bitmask_byte_width: 1,
            bits_per_symbol: 3,
            payload_encoding: "raw".to_string(),
            raw_payload_size: 20,
            encoded_payload_size: 20,
            ordering_strategy: "baseline".to_string(),
            fallback: None,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn round_trips_through_canonical_json() {
        let metadata = sample();
        let bytes = metadata.to_canonical_json().unwrap();
        let parsed = Metadata::from_json(&bytes).unwrap();
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn canonical_json_has_sorted_top_level_keys() {
        let metadata = sample();
        let bytes = metadata.to_canonical_json().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let codec_pos = text.find("\"codec\"").unwrap();
        let row_count_pos = text.find("\"row_count\"").unwrap();
        assert!(codec_pos < row_count_pos);
    }

    #[test]
    fn unknown_keys_round_trip() {
        let mut metadata = sample();
        metadata
            .extra
            .insert("future_field".to_string(), Value::String("x".to_string()));
        let bytes = metadata.to_canonical_json().unwrap();
        let parsed = Metadata::from_json(&bytes).unwrap();
        assert_eq!(
            parsed.extra.get("future_field"),
            Some(&Value::String("x".to_string()))
        );
    }
}
