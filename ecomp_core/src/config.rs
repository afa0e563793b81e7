//! Compression configuration (spec §6 "Configuration options").

use crate::order::OrderingStrategy;

#[derive(Debug, Clone)]
pub struct CompressConfig {
    pub ordering_strategy: OrderingStrategy,
    pub allow_gzip_fallback: bool,
    pub verify_checksum: bool,
    pub tree_newick: Option<String>,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            ordering_strategy: OrderingStrategy::Auto,
            allow_gzip_fallback: true,
            verify_checksum: true,
            tree_newick: None,
        }
    }
}
