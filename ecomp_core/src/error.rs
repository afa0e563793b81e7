//! Error taxonomy for the ecomp codec.
//!
//! Four buckets, matching the propagation policy in the outer pipeline design:
//! bad input shapes, malformed on-disk structures, checksum failures, and
//! unrecognized configuration. Encoder-selection contests are not errors —
//! an unavailable candidate is simply dropped from the contest.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EcompError {
    /// Alignment shape or alphabet violation (duplicate/empty ids, ragged rows,
    /// residues outside the declared alphabet).
    #[error("invalid input: {0}")]
    InputError(String),

    /// Malformed archive or payload structure: bad magic, unsupported version,
    /// truncated data, unknown mode/marker byte.
    #[error("format error: {0}")]
    FormatError(String),

    /// Stored checksum does not match the decoded content.
    #[error("integrity error: {0}")]
    IntegrityError(String),

    /// Unrecognized configuration value.
    #[error("config error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EcompError>;

impl EcompError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::InputError(message.into())
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::FormatError(message.into())
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::IntegrityError(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}
