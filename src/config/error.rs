//! Configuration loading errors

use configen_merge::MergeError;

use super::effective::ConfigOrigin;
use super::interpolate::InterpolationError;
use super::materialize::ValidationError;

/// Any failure that aborts a configuration load. No partial configuration
/// is ever returned alongside one of these.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Merge error in {origin} layer: {source}")]
    Merge {
        origin: ConfigOrigin,
        #[source]
        source: MergeError,
    },

    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

impl ConfigError {
    pub(crate) fn merge(origin: ConfigOrigin, source: MergeError) -> Self {
        Self::Merge { origin, source }
    }
}
