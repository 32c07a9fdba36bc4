use thiserror::Error;

/// Errors raised while building a masker or clusterer.
///
/// Per-message operations never return these: once construction succeeds,
/// every input string produces a result.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid masking pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid similarity threshold: {0} (must be within [0, 1])")]
    InvalidThreshold(String),

    #[error("Invalid max depth: {0} (must be at least 3)")]
    InvalidDepth(usize),

    #[error("Invalid max children: {0} (must be positive)")]
    InvalidMaxChildren(usize),

    #[error("Invalid cluster capacity: {0} (must be positive)")]
    InvalidCapacity(usize),

    #[error("Invalid extra delimiter: {0:?}")]
    InvalidDelimiter(String),

    #[error("Invalid shard count: {0} (must be positive)")]
    InvalidShardCount(usize),

    #[error("Invalid wildcard marker: {0:?} (must be non-empty without whitespace)")]
    InvalidWildcard(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
