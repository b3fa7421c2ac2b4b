// src/core/error.rs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize objects: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Reasons a property bag or an attribute assignment is refused.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("property bag has no string `id`")]
    MissingId,
    #[error("invalid timestamp for `{field}`: {value}")]
    InvalidTimestamp { field: String, value: String },
    #[error("attribute `{0}` is reserved")]
    ReservedAttribute(String),
}
