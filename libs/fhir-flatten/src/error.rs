//! Error types for flattening

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported value kind '{kind}' at {path}")]
    UnsupportedValueKind { path: String, kind: String },

    #[error("invalid value at {path}: expected {expected}")]
    InvalidValue { path: String, expected: String },

    #[error("no type descriptor for {0}")]
    UnknownType(String),

    #[error(transparent)]
    Models(#[from] ferrum_models::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid(path: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidValue {
            path: path.into(),
            expected: expected.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
