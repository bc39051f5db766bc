//! Error types for graph synthesis

use crate::synthesizer::AmbiguousPrimaryEdge;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown resource type: {0}")]
    UnknownType(String),

    #[error("{} type pair(s) without a primary edge: {}", .0.len(), format_pairs(.0))]
    AmbiguousPrimaryEdges(Vec<AmbiguousPrimaryEdge>),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Models(#[from] ferrum_models::Error),
}

fn format_pairs(pairs: &[AmbiguousPrimaryEdge]) -> String {
    pairs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;
