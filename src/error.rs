//! Error types for archflow.
//!
//! Referential gaps (dangling edges, unresolvable routes) are never errors:
//! they are recorded as diagnostics. The one structural failure surfaced to
//! callers is a cyclic network, which rejects that network only.

use thiserror::Error;

use crate::graph::depth::CyclicGraphError;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum ArchFlowError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("network '{network}' is not a DAG: {source}")]
    CyclicGraph {
        network: String,
        #[source]
        source: CyclicGraphError,
    },

    #[error("unknown network: {0}")]
    UnknownNetwork(String),

    #[error("network '{0}' was rejected at load time and cannot be evaluated")]
    NetworkUnavailable(String),

    #[error("unknown architecture: {0}")]
    UnknownArchitecture(String),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArchFlowError>;
