//! Error types shared across the discovery pipeline.
//!
//! Only [`WalkError`] aborts a scan. Failures while probing handlers or normalizing
//! schemas are represented by [`HostError`] and are softened to an unknown schema by
//! the locator and normalizer instead of being propagated.

use crate::route_tree::NodeId;
use crate::storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Failure raised while reading a property of, or calling into, a host object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("property '{key}' could not be read: {message}")]
    PropertyAccess { key: String, message: String },
    #[error("call failed: {0}")]
    Call(String),
}

/// Fatal route tree traversal failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalkError {
    #[error("route tree deeper than {limit} levels (reached at node {node})")]
    DepthExceeded { limit: usize, node: NodeId },
    #[error("route node {0} does not exist in the graph")]
    UnknownNode(NodeId),
}

/// Failure of a single export call.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("duplicate operation {method} {path} in export input")]
    DuplicateOperation { method: String, path: String },
    #[error("failed to render example body: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure while loading a route manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON manifest: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("node {node} mounts unknown child index {child}")]
    UnknownChild { node: usize, child: usize },
    #[error("root index {0} is out of range")]
    UnknownRoot(usize),
}

/// Top-level error for callers that drive the whole pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Walk(#[from] WalkError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
