//! Server error types.

use std::path::PathBuf;

use metagraph_types::ValidationError;
use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Type system or type store error.
    #[error("type system error: {0}")]
    Types(#[from] metagraph_types::Error),

    /// A bootstrap schema file could not be loaded.
    #[error("bootstrap file {}: {source}", .path.display())]
    Bootstrap {
        /// The file being loaded.
        path: PathBuf,
        /// What went wrong.
        source: metagraph_types::Error,
    },

    /// An entity failed validation against its type.
    #[error("{type_name} entity rejected with {} violation(s)", .errors.len())]
    Validation {
        /// Entity type.
        type_name: String,
        /// Every violation found.
        errors: Vec<ValidationError>,
    },

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
