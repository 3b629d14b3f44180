use thiserror::Error;

/// Errors shared across the Flock client layers.
#[derive(Error, Debug)]
pub enum FlockError {
    /// A wire payload failed validation at the transport boundary.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
