use thiserror::Error;

/// Errors produced by the room registry.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed room name or schema id. Raised before any I/O.
    #[error("{0}")]
    Validation(String),

    /// No room is registered under the given name.
    #[error("Room '{0}' not found")]
    NotFound(String),

    /// Filesystem error while bootstrapping or writing the registry file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The registry mapping could not be serialised.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
