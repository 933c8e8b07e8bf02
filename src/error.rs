//! Error types for pg_raxarchive

use thiserror::Error;

/// Result type alias for pg_raxarchive operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while archiving, restoring or pruning segments
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No stored object matches the requested archive name
    #[error("Archive not found: {0}")]
    NotFound(String),

    /// A stored payload is not a valid gzip stream
    #[error("Decode error: {0}")]
    Decode(String),

    /// The object store rejected a request
    #[error("Store error: {0}")]
    Store(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error means the requested object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
