use std::path::PathBuf;

use thiserror::Error as ThisError;

/// Errors that can occur while building a logger
#[derive(ThisError, Debug)]
pub enum Error {
    /// Neither console nor file output is enabled.
    #[error("Configuration error: console and file output must not both be disabled")]
    NoSink,
    /// The log directory could not be created.
    #[error("Failed to create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Initialization failed.
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
