use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpoolerError {
    #[error("file does not exist: {}", path.display())]
    MissingFile { path: PathBuf },
    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: String, secs: u64 },
    #[error("{command} failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("failed to run spooler command: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store is locked by another process: {}", path.display())]
    Locked { path: PathBuf },
}
