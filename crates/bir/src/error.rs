//! Errors produced while loading or saving a BIR.
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BirError {
    #[error("failed to read BIR file {path}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to decode BIR from {path}: {source}")]
    Decode { path: PathBuf, #[source] source: serde_json::Error },

    #[error("failed to write BIR file {path}: {source}")]
    Write { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to encode BIR for {path}: {source}")]
    Encode { path: PathBuf, #[source] source: serde_json::Error },

    #[error("BIR at {path} has no modules; this system requires exactly module[0]")]
    NoModules { path: PathBuf },
}
