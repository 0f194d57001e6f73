//! Errors from index construction and persistence.
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("multiple blocks cover address {address:#x}: {first} and {second}")]
    OverlappingBlocks { address: u64, first: uuid::Uuid, second: uuid::Uuid },

    #[error("failed to read index file {path}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to parse index file {path}: {source}")]
    Parse { path: PathBuf, #[source] source: serde_json::Error },

    #[error("failed to write index file {path}: {source}")]
    Write { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to encode index for {path}: {source}")]
    Encode { path: PathBuf, #[source] source: serde_json::Error },

    #[error("index entry has an invalid uuid {uuid:?}: {source}")]
    InvalidUuid { uuid: String, #[source] source: uuid::Error },
}
