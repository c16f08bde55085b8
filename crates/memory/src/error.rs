//! Error types for the memory subsystem.
//!
//! Only the write side surfaces errors: a failed persist means in-memory
//! state is ahead of disk and the caller should know. Read-side corruption is
//! never an error: a bad file is logged and its scope starts empty.

use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by [`crate::MemoryStore`]. None are fatal to the host
/// process.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The scope file could not be written after retries; the in-memory
    /// record is ahead of its file until the next successful persist.
    #[error("failed to write memory file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize conversation record for channel {channel_id}: {source}")]
    Serialize {
        channel_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to delete memory file {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to initialize memory root {path}: {source}")]
    Init {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, MemoryError>;
