//! Error types for the LOD cache

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    /// A required argument (column, color source, ...) was missing
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A serialized record line could not be decoded
    #[error("Malformed LOD record: {0}")]
    MalformedRecord(String),

    /// The world or dimension a task was created for no longer exists
    #[error("Stale context: {0}")]
    StaleContext(String),

    /// Chunk coordinate outside of the region it was given to
    #[error("Chunk ({x}, {z}) is outside region ({region_x}, {region_z})")]
    OutOfRange {
        x: i32,
        z: i32,
        region_x: i32,
        region_z: i32,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// A background worker shut down before answering
    #[error("Runtime error: {0}")]
    Runtime(String),
}
