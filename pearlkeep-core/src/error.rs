//! Error types for the pearlkeep core library.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::BlockPos;

/// Top-level error type for all pearlkeep operations.
///
/// Navigation failures are deliberately absent: the trigger sequencer
/// recovers them locally (degrade, then proceed) and never surfaces them
/// as a hard failure on their own.
#[derive(Error, Debug)]
pub enum PearlError {
    /// No settled pearl matched the requesting player.
    #[error("no settled pearl for player {0}")]
    NotFound(String),

    /// No qualifying action block within the search radius.
    #[error("no action block within {radius} blocks of {pos}")]
    NoActionBlock {
        /// Center of the searched cube (the pearl's snapped coordinate).
        pos: BlockPos,
        /// Search radius in blocks.
        radius: i32,
    },

    /// A trigger sequence is already in flight.
    #[error("a trigger sequence is already in progress")]
    Busy,

    /// A fault during the orient/wait/interact sequence.
    #[error("interaction failed: {0}")]
    Interaction(String),

    /// Durable write failure. Non-fatal: the in-memory registry stays
    /// authoritative until the next successful write.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The durable state file is absent at startup. Fatal.
    #[error("state file not found: {}", .0.display())]
    MissingStateFile(PathBuf),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, PearlError>;
