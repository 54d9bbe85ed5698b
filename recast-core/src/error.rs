use std::path::PathBuf;

use thiserror::Error;

/// Which half of a chunk unit could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Payload,
    Recipe,
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Component::Payload => f.write_str("payload"),
            Component::Recipe => f.write_str("recipe"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RecastError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("missing {component} for chunk unit {unit}")]
    MissingComponent { unit: String, component: Component },

    #[error("unknown reconstruction method: {0}")]
    UnknownReconstructionMethod(String),

    #[error("invalid recipe: {0}")]
    InvalidRecipe(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("chunks {first} and {second} both claim offset {offset}")]
    DuplicateOffset { offset: u64, first: u64, second: u64 },

    #[error("gap before chunk {chunk_id}: expected offset {expected}, found {found}")]
    OffsetGap {
        chunk_id: u64,
        expected: u64,
        found: u64,
    },

    #[error("chunk {chunk_id} at offset {found} overlaps data ending at {expected}")]
    OffsetOverlap {
        chunk_id: u64,
        expected: u64,
        found: u64,
    },

    #[error("nothing to reassemble: zero chunks")]
    EmptyReassembly,

    #[error("chunk {chunk_id} failed verification during reassembly: {reason}")]
    ChunkIntegrity { chunk_id: u64, reason: String },

    #[error("artifact hash mismatch: expected {expected}, got {actual}")]
    ArtifactHashMismatch { expected: String, actual: String },

    #[error("unsafe path: {0}")]
    UnsafePath(PathBuf),

    #[error("producer failed: {0}")]
    Producer(String),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, RecastError>;
