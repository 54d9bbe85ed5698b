#![forbid(unsafe_code)]

pub mod error;

pub mod util {
    pub mod hash_forward;
    pub mod hex;
}

pub mod hash;
pub mod compare;

pub mod codec;
pub mod recipe;
pub mod reconstruct;

pub mod domain;
pub mod stats;

pub mod unit;
pub mod unit_factory;
pub mod unit_fs;
pub mod unit_mem;

pub mod manifest;
pub mod validate;

pub mod reassemble;
pub mod report;

pub mod pipeline;

// Re-exports: stable API surface
pub use compare::{bitwise_equal, first_difference, readers_equal};
pub use domain::{FailureKind, ValidationResult};
pub use error::{RecastError, Result};
pub use hash::{HashAlgorithm, digest, digest_multi, digest_reader};
pub use manifest::Manifest;
pub use reassemble::{ReassembleOptions, reassemble, reassemble_to_file, reassemble_with};
pub use recipe::{Recipe, Reconstruction};
pub use reconstruct::Dispatcher;
pub use stats::BatchStatistics;
pub use unit::{ChunkSource, ChunkStore};
pub use validate::batch::{BatchOptions, BatchReport, validate_batch, validate_dir};
pub use validate::chunk::validate_chunk;
pub use validate::manifest::validate_against_manifest;
