use clap::{Parser, Subcommand};
use std::path::PathBuf;

use recast_core::hash::HashAlgorithm;
use recast_core::pipeline::synth::ArtifactKind;
use recast_core::recipe::Method;

#[derive(Parser)]
#[command(author, version, about = "recastdev: chunk integrity and reconstruction", long_about = None)]
pub struct Cli {
    /// Debug logging (RECAST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum ManifestCommands {
    /// Record size and digest of every file under a directory
    Generate {
        dir: PathBuf,
        out: PathBuf,
        #[arg(long, default_value = "sha256")]
        algorithm: HashAlgorithm,
    },
    /// Replay a manifest against a directory
    Check {
        manifest: PathBuf,
        dir: PathBuf,
        /// write the per-entry report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate one chunk unit directory
    Validate { unit: PathBuf },

    /// Validate every unit directory under a chunk store
    Batch {
        root: PathBuf,
        /// write the batch report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
        /// worker threads (default: one per core)
        #[arg(long)]
        threads: Option<usize>,
    },

    /// Reassemble a chunk store into the original artifact
    Reconstruct {
        root: PathBuf,
        out: PathBuf,
        /// whole-artifact digest the output must match
        #[arg(long = "expect-hash")]
        expect_hash: Option<String>,
        #[arg(long, default_value = "sha256")]
        algorithm: HashAlgorithm,
        /// join chunks without checking each against its recipe
        #[arg(long = "no-verify")]
        no_verify: bool,
    },

    #[command(subcommand)]
    /// Whole-file manifests
    Manifest(ManifestCommands),

    /// Print digests of a file, all computed in one pass
    Digest {
        file: PathBuf,
        /// repeatable; defaults to every supported algorithm
        #[arg(long = "algorithm", short = 'a')]
        algorithms: Vec<HashAlgorithm>,
    },

    /// Synthesize, chunk, produce, validate and reassemble an artifact
    Pipeline {
        #[arg(long, default_value = "pattern")]
        kind: ArtifactKind,
        #[arg(long, default_value_t = 300)]
        size: usize,
        #[arg(long = "chunk-size", default_value_t = 100)]
        chunk_size: usize,
        #[arg(long, default_value = "zstd")]
        method: Method,
        #[arg(long, default_value_t = 3)]
        level: i32,
        #[arg(long, default_value = "sha256")]
        algorithm: HashAlgorithm,
        /// write recipes as CBOR instead of JSON
        #[arg(long)]
        cbor: bool,
        /// external producer, run as `<cmd> <chunk-file> <unit-dir> <chunk_id> <offset>`
        #[arg(long = "producer-cmd")]
        producer_cmd: Option<String>,
        #[arg(long)]
        threads: Option<usize>,
        /// keep the chunk store in this directory instead of a scratch one
        #[arg(long)]
        keep: Option<PathBuf>,
        #[arg(long)]
        report: Option<PathBuf>,
    },
}
