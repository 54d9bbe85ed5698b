//! End-to-end harness: synthesize an artifact, chunk it, produce units into
//! a scratch store, then validate, reassemble and compare bit for bit.
//!
//! The checks made after production do not depend on which producer ran.

use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;

use crate::compare::{bitwise_equal, first_difference};
use crate::domain::ValidationResult;
use crate::error::{RecastError, Result};
use crate::hash::{HashAlgorithm, digest};
use crate::recipe::{Method, RecipeFormat};
use crate::reassemble::{ReassembleOptions, reassemble_with};
use crate::reconstruct::Dispatcher;
use crate::stats::BatchStatistics;
use crate::unit::{ChunkStore, StoreParams};
use crate::unit_fs::FsChunkStore;
use crate::validate::batch::{BatchOptions, BatchReport, validate_batch};

pub mod chunker;
pub mod producer;
pub mod synth;

use chunker::Chunking;
use producer::{ExternalProducer, Producer, SimulatedProducer};
use synth::{ArtifactKind, synthesize};

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub kind: ArtifactKind,
    pub size: usize,
    pub chunk_size: usize,
    pub method: Method,
    pub level: i32,
    pub algorithm: HashAlgorithm,
    pub recipe_format: RecipeFormat,
    /// Command line of an external producer; replaces the simulated one.
    pub producer_cmd: Option<String>,
    pub threads: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            kind: ArtifactKind::Pattern,
            size: 300,
            chunk_size: 100,
            method: Method::Zstd,
            level: 3,
            algorithm: HashAlgorithm::Sha256,
            recipe_format: RecipeFormat::Json,
            producer_cmd: None,
            threads: None,
        }
    }
}

impl PipelineConfig {
    /// Images travel as one chunk through the image codec; everything else
    /// is cut into fixed-size chunks.
    fn plan(&self) -> Result<(Chunking, Method)> {
        match (self.kind, self.method) {
            (ArtifactKind::Image, _) => Ok((Chunking::Whole, Method::Image)),
            (_, Method::Image) => Err(RecastError::Format(format!(
                "the image method needs an image artifact, not {}",
                self.kind
            ))),
            (_, m) => Ok((Chunking::Fixed(self.chunk_size), m)),
        }
    }

    fn producer(&self, method: Method) -> Result<Box<dyn Producer>> {
        if let Some(cmd) = &self.producer_cmd {
            return Ok(Box::new(ExternalProducer::from_command_line(cmd)?));
        }
        let mut p = SimulatedProducer::new(method);
        p.level = self.level;
        p.algorithm = self.algorithm;
        p.recipe_format = self.recipe_format;
        p.content_type = Some(self.kind.name().to_string());
        Ok(Box::new(p))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PipelineReport {
    pub kind: ArtifactKind,
    pub producer: String,
    pub artifact_size: u64,
    pub artifact_hash: String,
    pub chunks: usize,
    pub batch: BatchStatistics,
    pub failures: Vec<ValidationResult>,
    pub reassembled: bool,
    pub bit_identical: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_difference: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reassembly_error: Option<String>,
}

impl PipelineReport {
    pub fn passed(&self) -> bool {
        self.batch.failed == 0 && self.batch.total > 0 && self.bit_identical
    }
}

/// Produce one unit per chunk of `artifact` under `root`.
pub fn produce_units(
    artifact: &[u8],
    chunking: Chunking,
    producer: &dyn Producer,
    root: &Path,
) -> Result<usize> {
    let chunks = chunking.split(artifact)?;
    chunks
        .par_iter()
        .map(|c| producer.produce(c, root).map(|_| ()))
        .collect::<Result<Vec<()>>>()?;
    tracing::info!(
        target: "recast::pipeline",
        producer = %producer.name(),
        chunks = chunks.len(),
        "units produced"
    );
    Ok(chunks.len())
}

#[derive(Debug)]
pub struct StoreCheck {
    pub batch: BatchReport,
    /// Outcome of reassembly; an error here is a finding, not a harness fault.
    pub rebuilt: Result<Vec<u8>>,
}

/// Validate and reassemble the store at `root`. Reassembly verifies every
/// chunk and the digest of `artifact`.
pub fn check_store(
    root: &Path,
    artifact: &[u8],
    algorithm: HashAlgorithm,
    opts: &BatchOptions,
) -> Result<StoreCheck> {
    let dispatcher = Dispatcher::default();
    let store = FsChunkStore::open(StoreParams::new(root))?;
    let units = store.units()?;
    let batch = validate_batch(&units, &dispatcher, opts)?;

    let ropts = ReassembleOptions {
        verify_chunks: true,
        expected: Some((algorithm, digest(artifact, algorithm))),
    };
    let rebuilt = reassemble_with(&units, &dispatcher, &ropts);
    Ok(StoreCheck { batch, rebuilt })
}

/// Run the whole pipeline in `root`, which should be empty.
pub fn run_in(cfg: &PipelineConfig, root: &Path) -> Result<PipelineReport> {
    let (chunking, method) = cfg.plan()?;
    let artifact = synthesize(cfg.kind, cfg.size)?;
    let producer = cfg.producer(method)?;
    tracing::info!(
        target: "recast::pipeline",
        kind = %cfg.kind,
        size = artifact.len(),
        producer = %producer.name(),
        "pipeline started"
    );
    let chunks = produce_units(&artifact, chunking, producer.as_ref(), root)?;

    let opts = BatchOptions {
        threads: cfg.threads,
        cancel: None,
    };
    let check = check_store(root, &artifact, cfg.algorithm, &opts)?;

    let (reassembled, bit_identical, diff, reassembly_error) = match check.rebuilt {
        Ok(bytes) => {
            let same = bitwise_equal(&artifact, &bytes);
            (true, same, first_difference(&artifact, &bytes), None)
        }
        Err(e) => {
            tracing::warn!(target: "recast::pipeline", error = %e, "reassembly aborted");
            (false, false, None, Some(e.to_string()))
        }
    };

    let report = PipelineReport {
        kind: cfg.kind,
        producer: producer.name(),
        artifact_size: artifact.len() as u64,
        artifact_hash: digest(&artifact, cfg.algorithm),
        chunks,
        failures: check.batch.failures().cloned().collect(),
        batch: check.batch.stats,
        reassembled,
        bit_identical,
        first_difference: diff,
        reassembly_error,
    };
    tracing::info!(
        target: "recast::pipeline",
        passed = report.passed(),
        bit_identical = report.bit_identical,
        "pipeline finished"
    );
    Ok(report)
}

/// Run the pipeline in a scratch directory that is removed afterwards.
pub fn run(cfg: &PipelineConfig) -> Result<PipelineReport> {
    let scratch = tempfile::tempdir()?;
    run_in(cfg, scratch.path())
}
