use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::ValidationResult;
use crate::error::{RecastError, Result};
use crate::reconstruct::Dispatcher;
use crate::stats::BatchStatistics;
use crate::unit::{ChunkSource, ChunkStore, StoreParams};
use crate::unit_fs::FsChunkStore;
use crate::validate::chunk::validate_chunk;

#[derive(Clone, Debug, Default)]
pub struct BatchOptions {
    /// Worker threads; `None` uses the global rayon pool.
    pub threads: Option<usize>,
    /// Once set, no further units are started. Units already running finish.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl BatchOptions {
    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|c| c.load(Ordering::Relaxed))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchReport {
    pub stats: BatchStatistics,
    pub results: Vec<ValidationResult>,
}

impl BatchReport {
    pub fn all_passed(&self) -> bool {
        self.stats.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.is_valid)
    }
}

/// Validate every unit. A failing unit never stops its siblings.
pub fn validate_batch(
    units: &[Box<dyn ChunkSource>],
    dispatcher: &Dispatcher,
    opts: &BatchOptions,
) -> Result<BatchReport> {
    let run = || -> Vec<Option<ValidationResult>> {
        units
            .par_iter()
            .map(|u| {
                if opts.cancelled() {
                    return None;
                }
                Some(validate_chunk(u.as_ref(), dispatcher))
            })
            .collect()
    };
    let outcomes = match opts.threads {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .map_err(|e| RecastError::Format(format!("thread pool: {e}")))?
            .install(run),
        None => run(),
    };

    let skipped = outcomes.iter().filter(|o| o.is_none()).count() as u64;
    let results: Vec<ValidationResult> = outcomes.into_iter().flatten().collect();
    let mut stats = BatchStatistics::from_results(&results);
    stats.skipped = skipped;

    tracing::info!(
        target: "recast::batch",
        total = stats.total,
        successful = stats.successful,
        failed = stats.failed,
        skipped = stats.skipped,
        "batch validated"
    );
    Ok(BatchReport { stats, results })
}

pub fn validate_store(
    store: &dyn ChunkStore,
    dispatcher: &Dispatcher,
    opts: &BatchOptions,
) -> Result<BatchReport> {
    let units = store.units()?;
    validate_batch(&units, dispatcher, opts)
}

/// Validate every unit directory directly under `root`.
pub fn validate_dir(root: &Path, dispatcher: &Dispatcher, opts: &BatchOptions) -> Result<BatchReport> {
    let store = FsChunkStore::open(StoreParams::new(root))?;
    validate_store(&store, dispatcher, opts)
}
