use std::fs::File;
use std::path::{Path, PathBuf};

use recast_core::error::Result;
use recast_core::hash::{HashAlgorithm, digest_reader_multi};
use recast_core::manifest::Manifest;
use recast_core::pipeline::synth::ArtifactKind;
use recast_core::pipeline::{PipelineConfig, run, run_in};
use recast_core::recipe::{Method, RecipeFormat};
use recast_core::reassemble::{ReassembleOptions, reassemble_to_file};
use recast_core::report::{ValidationReport, export_report};
use recast_core::unit::{ChunkStore, StoreParams};
use recast_core::unit_factory::{Backend, open_store};
use recast_core::util::hex::normalize_digest;
use recast_core::validate::chunk::validate_chunk_dir;
use recast_core::{
    BatchOptions, Dispatcher, ValidationResult, validate_against_manifest, validate_batch,
};

/// Every handler reports whether everything it looked at passed.
pub type Outcome = Result<bool>;

fn print_result(r: &ValidationResult) {
    let id = r
        .chunk_id
        .map(|i| i.to_string())
        .unwrap_or_else(|| "-".into());
    if r.is_valid {
        println!("PASS {:<24} chunk={id}", r.unit);
    } else {
        let why = r
            .error
            .clone()
            .or_else(|| r.failure.map(|f| format!("{f:?}")))
            .unwrap_or_default();
        println!("FAIL {:<24} chunk={id} {why}", r.unit);
    }
}

fn store_units(root: &Path) -> Result<Vec<Box<dyn recast_core::ChunkSource>>> {
    let units = open_store(Backend::Fs, StoreParams::new(root))?.units()?;
    tracing::debug!(target: "recastdev", root = %root.display(), units = units.len(), "store opened");
    Ok(units)
}

pub fn handle_validate(unit: PathBuf) -> Outcome {
    let r = validate_chunk_dir(&unit, &Dispatcher::default());
    print_result(&r);
    if let (Some(want), Some(got)) = (&r.original_hash, &r.reconstructed_hash) {
        println!("  expected {want}");
        println!("  actual   {got}");
    }
    Ok(r.is_valid)
}

pub fn handle_batch(root: PathBuf, report: Option<PathBuf>, threads: Option<usize>) -> Outcome {
    let units = store_units(&root)?;
    let opts = BatchOptions {
        threads,
        cancel: None,
    };
    let batch = validate_batch(&units, &Dispatcher::default(), &opts)?;
    for r in batch.failures() {
        print_result(r);
    }
    let s = &batch.stats;
    println!(
        "total={} passed={} failed={} success_rate={:.2}%",
        s.total,
        s.successful,
        s.failed,
        s.success_rate * 100.0
    );
    for (cat, c) in &s.by_category {
        println!("  {cat}: {}/{} passed", c.successful, c.total);
    }
    if let Some(path) = report {
        export_report(&ValidationReport::from_batch(&batch), &path)?;
        eprintln!("report: {}", path.display());
    }
    Ok(batch.all_passed())
}

pub fn handle_reconstruct(
    root: PathBuf,
    out: PathBuf,
    expect_hash: Option<String>,
    algorithm: HashAlgorithm,
    verify: bool,
) -> Outcome {
    let expected = expect_hash
        .map(|h| normalize_digest(&h, algorithm).map(|h| (algorithm, h)))
        .transpose()?;
    let opts = ReassembleOptions {
        verify_chunks: verify,
        expected,
    };
    let units = store_units(&root)?;
    let summary = reassemble_to_file(&units, &Dispatcher::default(), &opts, &out)?;
    println!(
        "wrote {} ({} bytes from {} chunks) {}={}",
        out.display(),
        summary.size,
        summary.chunks,
        summary.algorithm,
        summary.hash
    );
    Ok(true)
}

pub fn handle_manifest_generate(dir: PathBuf, out: PathBuf, algorithm: HashAlgorithm) -> Outcome {
    let manifest = Manifest::generate(&dir, algorithm)?;
    manifest.save(&out)?;
    println!("{} entries -> {}", manifest.entries.len(), out.display());
    Ok(true)
}

pub fn handle_manifest_check(manifest: PathBuf, dir: PathBuf, report: Option<PathBuf>) -> Outcome {
    let m = Manifest::load(&manifest)?;
    let r = validate_against_manifest(&m, &dir);
    for e in r.entries.iter().filter(|e| !e.status.is_ok()) {
        println!("FAIL {} {:?}", e.path, e.status);
    }
    println!(
        "total={} passed={} failed={} missing={}",
        r.total, r.passed, r.failed, r.missing
    );
    if let Some(path) = report {
        export_report(&r, &path)?;
    }
    Ok(r.all_passed())
}

pub fn handle_digest(file: PathBuf, algorithms: Vec<HashAlgorithm>) -> Outcome {
    let algorithms = if algorithms.is_empty() {
        HashAlgorithm::ALL.to_vec()
    } else {
        algorithms
    };
    let (digests, total) = digest_reader_multi(File::open(&file)?, &algorithms)?;
    println!("{} ({total} bytes)", file.display());
    for (algo, hex) in digests {
        println!("  {:<7} {hex}", algo.name());
    }
    Ok(true)
}

#[allow(clippy::too_many_arguments)]
pub fn handle_pipeline(
    kind: ArtifactKind,
    size: usize,
    chunk_size: usize,
    method: Method,
    level: i32,
    algorithm: HashAlgorithm,
    cbor: bool,
    producer_cmd: Option<String>,
    threads: Option<usize>,
    keep: Option<PathBuf>,
    report: Option<PathBuf>,
) -> Outcome {
    let cfg = PipelineConfig {
        kind,
        size,
        chunk_size,
        method,
        level,
        algorithm,
        recipe_format: if cbor {
            RecipeFormat::Cbor
        } else {
            RecipeFormat::Json
        },
        producer_cmd,
        threads,
    };
    let r = match keep {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            run_in(&cfg, &dir)?
        }
        None => run(&cfg)?,
    };
    for f in &r.failures {
        print_result(f);
    }
    println!(
        "{} via {}: {} bytes, {} chunks, {}/{} valid, bit-identical: {}",
        r.kind, r.producer, r.artifact_size, r.chunks, r.batch.successful, r.batch.total, r.bit_identical
    );
    if let Some(e) = &r.reassembly_error {
        println!("reassembly aborted: {e}");
    }
    if let Some(path) = report {
        export_report(&r, &path)?;
    }
    Ok(r.passed())
}
