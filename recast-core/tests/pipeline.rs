use std::fs;

use recast_core::domain::FailureKind;
use recast_core::hash::HashAlgorithm;
use recast_core::pipeline::synth::ArtifactKind;
use recast_core::pipeline::{PipelineConfig, check_store, run, run_in};
use recast_core::recipe::{Method, Reconstruction};
use recast_core::unit::{ChunkSource, ChunkStore, StoreParams};
use recast_core::unit_fs::{FsChunkStore, PAYLOAD_FILE};
use recast_core::{BatchOptions, RecastError};

#[test]
fn image_artifact_is_rebuilt_byte_for_byte() {
    let cfg = PipelineConfig {
        kind: ArtifactKind::Image,
        size: 3 * 40 * 40,
        ..Default::default()
    };
    let tmp = tempfile::tempdir().unwrap();
    let report = run_in(&cfg, tmp.path()).unwrap();
    assert_eq!(report.chunks, 1);
    assert!(report.passed(), "{report:?}");

    let store = FsChunkStore::open(StoreParams::new(tmp.path())).unwrap();
    let recipe = store.units().unwrap()[0].load_recipe().unwrap();
    match recipe.reconstruction {
        Reconstruction::Image(p) => assert_eq!(p.shape, vec![40, 40, 3]),
        other => panic!("expected image recipe, got {other:?}"),
    }
    assert_eq!(recipe.content_type.as_deref(), Some("image"));
}

#[test]
fn tampered_store_is_reported_not_rebuilt() {
    let cfg = PipelineConfig {
        kind: ArtifactKind::Text,
        size: 2048,
        chunk_size: 256,
        method: Method::Store,
        ..Default::default()
    };
    let tmp = tempfile::tempdir().unwrap();
    let clean = run_in(&cfg, tmp.path()).unwrap();
    assert!(clean.passed());

    let artifact: Vec<u8> = recast_core::pipeline::synth::synthesize(cfg.kind, cfg.size).unwrap();
    let p = tmp.path().join("chunk_000003").join(PAYLOAD_FILE);
    let mut bytes = fs::read(&p).unwrap();
    bytes[10] = bytes[10].wrapping_add(1);
    fs::write(&p, bytes).unwrap();

    let check = check_store(tmp.path(), &artifact, HashAlgorithm::Sha256, &BatchOptions::default()).unwrap();
    assert_eq!(check.batch.stats.failed, 1);
    let bad = check.batch.failures().next().unwrap();
    assert_eq!(bad.chunk_id, Some(3));
    assert_eq!(bad.failure, Some(FailureKind::HashMismatch));
    assert!(matches!(check.rebuilt, Err(RecastError::ChunkIntegrity { chunk_id: 3, .. })));
}

#[test]
fn empty_artifact_does_not_pass() {
    let cfg = PipelineConfig {
        size: 0,
        ..Default::default()
    };
    let report = run(&cfg).unwrap();
    assert_eq!(report.chunks, 0);
    assert!(!report.reassembled);
    assert!(!report.passed());
}

#[cfg(target_os = "linux")]
#[test]
fn external_producer_meets_the_same_checks() {
    let tools = tempfile::tempdir().unwrap();
    let script = tools.path().join("produce.sh");
    fs::write(
        &script,
        r#"set -e
in="$1"; dir="$2"; id="$3"; off="$4"
cp "$in" "$dir/payload.bin"
size=$(wc -c < "$in" | tr -d ' ')
hash=$(sha256sum "$in" | cut -d' ' -f1)
printf '{"chunk_id": %s, "offset": %s, "original_hash": "%s", "compression_method": "none", "reconstruction": {"method": "store"}, "stats": {"original_size": %s, "compressed_size": %s}, "worker": "sh"}' \
  "$id" "$off" "$hash" "$size" "$size" > "$dir/recipe.json"
"#,
    )
    .unwrap();

    let cfg = PipelineConfig {
        kind: ArtifactKind::Pattern,
        size: 1000,
        chunk_size: 300,
        producer_cmd: Some(format!("sh {}", script.display())),
        ..Default::default()
    };
    let report = run(&cfg).unwrap();
    assert_eq!(report.chunks, 4);
    assert_eq!(report.producer, "external:sh");
    assert!(report.passed(), "{report:?}");
}
