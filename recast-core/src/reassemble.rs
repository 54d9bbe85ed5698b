//! Offset-ordered reassembly of decoded chunks.
//!
//! Decoding is per chunk and runs in parallel. Ordering comes from
//! `recipe.offset` alone; the order units were listed in is ignored. Any
//! structural problem (no chunks, two chunks on one offset, a gap, an
//! overlap, a chunk that will not decode) aborts the whole reassembly and
//! nothing is emitted.

use std::io::Write;
use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;

use crate::error::{RecastError, Result};
use crate::hash::{HashAlgorithm, Hasher, digest, same_digest};
use crate::reconstruct::Dispatcher;
use crate::recipe::Recipe;
use crate::unit::ChunkSource;
use crate::util::hash_forward::HashingForward;
use crate::validate::chunk::check_reconstructed;

#[derive(Clone, Debug)]
pub struct DecodedChunk {
    pub chunk_id: u64,
    pub offset: u64,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct ReassembleOptions {
    /// Check each decoded chunk against its recipe before concatenating.
    /// On by default.
    pub verify_chunks: bool,
    /// Digest the finished artifact must have.
    pub expected: Option<(HashAlgorithm, String)>,
}

impl Default for ReassembleOptions {
    fn default() -> Self {
        Self {
            verify_chunks: true,
            expected: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ArtifactSummary {
    pub chunks: usize,
    pub size: u64,
    pub algorithm: HashAlgorithm,
    pub hash: String,
}

fn decode_all<F>(units: &[Box<dyn ChunkSource>], decode: &F, verify: bool) -> Result<Vec<DecodedChunk>>
where
    F: Fn(&Recipe, &[u8]) -> Result<Vec<u8>> + Sync,
{
    units
        .par_iter()
        .map(|u| {
            let recipe = u.load_recipe()?;
            let payload = u.load_payload()?;
            let bytes = decode(&recipe, &payload)?;
            if verify {
                if let (_, Some(kind)) = check_reconstructed(&recipe, &bytes) {
                    return Err(RecastError::ChunkIntegrity {
                        chunk_id: recipe.chunk_id,
                        reason: format!("{kind:?}"),
                    });
                }
            }
            Ok(DecodedChunk {
                chunk_id: recipe.chunk_id,
                offset: recipe.offset,
                bytes,
            })
        })
        .collect()
}

/// Sort by offset, reject duplicates, gaps and overlaps, and concatenate.
pub fn order_and_concat(mut chunks: Vec<DecodedChunk>) -> Result<Vec<u8>> {
    if chunks.is_empty() {
        return Err(RecastError::EmptyReassembly);
    }
    chunks.sort_by_key(|c| c.offset);
    if let Some(w) = chunks.windows(2).find(|w| w[0].offset == w[1].offset) {
        return Err(RecastError::DuplicateOffset {
            offset: w[0].offset,
            first: w[0].chunk_id,
            second: w[1].chunk_id,
        });
    }

    let total: usize = chunks.iter().map(|c| c.bytes.len()).sum();
    let mut out = Vec::with_capacity(total);
    let mut expected = 0u64;
    for c in &chunks {
        if c.offset > expected {
            return Err(RecastError::OffsetGap {
                chunk_id: c.chunk_id,
                expected,
                found: c.offset,
            });
        }
        if c.offset < expected {
            return Err(RecastError::OffsetOverlap {
                chunk_id: c.chunk_id,
                expected,
                found: c.offset,
            });
        }
        out.extend_from_slice(&c.bytes);
        expected += c.bytes.len() as u64;
    }
    Ok(out)
}

/// Decode every unit with `decode` and join the results in offset order.
pub fn reassemble<F>(units: &[Box<dyn ChunkSource>], decode: F) -> Result<Vec<u8>>
where
    F: Fn(&Recipe, &[u8]) -> Result<Vec<u8>> + Sync,
{
    let chunks = decode_all(units, &decode, false)?;
    order_and_concat(chunks)
}

/// Reassemble through `dispatcher`, honouring `opts`.
pub fn reassemble_with(
    units: &[Box<dyn ChunkSource>],
    dispatcher: &Dispatcher,
    opts: &ReassembleOptions,
) -> Result<Vec<u8>> {
    let decode = |r: &Recipe, p: &[u8]| dispatcher.decode_recipe(r, p);
    let chunks = decode_all(units, &decode, opts.verify_chunks)?;
    let n = chunks.len();
    let artifact = order_and_concat(chunks)?;
    if let Some((algorithm, want)) = &opts.expected {
        let got = digest(&artifact, *algorithm);
        if !same_digest(&got, want) {
            return Err(RecastError::ArtifactHashMismatch {
                expected: want.clone(),
                actual: got,
            });
        }
    }
    tracing::info!(target: "recast::reassemble", chunks = n, size = artifact.len(), "artifact reassembled");
    Ok(artifact)
}

/// Reassemble into `out`. The artifact is written to a temporary file next
/// to `out` and only moved into place once the whole-artifact digest (if
/// one was expected) checks out, so a failure never leaves a file behind.
pub fn reassemble_to_file(
    units: &[Box<dyn ChunkSource>],
    dispatcher: &Dispatcher,
    opts: &ReassembleOptions,
    out: &Path,
) -> Result<ArtifactSummary> {
    let inner = ReassembleOptions {
        verify_chunks: opts.verify_chunks,
        expected: None,
    };
    let artifact = reassemble_with(units, dispatcher, &inner)?;
    let algorithm = opts
        .expected
        .as_ref()
        .map(|(a, _)| *a)
        .unwrap_or_default();

    let dir = match out.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    let mut hasher = Hasher::new(algorithm);
    let size = {
        let mut w = HashingForward::new(tmp.as_file_mut(), &mut hasher);
        w.write_all(&artifact)?;
        w.flush()?;
        w.counted
    };
    let hash = hasher.finalize_hex();
    if let Some((_, want)) = &opts.expected {
        if !same_digest(&hash, want) {
            return Err(RecastError::ArtifactHashMismatch {
                expected: want.clone(),
                actual: hash,
            });
        }
    }
    tmp.as_file().sync_all()?;
    tmp.persist(out).map_err(|e| RecastError::Io(e.error))?;

    Ok(ArtifactSummary {
        chunks: units.len(),
        size,
        algorithm,
        hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::Reconstruction;
    use crate::unit_mem::MemChunk;

    fn unit(id: u64, offset: u64, data: &[u8]) -> Box<dyn ChunkSource> {
        let r = Recipe::describe(id, offset, data, data.len() as u64, Reconstruction::Store, HashAlgorithm::Sha256);
        Box::new(MemChunk::new(format!("u{id}"), data.to_vec(), &r).unwrap())
    }

    fn store_decode(_: &Recipe, p: &[u8]) -> Result<Vec<u8>> {
        Ok(p.to_vec())
    }

    #[test]
    fn listing_order_is_ignored() {
        let units = vec![unit(2, 6, b"ghi"), unit(0, 0, b"abc"), unit(1, 3, b"def")];
        assert_eq!(reassemble(&units, store_decode).unwrap(), b"abcdefghi");
    }

    #[test]
    fn duplicate_offset_is_fatal() {
        let units = vec![unit(0, 0, b"abc"), unit(1, 3, b"def"), unit(7, 3, b"xyz")];
        let err = reassemble(&units, store_decode).unwrap_err();
        assert!(matches!(err, RecastError::DuplicateOffset { offset: 3, .. }));
    }

    #[test]
    fn gap_and_overlap_are_fatal() {
        let gap = vec![unit(0, 0, b"abc"), unit(1, 4, b"def")];
        assert!(matches!(
            reassemble(&gap, store_decode).unwrap_err(),
            RecastError::OffsetGap { expected: 3, found: 4, .. }
        ));
        let overlap = vec![unit(0, 0, b"abc"), unit(1, 2, b"def")];
        assert!(matches!(
            reassemble(&overlap, store_decode).unwrap_err(),
            RecastError::OffsetOverlap { expected: 3, found: 2, .. }
        ));
        let late_start = vec![unit(0, 1, b"abc")];
        assert!(matches!(
            reassemble(&late_start, store_decode).unwrap_err(),
            RecastError::OffsetGap { .. }
        ));
    }

    #[test]
    fn zero_chunks_is_fatal() {
        assert!(matches!(
            reassemble(&[], store_decode).unwrap_err(),
            RecastError::EmptyReassembly
        ));
    }

    #[test]
    fn verification_catches_tampered_chunk() {
        let mut r = Recipe::describe(0, 0, b"abc", 3, Reconstruction::Store, HashAlgorithm::Sha256);
        r.original_hash = digest(b"abd", HashAlgorithm::Sha256);
        let units: Vec<Box<dyn ChunkSource>> = vec![Box::new(MemChunk::new("u0", b"abc".to_vec(), &r).unwrap())];
        let err = reassemble_with(&units, &Dispatcher::default(), &ReassembleOptions::default())
            .unwrap_err();
        assert!(matches!(err, RecastError::ChunkIntegrity { chunk_id: 0, .. }));
        // only an explicit opt-out lets the bytes through as stored
        let unchecked = ReassembleOptions {
            verify_chunks: false,
            expected: None,
        };
        assert_eq!(
            reassemble_with(&units, &Dispatcher::default(), &unchecked).unwrap(),
            b"abc"
        );
    }

    #[test]
    fn default_options_keep_a_tampered_chunk_off_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let mut r = Recipe::describe(1, 3, b"def", 3, Reconstruction::Store, HashAlgorithm::Sha256);
        r.original_hash = digest(b"deg", HashAlgorithm::Sha256);
        let units = vec![
            unit(0, 0, b"abc"),
            Box::new(MemChunk::new("u1", b"def".to_vec(), &r).unwrap()) as Box<dyn ChunkSource>,
        ];
        let out = tmp.path().join("artifact.bin");
        let err = reassemble_to_file(&units, &Dispatcher::default(), &ReassembleOptions::default(), &out)
            .unwrap_err();
        assert!(matches!(err, RecastError::ChunkIntegrity { chunk_id: 1, .. }));
        assert!(!out.exists());
    }

    #[test]
    fn file_is_written_only_when_artifact_hash_matches() {
        let tmp = tempfile::tempdir().unwrap();
        let units = vec![unit(0, 0, b"hello "), unit(1, 6, b"world")];
        let out = tmp.path().join("artifact.bin");

        let wrong = ReassembleOptions {
            verify_chunks: true,
            expected: Some((HashAlgorithm::Sha256, digest(b"nope", HashAlgorithm::Sha256))),
        };
        let err = reassemble_to_file(&units, &Dispatcher::default(), &wrong, &out).unwrap_err();
        assert!(matches!(err, RecastError::ArtifactHashMismatch { .. }));
        assert!(!out.exists());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);

        let right = ReassembleOptions {
            verify_chunks: true,
            expected: Some((HashAlgorithm::Blake3, digest(b"hello world", HashAlgorithm::Blake3))),
        };
        let summary = reassemble_to_file(&units, &Dispatcher::default(), &right, &out).unwrap();
        assert_eq!(summary.size, 11);
        assert_eq!(std::fs::read(&out).unwrap(), b"hello world");
    }
}
