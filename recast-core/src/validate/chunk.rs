use std::path::Path;

use crate::domain::{FailureKind, ObservedStats, ValidationResult};
use crate::error::RecastError;
use crate::hash::{digest, same_digest};
use crate::reconstruct::Dispatcher;
use crate::recipe::Recipe;
use crate::unit::ChunkSource;
use crate::unit_fs::FsChunk;

/// Load, decode, hash and compare one unit.
///
/// Never fails: anything that goes wrong is folded into the returned result
/// so a batch can carry on with the next unit.
pub fn validate_chunk(unit: &dyn ChunkSource, dispatcher: &Dispatcher) -> ValidationResult {
    let label = unit.label();
    let recipe = match unit.load_recipe() {
        Ok(r) => r,
        Err(e) => return errored(label, None, &e),
    };
    let payload = match unit.load_payload() {
        Ok(p) => p,
        Err(e) => return errored(label, Some(&recipe), &e),
    };
    match dispatcher.decode_recipe(&recipe, &payload) {
        Ok(bytes) => judge(label, &recipe, payload.len() as u64, &bytes),
        Err(e) => {
            let mut r = errored(label, Some(&recipe), &e);
            r.stats = Some(ObservedStats {
                claimed: recipe.stats.clone(),
                payload_size: payload.len() as u64,
                reconstructed_size: 0,
            });
            r
        }
    }
}

/// Validate the unit stored in `dir`.
pub fn validate_chunk_dir(dir: &Path, dispatcher: &Dispatcher) -> ValidationResult {
    validate_chunk(&FsChunk::new(dir), dispatcher)
}

/// Check already-decoded bytes against their recipe. Returns the computed
/// digest and the failure, if any.
pub fn check_reconstructed(recipe: &Recipe, reconstructed: &[u8]) -> (String, Option<FailureKind>) {
    let actual = digest(reconstructed, recipe.hash_algorithm);
    let hash_ok = same_digest(&actual, &recipe.original_hash);
    // checked on its own: a colliding hash with the wrong length still fails
    let size_ok = reconstructed.len() as u64 == recipe.stats.original_size;
    let failure = match (hash_ok, size_ok) {
        (true, true) => None,
        (false, _) => Some(FailureKind::HashMismatch),
        (true, false) => Some(FailureKind::SizeMismatch),
    };
    (actual, failure)
}

fn errored(label: String, recipe: Option<&Recipe>, err: &RecastError) -> ValidationResult {
    tracing::warn!(target: "recast::validate", unit = %label, error = %err, "chunk could not be validated");
    let mut r = ValidationResult::errored(label, err);
    if let Some(recipe) = recipe {
        r.chunk_id = Some(recipe.chunk_id);
        r.original_hash = Some(recipe.original_hash.clone());
        r.category = recipe.content_type.clone();
    }
    r
}

fn judge(label: String, recipe: &Recipe, payload_size: u64, bytes: &[u8]) -> ValidationResult {
    let (reconstructed_hash, failure) = check_reconstructed(recipe, bytes);
    let r = ValidationResult {
        unit: label,
        chunk_id: Some(recipe.chunk_id),
        original_hash: Some(recipe.original_hash.clone()),
        reconstructed_hash: Some(reconstructed_hash),
        is_valid: failure.is_none(),
        failure,
        error: None,
        stats: Some(ObservedStats {
            claimed: recipe.stats.clone(),
            payload_size,
            reconstructed_size: bytes.len() as u64,
        }),
        category: recipe.content_type.clone(),
    };
    if let Some(kind) = failure {
        tracing::warn!(target: "recast::validate", unit = %r.unit, chunk_id = recipe.chunk_id, ?kind, "chunk failed validation");
    } else {
        tracing::debug!(target: "recast::validate", unit = %r.unit, chunk_id = recipe.chunk_id, "chunk ok");
    }
    r
}
