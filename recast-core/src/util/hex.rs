use crate::error::{RecastError, Result};
use crate::hash::HashAlgorithm;

/// Validate a hex digest for `algorithm` and return it lowercased.
pub fn normalize_digest(hex_str: &str, algorithm: HashAlgorithm) -> Result<String> {
    let s = hex_str.trim();
    let bytes = hex::decode(s)
        .map_err(|e| RecastError::InvalidRecipe(format!("invalid hex digest {s:?}: {e}")))?;
    let n = algorithm.digest_len();
    if bytes.len() != n {
        return Err(RecastError::InvalidRecipe(format!(
            "expected {n} bytes ({} hex chars) for {algorithm}, got {}",
            n * 2,
            bytes.len()
        )));
    }
    Ok(hex::encode(bytes))
}
