use serde::{Deserialize, Serialize};

use crate::error::RecastError;
use crate::recipe::ChunkStats;

/// Why a unit did not validate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    HashMismatch,
    SizeMismatch,
    MissingComponent,
    UnknownReconstructionMethod,
    InvalidRecipe,
    Decode,
}

impl FailureKind {
    /// Classify an error raised while loading or decoding a unit.
    pub fn of(err: &RecastError) -> FailureKind {
        match err {
            RecastError::MissingComponent { .. } => FailureKind::MissingComponent,
            RecastError::UnknownReconstructionMethod(_) => FailureKind::UnknownReconstructionMethod,
            RecastError::InvalidRecipe(_) => FailureKind::InvalidRecipe,
            _ => FailureKind::Decode,
        }
    }
}

/// Sizes seen while validating, next to what the recipe claimed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObservedStats {
    pub claimed: ChunkStats,
    pub payload_size: u64,
    pub reconstructed_size: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub unit: String,
    pub chunk_id: Option<u64>,
    pub original_hash: Option<String>,
    pub reconstructed_hash: Option<String>,
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Only set when the unit could not be loaded or decoded at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ObservedStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ValidationResult {
    pub(crate) fn errored(unit: String, err: &RecastError) -> Self {
        Self {
            unit,
            chunk_id: None,
            original_hash: None,
            reconstructed_hash: None,
            is_valid: false,
            failure: Some(FailureKind::of(err)),
            error: Some(err.to_string()),
            stats: None,
            category: None,
        }
    }
}
