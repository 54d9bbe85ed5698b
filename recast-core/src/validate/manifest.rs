use std::fs::File;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::hash::{HashAlgorithm, digest_reader, same_digest};
use crate::manifest::{Manifest, ManifestEntry, safe_join};
use crate::stats::success_rate;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryStatus {
    Ok,
    HashMismatch { expected: String, actual: String },
    SizeMismatch { expected: u64, actual: u64 },
    FileNotFound,
    InvalidPath,
    Unreadable { error: String },
}

impl EntryStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, EntryStatus::Ok)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryCheck {
    pub path: String,
    #[serde(flatten)]
    pub status: EntryStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestReport {
    pub algorithm: HashAlgorithm,
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    /// Subset of `failed` whose file was absent.
    pub missing: u64,
    pub success_rate: f64,
    pub entries: Vec<EntryCheck>,
}

impl ManifestReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

fn check_entry(root: &Path, entry: &ManifestEntry, algorithm: HashAlgorithm) -> EntryStatus {
    let Ok(path) = safe_join(root, &entry.path) else {
        return EntryStatus::InvalidPath;
    };
    if !path.is_file() {
        return EntryStatus::FileNotFound;
    }
    let (actual, size) = match File::open(&path)
        .map_err(Into::into)
        .and_then(|f| digest_reader(f, algorithm))
    {
        Ok(v) => v,
        Err(e) => {
            return EntryStatus::Unreadable {
                error: e.to_string(),
            };
        }
    };
    if !same_digest(&actual, &entry.hash) {
        return EntryStatus::HashMismatch {
            expected: entry.hash.clone(),
            actual,
        };
    }
    if size != entry.size {
        return EntryStatus::SizeMismatch {
            expected: entry.size,
            actual: size,
        };
    }
    EntryStatus::Ok
}

/// Replay `manifest` against the files under `root`.
pub fn validate_against_manifest(manifest: &Manifest, root: &Path) -> ManifestReport {
    let entries: Vec<EntryCheck> = manifest
        .entries
        .par_iter()
        .map(|e| EntryCheck {
            path: e.path.clone(),
            status: check_entry(root, e, manifest.algorithm),
        })
        .collect();

    let total = entries.len() as u64;
    let passed = entries.iter().filter(|c| c.status.is_ok()).count() as u64;
    let missing = entries
        .iter()
        .filter(|c| c.status == EntryStatus::FileNotFound)
        .count() as u64;
    for c in entries.iter().filter(|c| !c.status.is_ok()) {
        tracing::warn!(target: "recast::manifest", path = %c.path, status = ?c.status, "manifest entry failed");
    }
    tracing::info!(target: "recast::manifest", total, passed, missing, "manifest checked");

    ManifestReport {
        algorithm: manifest.algorithm,
        total,
        passed,
        failed: total - passed,
        missing,
        success_rate: success_rate(passed, total),
        entries,
    }
}
