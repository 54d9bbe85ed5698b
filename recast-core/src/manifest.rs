//! Whole-file integrity ledger: a list of files with their sizes and
//! digests, taken once over a known-good directory and replayed later
//! against a candidate one (see `validate::manifest`).

use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use walkdir::WalkDir;

use crate::error::{RecastError, Result};
use crate::hash::{HashAlgorithm, digest_reader};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    /// Relative to the manifest root, `/`-separated.
    pub path: String,
    pub name: String,
    pub size: u64,
    pub hash: String,
    /// Seconds since the Unix epoch.
    #[serde(default)]
    pub modified: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Manifest {
    pub algorithm: HashAlgorithm,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    pub entries: Vec<ManifestEntry>,
}

fn mtime_from(md: &fs::Metadata) -> i64 {
    md.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn rel_string(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a manifest path onto `root`, refusing anything that could escape it.
pub fn safe_join(root: &Path, rel: &str) -> Result<PathBuf> {
    let p = Path::new(rel);
    let escapes = p.is_absolute()
        || p.components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir))
        || (cfg!(windows) && rel.contains("..\\"));
    if escapes || rel.is_empty() {
        return Err(RecastError::UnsafePath(p.to_path_buf()));
    }
    Ok(root.join(p))
}

impl Manifest {
    /// Hash every regular file under `root`.
    pub fn generate(root: &Path, algorithm: HashAlgorithm) -> Result<Manifest> {
        let mut entries = Vec::new();
        for e in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let e = e.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            if !e.file_type().is_file() {
                continue;
            }
            let md = e.metadata().map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            let (hash, size) = digest_reader(File::open(e.path())?, algorithm)?;
            entries.push(ManifestEntry {
                path: rel_string(e.path(), root),
                name: e.file_name().to_string_lossy().to_string(),
                size,
                hash,
                modified: mtime_from(&md),
            });
        }
        tracing::info!(target: "recast::manifest", root = %root.display(), files = entries.len(), %algorithm, "manifest generated");
        Ok(Manifest {
            algorithm,
            created: OffsetDateTime::now_utc().format(&Rfc3339).ok(),
            entries,
        })
    }

    pub fn load(path: &Path) -> Result<Manifest> {
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| RecastError::Format(format!("manifest decode: {e}")))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| RecastError::Format(format!("manifest encode: {e}")))?;
        fs::write(path, bytes)?;
        Ok(())
    }
}
