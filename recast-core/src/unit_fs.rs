use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Component, RecastError, Result};
use crate::recipe::{Recipe, RecipeFormat};
use crate::unit::{ChunkSource, ChunkStore, StoreParams};

pub const PAYLOAD_FILE: &str = "payload.bin";
pub const RECIPE_JSON: &str = "recipe.json";
pub const RECIPE_CBOR: &str = "recipe.cbor";

/// A unit laid out as a directory holding `payload.bin` and `recipe.json`
/// (or `recipe.cbor`).
#[derive(Clone, Debug)]
pub struct FsChunk {
    dir: PathBuf,
}

impl FsChunk {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn recipe_path(&self) -> Option<PathBuf> {
        [RECIPE_JSON, RECIPE_CBOR]
            .iter()
            .map(|name| self.dir.join(name))
            .find(|p| p.is_file())
    }

    fn missing(&self, component: Component) -> RecastError {
        RecastError::MissingComponent {
            unit: self.label(),
            component,
        }
    }
}

impl ChunkSource for FsChunk {
    fn label(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.dir.display().to_string())
    }

    fn load_payload(&self) -> Result<Vec<u8>> {
        let p = self.dir.join(PAYLOAD_FILE);
        if !p.is_file() {
            return Err(self.missing(Component::Payload));
        }
        Ok(fs::read(p)?)
    }

    fn load_recipe(&self) -> Result<Recipe> {
        let p = self
            .recipe_path()
            .ok_or_else(|| self.missing(Component::Recipe))?;
        let bytes = fs::read(&p)?;
        Recipe::parse(&bytes, RecipeFormat::from_path(&p))
    }
}

fn looks_like_unit(dir: &Path) -> bool {
    [PAYLOAD_FILE, RECIPE_JSON, RECIPE_CBOR]
        .iter()
        .any(|name| dir.join(name).is_file())
}

/// Directory of unit directories.
pub struct FsChunkStore {
    params: StoreParams,
}

impl FsChunkStore {
    pub fn new(params: StoreParams) -> Result<Self> {
        fs::create_dir_all(&params.root)?;
        Ok(Self { params })
    }

    pub fn open(params: StoreParams) -> Result<Self> {
        if !params.root.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("chunk store not found: {}", params.root.display()),
            )
            .into());
        }
        Ok(Self { params })
    }

    pub fn root(&self) -> &Path {
        &self.params.root
    }
}

impl ChunkStore for FsChunkStore {
    fn units(&self) -> Result<Vec<Box<dyn ChunkSource>>> {
        let mut out: Vec<Box<dyn ChunkSource>> = Vec::new();
        // sorted only so reports read the same run to run
        for e in WalkDir::new(&self.params.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let e = e.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            if !e.file_type().is_dir() {
                continue;
            }
            if looks_like_unit(e.path()) {
                out.push(Box::new(FsChunk::new(e.path())));
            } else {
                tracing::debug!(target: "recast::store", dir = %e.path().display(), "skipping non-unit directory");
            }
        }
        Ok(out)
    }

    fn put_unit(&mut self, payload: &[u8], recipe: &Recipe) -> Result<String> {
        let dir = write_unit(&self.params.root, payload, recipe, self.params.recipe_format)?;
        Ok(FsChunk::new(dir).label())
    }
}

/// Lay out one unit under `root` as `chunk_<id>/`.
pub fn write_unit(
    root: &Path,
    payload: &[u8],
    recipe: &Recipe,
    format: RecipeFormat,
) -> Result<PathBuf> {
    let dir = root.join(format!("chunk_{:06}", recipe.chunk_id));
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(PAYLOAD_FILE), payload)?;
    let name = match format {
        RecipeFormat::Json => RECIPE_JSON,
        RecipeFormat::Cbor => RECIPE_CBOR,
    };
    fs::write(dir.join(name), recipe.to_bytes(format)?)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashAlgorithm;
    use crate::recipe::Reconstruction;

    fn recipe(id: u64) -> Recipe {
        Recipe::describe(id, id * 10, b"0123456789", 10, Reconstruction::Store, HashAlgorithm::Sha256)
    }

    #[test]
    fn write_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = FsChunkStore::new(StoreParams::new(tmp.path())).unwrap();
        let label = store.put_unit(b"0123456789", &recipe(2)).unwrap();
        assert_eq!(label, "chunk_000002");

        let units = store.units().unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].load_payload().unwrap(), b"0123456789");
        assert_eq!(units[0].load_recipe().unwrap().offset, 20);
    }

    #[test]
    fn cbor_recipes_are_found() {
        let tmp = tempfile::tempdir().unwrap();
        let params = StoreParams {
            root: tmp.path().to_path_buf(),
            recipe_format: RecipeFormat::Cbor,
        };
        let mut store = FsChunkStore::new(params).unwrap();
        store.put_unit(b"0123456789", &recipe(5)).unwrap();
        let units = store.units().unwrap();
        assert!(tmp.path().join("chunk_000005").join(RECIPE_CBOR).is_file());
        assert_eq!(units[0].load_recipe().unwrap().chunk_id, 5);
    }

    #[test]
    fn missing_halves_are_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("chunk_x");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(PAYLOAD_FILE), b"abc").unwrap();
        let unit = FsChunk::new(&dir);
        assert!(unit.load_payload().is_ok());
        let err = unit.load_recipe().unwrap_err();
        assert!(matches!(
            err,
            RecastError::MissingComponent { component: Component::Recipe, ref unit } if unit == "chunk_x"
        ));
    }

    #[test]
    fn unrelated_directories_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("notes")).unwrap();
        fs::write(tmp.path().join("README"), b"hi").unwrap();
        let store = FsChunkStore::open(StoreParams::new(tmp.path())).unwrap();
        assert!(store.units().unwrap().is_empty());
    }
}
