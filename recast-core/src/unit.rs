use std::path::PathBuf;

use crate::error::Result;
use crate::recipe::{Recipe, RecipeFormat};

/// One self-describing chunk unit: a payload and its recipe.
pub trait ChunkSource: Send + Sync {
    /// Address of the unit (directory name, store key). Never used for ordering.
    fn label(&self) -> String;

    fn load_payload(&self) -> Result<Vec<u8>>;

    fn load_recipe(&self) -> Result<Recipe>;
}

/// A collection of chunk units.
pub trait ChunkStore: Send + Sync {
    /// Every unit in the store. Enumeration order carries no meaning.
    fn units(&self) -> Result<Vec<Box<dyn ChunkSource>>>;

    /// Add a unit and return its label.
    fn put_unit(&mut self, payload: &[u8], recipe: &Recipe) -> Result<String>;
}

#[derive(Clone, Debug)]
pub struct StoreParams {
    pub root: PathBuf,
    pub recipe_format: RecipeFormat,
}

impl StoreParams {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recipe_format: RecipeFormat::Json,
        }
    }
}
