use crate::error::{Component, RecastError, Result};
use crate::recipe::{Recipe, RecipeFormat};
use crate::unit::{ChunkSource, ChunkStore};

/// In-memory unit. The recipe is kept encoded so loading goes through the
/// same parser as on-disk units.
#[derive(Clone, Debug)]
pub struct MemChunk {
    label: String,
    payload: Option<Vec<u8>>,
    recipe: Option<Vec<u8>>,
    format: RecipeFormat,
}

impl MemChunk {
    pub fn new(label: impl Into<String>, payload: Vec<u8>, recipe: &Recipe) -> Result<Self> {
        Ok(Self {
            label: label.into(),
            payload: Some(payload),
            recipe: Some(recipe.to_bytes(RecipeFormat::Json)?),
            format: RecipeFormat::Json,
        })
    }

    /// A unit from raw parts; either half may be absent.
    pub fn from_parts(
        label: impl Into<String>,
        payload: Option<Vec<u8>>,
        recipe: Option<Vec<u8>>,
        format: RecipeFormat,
    ) -> Self {
        Self {
            label: label.into(),
            payload,
            recipe,
            format,
        }
    }

    pub fn payload_mut(&mut self) -> Option<&mut Vec<u8>> {
        self.payload.as_mut()
    }
}

impl ChunkSource for MemChunk {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn load_payload(&self) -> Result<Vec<u8>> {
        self.payload
            .clone()
            .ok_or_else(|| RecastError::MissingComponent {
                unit: self.label.clone(),
                component: Component::Payload,
            })
    }

    fn load_recipe(&self) -> Result<Recipe> {
        let bytes = self
            .recipe
            .as_ref()
            .ok_or_else(|| RecastError::MissingComponent {
                unit: self.label.clone(),
                component: Component::Recipe,
            })?;
        Recipe::parse(bytes, self.format)
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemChunkStore {
    units: Vec<MemChunk>,
}

impl MemChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, unit: MemChunk) {
        self.units.push(unit);
    }

    pub fn get_mut(&mut self, label: &str) -> Option<&mut MemChunk> {
        self.units.iter_mut().find(|u| u.label == label)
    }
}

impl ChunkStore for MemChunkStore {
    fn units(&self) -> Result<Vec<Box<dyn ChunkSource>>> {
        Ok(self
            .units
            .iter()
            .cloned()
            .map(|u| Box::new(u) as Box<dyn ChunkSource>)
            .collect())
    }

    fn put_unit(&mut self, payload: &[u8], recipe: &Recipe) -> Result<String> {
        let label = format!("chunk_{:06}", recipe.chunk_id);
        self.units
            .push(MemChunk::new(label.clone(), payload.to_vec(), recipe)?);
        Ok(label)
    }
}
