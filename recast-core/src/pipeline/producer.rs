//! Chunk producers for the harness.
//!
//! A producer turns one chunk of the artifact into a unit directory under a
//! store root. The in-process producer stands in for a real compression
//! worker; [`ExternalProducer`] hands the chunk to another program.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::ImageFormat;

use super::chunker::Chunk;
use crate::codec::{CodecId, compressor_for};
use crate::error::{RecastError, Result};
use crate::hash::HashAlgorithm;
use crate::recipe::{ContainerFormat, ImageParams, Method, Recipe, RecipeFormat, Reconstruction};
use crate::reconstruct::image::flatten;
use crate::unit_fs::write_unit;

pub trait Producer: Send + Sync {
    fn name(&self) -> String;

    /// Write the unit for `chunk` under `root` and return its directory.
    fn produce(&self, chunk: &Chunk<'_>, root: &Path) -> Result<PathBuf>;
}

#[derive(Clone, Debug)]
pub struct SimulatedProducer {
    pub method: Method,
    pub level: i32,
    pub algorithm: HashAlgorithm,
    pub recipe_format: RecipeFormat,
    pub content_type: Option<String>,
}

impl SimulatedProducer {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            level: 3,
            algorithm: HashAlgorithm::default(),
            recipe_format: RecipeFormat::Json,
            content_type: None,
        }
    }

    fn encode(&self, data: &[u8]) -> Result<(Vec<u8>, Reconstruction)> {
        match self.method {
            Method::Store => Ok((data.to_vec(), Reconstruction::Store)),
            Method::Zstd => Ok((
                compressor_for(CodecId::Zstd).compress_bytes(data, self.level)?,
                Reconstruction::Zstd,
            )),
            Method::Image => self.encode_image(data),
        }
    }

    fn encode_image(&self, data: &[u8]) -> Result<(Vec<u8>, Reconstruction)> {
        let format = match image::guess_format(data) {
            Ok(ImageFormat::Png) => ContainerFormat::Png,
            Ok(ImageFormat::Bmp) => ContainerFormat::Bmp,
            Ok(ImageFormat::Tiff) => ContainerFormat::Tiff,
            Ok(other) => {
                return Err(RecastError::Format(format!("unsupported container {other:?}")));
            }
            Err(e) => return Err(RecastError::Format(format!("not an image: {e}"))),
        };
        let img = image::load_from_memory(data)
            .map_err(|e| RecastError::Format(format!("image load: {e}")))?;
        let (raw, shape, dtype) = flatten(&img)?;
        let payload = compressor_for(CodecId::Zstd).compress_bytes(&raw, self.level)?;
        Ok((
            payload,
            Reconstruction::Image(ImageParams {
                shape,
                dtype,
                format,
            }),
        ))
    }
}

impl Producer for SimulatedProducer {
    fn name(&self) -> String {
        format!("simulated:{}", self.method)
    }

    fn produce(&self, chunk: &Chunk<'_>, root: &Path) -> Result<PathBuf> {
        let (payload, reconstruction) = self.encode(chunk.data)?;
        let mut recipe = Recipe::describe(
            chunk.chunk_id,
            chunk.offset,
            chunk.data,
            payload.len() as u64,
            reconstruction,
            self.algorithm,
        )
        .with_worker("recast-harness");
        if self.method == Method::Zstd {
            recipe.compression_method = format!("zstd-{}", self.level);
        }
        if let Some(ct) = &self.content_type {
            recipe = recipe.with_content_type(ct.clone());
        }
        write_unit(root, &payload, &recipe, self.recipe_format)
    }
}

/// Runs `<program> [args..] <chunk-input-file> <unit-dir> <chunk_id> <offset>`
/// once per chunk. The program must leave a payload and a recipe in
/// `<unit-dir>`; whatever it writes is validated like any other unit.
#[derive(Clone, Debug)]
pub struct ExternalProducer {
    program: String,
    args: Vec<String>,
}

impl ExternalProducer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a whitespace-separated command line.
    pub fn from_command_line(cmd: &str) -> Result<Self> {
        let mut parts = cmd.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| RecastError::Producer("empty producer command".into()))?;
        Ok(Self::new(program, parts.collect()))
    }
}

impl Producer for ExternalProducer {
    fn name(&self) -> String {
        format!("external:{}", self.program)
    }

    fn produce(&self, chunk: &Chunk<'_>, root: &Path) -> Result<PathBuf> {
        let unit_dir = root.join(format!("chunk_{:06}", chunk.chunk_id));
        fs::create_dir_all(&unit_dir)?;
        let mut input = tempfile::NamedTempFile::new()?;
        input.write_all(chunk.data)?;
        input.flush()?;

        tracing::debug!(
            target: "recast::pipeline",
            program = %self.program,
            chunk_id = chunk.chunk_id,
            "running external producer"
        );
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(input.path())
            .arg(&unit_dir)
            .arg(chunk.chunk_id.to_string())
            .arg(chunk.offset.to_string())
            .output()
            .map_err(|e| RecastError::Producer(format!("spawn {}: {e}", self.program)))?;
        if !output.status.success() {
            return Err(RecastError::Producer(format!(
                "{} exited with {} for chunk {}: {}",
                self.program,
                output.status,
                chunk.chunk_id,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(unit_dir)
    }
}
