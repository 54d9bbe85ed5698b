//! Chunk recipes: the self-describing record that lets one payload be
//! decoded back to its original bytes and checked.
//!
//! Recipes are parsed in two steps. The document is first read with the
//! reconstruction block kept as a raw `method` tag plus parameter map; the
//! tag is then resolved against the known methods and the parameters are
//! bound to that method's typed struct. An unknown tag therefore surfaces as
//! [`RecastError::UnknownReconstructionMethod`] while the recipe is loaded,
//! never halfway through a decode.

use std::path::Path;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{RecastError, Result};
use crate::hash::{HashAlgorithm, digest};
use crate::util::hex::normalize_digest;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkStats {
    pub original_size: u64,
    pub compressed_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage_saved: Option<f64>,
}

impl ChunkStats {
    pub fn measure(original_size: u64, compressed_size: u64) -> Self {
        let ratio = if compressed_size == 0 {
            None
        } else {
            Some(original_size as f64 / compressed_size as f64)
        };
        let percentage_saved = if original_size == 0 {
            None
        } else {
            Some((1.0 - compressed_size as f64 / original_size as f64) * 100.0)
        };
        Self {
            original_size,
            compressed_size,
            ratio,
            percentage_saved,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    #[serde(rename = "uint8")]
    U8,
    #[serde(rename = "uint16")]
    U16,
}

impl ElementType {
    pub fn width(self) -> usize {
        match self {
            ElementType::U8 => 1,
            ElementType::U16 => 2,
        }
    }
}

/// Output container an image reconstruction re-serializes into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Png,
    Bmp,
    Tiff,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageParams {
    /// `[height, width]` or `[height, width, channels]`.
    pub shape: Vec<u32>,
    pub dtype: ElementType,
    pub format: ContainerFormat,
}

impl ImageParams {
    /// (height, width, channels)
    pub fn dims(&self) -> Result<(u32, u32, u8)> {
        let (h, w, c) = match self.shape.as_slice() {
            [h, w] => (*h, *w, 1),
            [h, w, c] => (*h, *w, *c),
            other => {
                return Err(RecastError::InvalidRecipe(format!(
                    "image shape must have 2 or 3 dimensions, got {}",
                    other.len()
                )));
            }
        };
        if h == 0 || w == 0 {
            return Err(RecastError::InvalidRecipe(format!(
                "image shape has a zero dimension: {:?}",
                self.shape
            )));
        }
        if !(1..=4).contains(&c) {
            return Err(RecastError::InvalidRecipe(format!(
                "image channels must be 1..=4, got {c}"
            )));
        }
        Ok((h, w, c as u8))
    }

    /// Length in bytes of the flat buffer this shape describes.
    pub fn buffer_len(&self) -> Result<usize> {
        let (h, w, c) = self.dims()?;
        (h as usize)
            .checked_mul(w as usize)
            .and_then(|n| n.checked_mul(c as usize))
            .and_then(|n| n.checked_mul(self.dtype.width()))
            .ok_or_else(|| RecastError::InvalidRecipe("image shape overflows".into()))
    }
}

/// Method tag without parameters; the dispatcher's registry key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Store,
    Zstd,
    Image,
}

impl Method {
    pub fn name(self) -> &'static str {
        match self {
            Method::Store => "store",
            Method::Zstd => "zstd",
            Method::Image => "image",
        }
    }

    pub fn from_name(tag: &str) -> Option<Method> {
        match tag {
            "store" | "identity" => Some(Method::Store),
            "zstd" => Some(Method::Zstd),
            "image" => Some(Method::Image),
            _ => None,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Method {
    type Err = RecastError;

    fn from_str(s: &str) -> Result<Self> {
        Method::from_name(&s.to_ascii_lowercase())
            .ok_or_else(|| RecastError::UnknownReconstructionMethod(s.to_string()))
    }
}

/// How a payload turns back into original bytes. Each variant carries
/// exactly what its decoder needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Reconstruction {
    Store,
    Zstd,
    Image(ImageParams),
}

impl Reconstruction {
    pub fn method(&self) -> Method {
        match self {
            Reconstruction::Store => Method::Store,
            Reconstruction::Zstd => Method::Zstd,
            Reconstruction::Image(_) => Method::Image,
        }
    }

    fn from_raw(raw: RawReconstruction) -> Result<Self> {
        let method: Method = raw.method.parse()?;
        match method {
            Method::Store => Ok(Reconstruction::Store),
            Method::Zstd => Ok(Reconstruction::Zstd),
            Method::Image => {
                let params: ImageParams =
                    serde_json::from_value(serde_json::Value::Object(raw.params)).map_err(|e| {
                        RecastError::InvalidRecipe(format!("image parameters: {e}"))
                    })?;
                params.dims()?;
                Ok(Reconstruction::Image(params))
            }
        }
    }
}

#[derive(Deserialize)]
struct RawReconstruction {
    method: String,
    #[serde(flatten)]
    params: serde_json::Map<String, serde_json::Value>,
}

/// Wire shape of a recipe. Unknown fields are ignored.
#[derive(Deserialize)]
struct RecipeDoc {
    chunk_id: u64,
    offset: u64,
    original_hash: String,
    #[serde(default)]
    hash_algorithm: HashAlgorithm,
    #[serde(default)]
    compression_method: String,
    reconstruction: RawReconstruction,
    stats: ChunkStats,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    worker: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecipeDoc")]
pub struct Recipe {
    pub chunk_id: u64,
    pub offset: u64,
    pub original_hash: String,
    pub hash_algorithm: HashAlgorithm,
    pub compression_method: String,
    pub reconstruction: Reconstruction,
    pub stats: ChunkStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl TryFrom<RecipeDoc> for Recipe {
    type Error = RecastError;

    fn try_from(doc: RecipeDoc) -> Result<Self> {
        let reconstruction = Reconstruction::from_raw(doc.reconstruction)?;
        let original_hash = normalize_digest(&doc.original_hash, doc.hash_algorithm)?;
        Ok(Recipe {
            chunk_id: doc.chunk_id,
            offset: doc.offset,
            original_hash,
            hash_algorithm: doc.hash_algorithm,
            compression_method: doc.compression_method,
            reconstruction,
            stats: doc.stats,
            created_at: doc.created_at,
            worker: doc.worker,
            content_type: doc.content_type,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecipeFormat {
    Json,
    Cbor,
}

impl RecipeFormat {
    pub fn from_path(path: &Path) -> RecipeFormat {
        match path.extension().and_then(|e| e.to_str()) {
            Some("cbor") => RecipeFormat::Cbor,
            _ => RecipeFormat::Json,
        }
    }
}

impl Recipe {
    /// Describe `original` as produced by `reconstruction` into a payload of
    /// `payload_len` bytes. Used by producers, never by validation.
    pub fn describe(
        chunk_id: u64,
        offset: u64,
        original: &[u8],
        payload_len: u64,
        reconstruction: Reconstruction,
        algorithm: HashAlgorithm,
    ) -> Self {
        Recipe {
            chunk_id,
            offset,
            original_hash: digest(original, algorithm),
            hash_algorithm: algorithm,
            compression_method: reconstruction.method().name().to_string(),
            reconstruction,
            stats: ChunkStats::measure(original.len() as u64, payload_len),
            created_at: OffsetDateTime::now_utc().format(&Rfc3339).ok(),
            worker: None,
            content_type: None,
        }
    }

    pub fn with_worker(mut self, worker: impl Into<String>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn parse(bytes: &[u8], format: RecipeFormat) -> Result<Self> {
        let doc: RecipeDoc = match format {
            RecipeFormat::Json => serde_json::from_slice(bytes)
                .map_err(|e| RecastError::InvalidRecipe(format!("recipe json: {e}")))?,
            RecipeFormat::Cbor => ciborium::de::from_reader(bytes)
                .map_err(|e| RecastError::InvalidRecipe(format!("recipe cbor: {e}")))?,
        };
        Recipe::try_from(doc)
    }

    pub fn to_bytes(&self, format: RecipeFormat) -> Result<Vec<u8>> {
        match format {
            RecipeFormat::Json => serde_json::to_vec_pretty(self)
                .map_err(|e| RecastError::Format(format!("recipe encode: {e}"))),
            RecipeFormat::Cbor => {
                let mut buf = Vec::new();
                ciborium::ser::into_writer(self, &mut buf)
                    .map_err(|e| RecastError::Format(format!("recipe encode: {e}")))?;
                Ok(buf)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json(method_block: &str) -> String {
        format!(
            r#"{{
                "chunk_id": 7,
                "offset": 700,
                "original_hash": "{}",
                "compression_method": "zstd-3",
                "reconstruction": {method_block},
                "stats": {{"original_size": 100, "compressed_size": 20, "ratio": 5.0}},
                "created_at": "2026-01-01T00:00:00Z",
                "worker": "node-4",
                "some_future_field": {{"nested": true}}
            }}"#,
            "AB".repeat(32)
        )
    }

    #[test]
    fn parses_generic_recipe_and_ignores_unknown_fields() {
        let r = Recipe::parse(sample_json(r#"{"method": "zstd"}"#).as_bytes(), RecipeFormat::Json)
            .unwrap();
        assert_eq!(r.chunk_id, 7);
        assert_eq!(r.offset, 700);
        assert_eq!(r.reconstruction, Reconstruction::Zstd);
        assert_eq!(r.hash_algorithm, HashAlgorithm::Sha256);
        assert_eq!(r.original_hash, "ab".repeat(32));
        assert_eq!(r.worker.as_deref(), Some("node-4"));
    }

    #[test]
    fn parses_image_recipe() {
        let block = r#"{"method": "image", "shape": [4, 3, 3], "dtype": "uint8", "format": "png"}"#;
        let r = Recipe::parse(sample_json(block).as_bytes(), RecipeFormat::Json).unwrap();
        match &r.reconstruction {
            Reconstruction::Image(p) => {
                assert_eq!(p.dims().unwrap(), (4, 3, 3));
                assert_eq!(p.buffer_len().unwrap(), 36);
                assert_eq!(p.format, ContainerFormat::Png);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_method_is_reported_at_load() {
        let err = Recipe::parse(
            sample_json(r#"{"method": "lzma-magic"}"#).as_bytes(),
            RecipeFormat::Json,
        )
        .unwrap_err();
        assert!(matches!(err, RecastError::UnknownReconstructionMethod(ref m) if m == "lzma-magic"));
    }

    #[test]
    fn method_tags_ignore_case() {
        let r = Recipe::parse(sample_json(r#"{"method": "ZSTD"}"#).as_bytes(), RecipeFormat::Json)
            .unwrap();
        assert_eq!(r.reconstruction, Reconstruction::Zstd);
        assert_eq!("Store".parse::<Method>().unwrap(), Method::Store);
    }

    #[test]
    fn image_without_shape_is_invalid() {
        let block = r#"{"method": "image", "dtype": "uint8", "format": "png"}"#;
        let err = Recipe::parse(sample_json(block).as_bytes(), RecipeFormat::Json).unwrap_err();
        assert!(matches!(err, RecastError::InvalidRecipe(_)));
    }

    #[test]
    fn missing_required_field_is_fatal() {
        let json = r#"{"chunk_id": 1, "original_hash": "00", "reconstruction": {"method": "store"},
                       "stats": {"original_size": 1, "compressed_size": 1}}"#;
        let err = Recipe::parse(json.as_bytes(), RecipeFormat::Json).unwrap_err();
        assert!(matches!(err, RecastError::InvalidRecipe(ref m) if m.contains("offset")));
    }

    #[test]
    fn json_and_cbor_agree() {
        let r = Recipe::describe(
            3,
            300,
            b"payload",
            7,
            Reconstruction::Image(ImageParams {
                shape: vec![1, 7],
                dtype: ElementType::U8,
                format: ContainerFormat::Bmp,
            }),
            HashAlgorithm::Blake3,
        )
        .with_content_type("image");
        let from_json =
            Recipe::parse(&r.to_bytes(RecipeFormat::Json).unwrap(), RecipeFormat::Json).unwrap();
        let from_cbor =
            Recipe::parse(&r.to_bytes(RecipeFormat::Cbor).unwrap(), RecipeFormat::Cbor).unwrap();
        assert_eq!(from_json, r);
        assert_eq!(from_cbor, r);
    }

    #[test]
    fn stats_measure_handles_zero() {
        let s = ChunkStats::measure(0, 0);
        assert_eq!(s.ratio, None);
        assert_eq!(s.percentage_saved, None);
        let s = ChunkStats::measure(100, 25);
        assert_eq!(s.ratio, Some(4.0));
        assert_eq!(s.percentage_saved, Some(75.0));
    }
}
