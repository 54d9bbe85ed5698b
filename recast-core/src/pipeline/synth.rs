use std::fmt;
use std::str::FromStr;

use image::{DynamicImage, ImageBuffer, Rgb};
use serde::{Deserialize, Serialize};

use crate::error::{RecastError, Result};
use crate::recipe::ContainerFormat;
use crate::reconstruct::image::encode_container;

/// Kind of test artifact the harness can generate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// `byte[i] = i mod 256`
    Pattern,
    Text,
    Random,
    /// A PNG whose decoded size is roughly the requested size.
    Image,
}

impl ArtifactKind {
    pub fn name(self) -> &'static str {
        match self {
            ArtifactKind::Pattern => "pattern",
            ArtifactKind::Text => "text",
            ArtifactKind::Random => "random",
            ArtifactKind::Image => "image",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ArtifactKind {
    type Err = RecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pattern" => Ok(ArtifactKind::Pattern),
            "text" => Ok(ArtifactKind::Text),
            "random" => Ok(ArtifactKind::Random),
            "image" => Ok(ArtifactKind::Image),
            other => Err(RecastError::Format(format!("unknown artifact kind: {other}"))),
        }
    }
}

const PROSE: &str = "Every chunk carries a recipe. The recipe names the method, the \
offset and the digest of the bytes it stands for. Nothing is trusted until it has \
been decoded and hashed again.\n";

pub fn synthesize(kind: ArtifactKind, size: usize) -> Result<Vec<u8>> {
    match kind {
        ArtifactKind::Pattern => Ok((0..size).map(|i| (i % 256) as u8).collect()),
        ArtifactKind::Text => Ok(PROSE.bytes().cycle().take(size).collect()),
        ArtifactKind::Random => {
            let mut buf = vec![0u8; size];
            getrandom::getrandom(&mut buf)
                .map_err(|e| RecastError::Format(format!("random source: {e}")))?;
            Ok(buf)
        }
        ArtifactKind::Image => {
            let side = ((size / 3) as f64).sqrt().max(1.0) as u32;
            let img = DynamicImage::ImageRgb8(ImageBuffer::from_fn(side, side, |x, y| {
                Rgb([(x * 3) as u8, (y * 5) as u8, ((x ^ y) & 0xff) as u8])
            }));
            encode_container(&img, ContainerFormat::Png)
        }
    }
}
