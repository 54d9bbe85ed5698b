//! Structured image codec.
//!
//! The payload is a zstd-compressed flat pixel buffer laid out row-major
//! as `height x width x channels`, 16-bit samples little-endian. Decoding
//! reinflates the buffer, rebuilds the pixel grid and writes it out in the
//! container format named by the recipe.

use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, LumaA, Rgb, Rgba};

use super::{MAX_DECODED_BYTES, Reconstructor, wrong_params};
use crate::codec::{CodecId, compressor_for};
use crate::error::{RecastError, Result};
use crate::recipe::{ContainerFormat, ElementType, ImageParams, Method, Reconstruction};

pub struct ImageDecoder;

impl Reconstructor for ImageDecoder {
    fn method(&self) -> Method {
        Method::Image
    }

    // the pixel buffer is bounded by its shape; `limit` speaks for the
    // re-encoded container, whose size the shape does not determine
    fn reconstruct(&self, payload: &[u8], params: &Reconstruction, _limit: u64) -> Result<Vec<u8>> {
        let Reconstruction::Image(p) = params else {
            return Err(wrong_params(Method::Image, params));
        };
        let expected = p.buffer_len()?;
        if expected as u64 > MAX_DECODED_BYTES {
            return Err(RecastError::InvalidRecipe(format!(
                "image shape {:?} of {:?} needs {expected} bytes, more than {MAX_DECODED_BYTES}",
                p.shape, p.dtype
            )));
        }
        let raw = compressor_for(CodecId::Zstd).decompress_bytes(payload, expected as u64 + 1)?;
        if raw.len() != expected {
            return Err(RecastError::Decode(format!(
                "pixel buffer holds {} bytes, shape {:?} of {:?} needs {expected}",
                raw.len(),
                p.shape,
                p.dtype
            )));
        }
        let img = unflatten(raw, p)?;
        encode_container(&img, p.format)
    }
}

fn image_format(format: ContainerFormat) -> ImageFormat {
    match format {
        ContainerFormat::Png => ImageFormat::Png,
        ContainerFormat::Bmp => ImageFormat::Bmp,
        ContainerFormat::Tiff => ImageFormat::Tiff,
    }
}

/// Serialize `img` into `format`.
pub fn encode_container(img: &DynamicImage, format: ContainerFormat) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image_format(format))
        .map_err(|e| RecastError::Decode(format!("{format:?} encode: {e}")))?;
    Ok(out.into_inner())
}

fn unflatten(raw: Vec<u8>, p: &ImageParams) -> Result<DynamicImage> {
    let (h, w, c) = p.dims()?;
    let img = match p.dtype {
        ElementType::U8 => match c {
            1 => ImageBuffer::<Luma<u8>, _>::from_raw(w, h, raw).map(DynamicImage::ImageLuma8),
            2 => ImageBuffer::<LumaA<u8>, _>::from_raw(w, h, raw).map(DynamicImage::ImageLumaA8),
            3 => ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, raw).map(DynamicImage::ImageRgb8),
            _ => ImageBuffer::<Rgba<u8>, _>::from_raw(w, h, raw).map(DynamicImage::ImageRgba8),
        },
        ElementType::U16 => {
            let px: Vec<u16> = raw
                .chunks_exact(2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]))
                .collect();
            match c {
                1 => ImageBuffer::<Luma<u16>, _>::from_raw(w, h, px).map(DynamicImage::ImageLuma16),
                2 => {
                    ImageBuffer::<LumaA<u16>, _>::from_raw(w, h, px).map(DynamicImage::ImageLumaA16)
                }
                3 => ImageBuffer::<Rgb<u16>, _>::from_raw(w, h, px).map(DynamicImage::ImageRgb16),
                _ => ImageBuffer::<Rgba<u16>, _>::from_raw(w, h, px).map(DynamicImage::ImageRgba16),
            }
        }
    };
    img.ok_or_else(|| RecastError::Decode(format!("buffer does not fit shape {:?}", p.shape)))
}

/// Inverse of the decoder's reshaping step: flatten a decoded image into a
/// raw buffer plus the shape and element type needed to rebuild it.
pub fn flatten(img: &DynamicImage) -> Result<(Vec<u8>, Vec<u32>, ElementType)> {
    let (w, h) = (img.width(), img.height());
    fn le(px: &[u16]) -> Vec<u8> {
        px.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
    let (raw, c, dtype) = match img {
        DynamicImage::ImageLuma8(b) => (b.as_raw().clone(), 1, ElementType::U8),
        DynamicImage::ImageLumaA8(b) => (b.as_raw().clone(), 2, ElementType::U8),
        DynamicImage::ImageRgb8(b) => (b.as_raw().clone(), 3, ElementType::U8),
        DynamicImage::ImageRgba8(b) => (b.as_raw().clone(), 4, ElementType::U8),
        DynamicImage::ImageLuma16(b) => (le(b.as_raw()), 1, ElementType::U16),
        DynamicImage::ImageLumaA16(b) => (le(b.as_raw()), 2, ElementType::U16),
        DynamicImage::ImageRgb16(b) => (le(b.as_raw()), 3, ElementType::U16),
        DynamicImage::ImageRgba16(b) => (le(b.as_raw()), 4, ElementType::U16),
        other => {
            return Err(RecastError::Format(format!(
                "unsupported pixel layout {:?}",
                other.color()
            )));
        }
    };
    let shape = if c == 1 { vec![h, w] } else { vec![h, w, c] };
    Ok((raw, shape, dtype))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(w, h, |x, y| {
            Rgb([(x * 7) as u8, (y * 5) as u8, ((x + y) * 3) as u8])
        }))
    }

    fn params_for(img: &DynamicImage, format: ContainerFormat) -> (Vec<u8>, Reconstruction) {
        let (raw, shape, dtype) = flatten(img).unwrap();
        let payload = compressor_for(CodecId::Zstd).compress_bytes(&raw, 3).unwrap();
        (
            payload,
            Reconstruction::Image(ImageParams {
                shape,
                dtype,
                format,
            }),
        )
    }

    #[test]
    fn png_reconstruction_is_byte_identical() {
        let img = gradient(17, 9);
        let original = encode_container(&img, ContainerFormat::Png).unwrap();
        let (payload, params) = params_for(&img, ContainerFormat::Png);
        let out = ImageDecoder.reconstruct(&payload, &params, u64::MAX).unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn sixteen_bit_grayscale_survives() {
        let img = DynamicImage::ImageLuma16(ImageBuffer::from_fn(5, 4, |x, y| {
            Luma([(x * 1000 + y * 7) as u16])
        }));
        let original = encode_container(&img, ContainerFormat::Png).unwrap();
        let (payload, params) = params_for(&img, ContainerFormat::Png);
        if let Reconstruction::Image(p) = &params {
            assert_eq!(p.shape, vec![4, 5]);
            assert_eq!(p.dtype, ElementType::U16);
        }
        assert_eq!(ImageDecoder.reconstruct(&payload, &params, u64::MAX).unwrap(), original);
    }

    #[test]
    fn wrong_shape_is_decode_error() {
        let img = gradient(4, 4);
        let (payload, _) = params_for(&img, ContainerFormat::Png);
        let params = Reconstruction::Image(ImageParams {
            shape: vec![4, 5, 3],
            dtype: ElementType::U8,
            format: ContainerFormat::Png,
        });
        let err = ImageDecoder.reconstruct(&payload, &params, u64::MAX).unwrap_err();
        assert!(matches!(err, RecastError::Decode(_)));
    }

    #[test]
    fn oversized_shape_is_refused_before_inflating() {
        let (payload, _) = params_for(&gradient(2, 2), ContainerFormat::Png);
        let params = Reconstruction::Image(ImageParams {
            shape: vec![1_048_576, 1_048_576, 4],
            dtype: ElementType::U16,
            format: ContainerFormat::Png,
        });
        let err = ImageDecoder.reconstruct(&payload, &params, u64::MAX).unwrap_err();
        assert!(matches!(err, RecastError::InvalidRecipe(_)));
    }

    #[test]
    fn tiff_container_round_trips_pixels() {
        let img = gradient(6, 5);
        let (payload, params) = params_for(&img, ContainerFormat::Tiff);
        let out = ImageDecoder.reconstruct(&payload, &params, u64::MAX).unwrap();
        assert!(out.starts_with(b"II*\0") || out.starts_with(b"MM\0*"));
        assert_eq!(out, encode_container(&img, ContainerFormat::Tiff).unwrap());
        let back = image::load_from_memory_with_format(&out, ImageFormat::Tiff).unwrap();
        assert_eq!(back.to_rgb8().as_raw(), img.to_rgb8().as_raw());
    }

    #[test]
    fn bmp_container_is_supported() {
        let img = gradient(3, 3);
        let (payload, params) = params_for(&img, ContainerFormat::Bmp);
        let out = ImageDecoder.reconstruct(&payload, &params, u64::MAX).unwrap();
        assert_eq!(&out[..2], b"BM");
    }
}
