//! Generic decompression: the payload is a plain compressed byte stream.

use super::{Reconstructor, wrong_params};
use crate::codec::{CodecId, compressor_for};
use crate::error::Result;
use crate::recipe::{Method, Reconstruction};

pub struct StoreDecoder;

impl Reconstructor for StoreDecoder {
    fn method(&self) -> Method {
        Method::Store
    }

    fn reconstruct(&self, payload: &[u8], params: &Reconstruction, limit: u64) -> Result<Vec<u8>> {
        match params {
            Reconstruction::Store => compressor_for(CodecId::Store).decompress_bytes(payload, limit),
            other => Err(wrong_params(Method::Store, other)),
        }
    }
}

pub struct ZstdDecoder;

impl Reconstructor for ZstdDecoder {
    fn method(&self) -> Method {
        Method::Zstd
    }

    fn reconstruct(&self, payload: &[u8], params: &Reconstruction, limit: u64) -> Result<Vec<u8>> {
        match params {
            Reconstruction::Zstd => compressor_for(CodecId::Zstd).decompress_bytes(payload, limit),
            other => Err(wrong_params(Method::Zstd, other)),
        }
    }
}
