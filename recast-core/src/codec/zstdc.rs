use super::{CodecId, Compressor};
use crate::error::{RecastError, Result};
use std::io::{Read, Write};

pub struct ZstdCompressor;

impl Compressor for ZstdCompressor {
    fn id(&self) -> CodecId {
        CodecId::Zstd
    }

    fn compress(&self, src: &mut dyn Read, dst: &mut dyn Write, level: i32) -> Result<u64> {
        // no worker threads: equal input gives an equal frame
        let mut enc = zstd::stream::Encoder::new(dst, level.max(1))?;
        let written_uncompressed = std::io::copy(src, &mut enc)?;
        enc.finish()?;
        Ok(written_uncompressed)
    }

    fn decompress(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64> {
        let mut dec = zstd::stream::Decoder::new(src)?;
        let written_uncompressed = std::io::copy(&mut dec, dst)
            .map_err(|e| RecastError::Decode(format!("zstd: {e}")))?;
        Ok(written_uncompressed)
    }
}
