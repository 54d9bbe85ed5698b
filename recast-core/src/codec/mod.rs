use crate::error::{RecastError, Result};
use std::io::{self, Read, Write};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CodecId {
    Store,
    Zstd,
}

impl CodecId {
    pub fn name(self) -> &'static str {
        match self {
            CodecId::Store => "store",
            CodecId::Zstd => "zstd",
        }
    }
}

/// A lossless byte filter. Reconstruction only ever calls `decompress`;
/// `compress` exists for simulated producers.
pub trait Compressor: Send + Sync {
    fn id(&self) -> CodecId;
    fn compress(&self, src: &mut dyn Read, dst: &mut dyn Write, level: i32) -> Result<u64>;
    fn decompress(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64>;

    fn compress_bytes(&self, src: &[u8], level: i32) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(src.len() / 2 + 16);
        self.compress(&mut &src[..], &mut out, level)?;
        Ok(out)
    }

    /// Decompress `src`, refusing to produce more than `limit` bytes.
    /// Nothing is preallocated from `limit`; it is only a ceiling.
    fn decompress_bytes(&self, src: &[u8], limit: u64) -> Result<Vec<u8>> {
        let mut sink = BoundedSink::new(limit, src.len());
        match self.decompress(&mut &src[..], &mut sink) {
            Ok(_) => Ok(sink.buf),
            Err(_) if sink.overflowed => Err(RecastError::Decode(format!(
                "{} output exceeds {limit} bytes",
                self.id().name()
            ))),
            Err(e) => Err(e),
        }
    }
}

/// Growable buffer that errors instead of writing past `limit`.
struct BoundedSink {
    buf: Vec<u8>,
    limit: u64,
    overflowed: bool,
}

impl BoundedSink {
    fn new(limit: u64, hint: usize) -> Self {
        let cap = (hint as u64).min(limit) as usize;
        Self {
            buf: Vec::with_capacity(cap),
            limit,
            overflowed: false,
        }
    }
}

impl Write for BoundedSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.buf.len() as u64 + data.len() as u64 > self.limit {
            self.overflowed = true;
            return Err(io::Error::other("decoded output over limit"));
        }
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn compressor_for(id: CodecId) -> &'static dyn Compressor {
    match id {
        CodecId::Store => &store::Store,
        CodecId::Zstd => &zstdc::ZstdCompressor,
    }
}

pub mod store;
pub mod zstdc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zstd_roundtrip_shrinks_repetitive_input() {
        let data = vec![b'a'; 4096];
        let z = compressor_for(CodecId::Zstd);
        let packed = z.compress_bytes(&data, 3).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(z.decompress_bytes(&packed, data.len() as u64).unwrap(), data);
    }

    #[test]
    fn output_past_limit_is_refused() {
        let z = compressor_for(CodecId::Zstd);
        let packed = z.compress_bytes(&vec![0u8; 1 << 20], 3).unwrap();
        let err = z.decompress_bytes(&packed, 4096).unwrap_err();
        assert!(matches!(err, RecastError::Decode(ref m) if m.contains("4096")));
        let s = compressor_for(CodecId::Store);
        assert!(matches!(s.decompress_bytes(b"12345", 4), Err(RecastError::Decode(_))));
        assert_eq!(s.decompress_bytes(b"1234", 4).unwrap(), b"1234");
    }

    #[test]
    fn store_is_identity() {
        let s = compressor_for(CodecId::Store);
        let data = b"raw bytes".to_vec();
        assert_eq!(s.compress_bytes(&data, 0).unwrap(), data);
        assert_eq!(s.decompress_bytes(&data, data.len() as u64).unwrap(), data);
    }

    #[test]
    fn zstd_rejects_garbage() {
        let z = compressor_for(CodecId::Zstd);
        assert!(z.decompress_bytes(b"definitely not a zstd frame", 1024).is_err());
    }
}
