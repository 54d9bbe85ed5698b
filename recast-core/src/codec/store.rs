//! Identity codec: the payload already is the original bytes.

use super::{CodecId, Compressor};
use crate::error::Result;
use std::io::{self, Read, Write};

pub struct Store;

fn pass_through(src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64> {
    Ok(io::copy(src, dst)?)
}

impl Compressor for Store {
    fn id(&self) -> CodecId {
        CodecId::Store
    }

    fn compress(&self, src: &mut dyn Read, dst: &mut dyn Write, _level: i32) -> Result<u64> {
        pass_through(src, dst)
    }

    fn decompress(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64> {
        pass_through(src, dst)
    }
}
