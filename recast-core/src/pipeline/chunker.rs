use crate::error::{RecastError, Result};

/// A borrowed byte range of the artifact, numbered in artifact order.
#[derive(Clone, Copy, Debug)]
pub struct Chunk<'a> {
    pub chunk_id: u64,
    pub offset: u64,
    pub data: &'a [u8],
}

#[derive(Clone, Copy, Debug)]
pub enum Chunking {
    /// Consecutive ranges of `n` bytes; the last one may be short.
    Fixed(usize),
    /// The artifact as a single chunk.
    Whole,
}

impl Chunking {
    pub fn split<'a>(&self, data: &'a [u8]) -> Result<Vec<Chunk<'a>>> {
        match *self {
            Chunking::Fixed(0) => Err(RecastError::Format("chunk size must be positive".into())),
            Chunking::Fixed(n) => Ok(data
                .chunks(n)
                .enumerate()
                .map(|(i, d)| Chunk {
                    chunk_id: i as u64,
                    offset: (i * n) as u64,
                    data: d,
                })
                .collect()),
            Chunking::Whole if data.is_empty() => Ok(Vec::new()),
            Chunking::Whole => Ok(vec![Chunk {
                chunk_id: 0,
                offset: 0,
                data,
            }]),
        }
    }
}
