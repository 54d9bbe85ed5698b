//! Method registry: maps a reconstruction tag to its decoder.

use std::collections::BTreeMap;

use crate::error::{RecastError, Result};
use crate::recipe::{Method, Recipe, Reconstruction};

pub mod generic;
pub mod image;

/// Hard ceiling on what a single chunk may decode to, whatever its recipe
/// claims.
pub const MAX_DECODED_BYTES: u64 = 1 << 30;

/// A pure, stateless decoder for one reconstruction method.
///
/// Everything a decoder may look at is the payload and the parameters
/// carried by the recipe. `limit` bounds any intermediate or final buffer
/// that grows with decompressed data.
pub trait Reconstructor: Send + Sync {
    fn method(&self) -> Method;
    fn reconstruct(&self, payload: &[u8], params: &Reconstruction, limit: u64) -> Result<Vec<u8>>;
}

/// Output ceiling for a chunk: one byte past its claimed size, so an
/// overlong decode still surfaces as a size mismatch, capped at
/// [`MAX_DECODED_BYTES`].
pub fn decode_limit(recipe: &Recipe) -> u64 {
    recipe
        .stats
        .original_size
        .saturating_add(1)
        .min(MAX_DECODED_BYTES)
}

pub struct Dispatcher {
    decoders: BTreeMap<Method, Box<dyn Reconstructor>>,
}

impl Dispatcher {
    /// A dispatcher with nothing registered.
    pub fn empty() -> Self {
        Self {
            decoders: BTreeMap::new(),
        }
    }

    /// Replaces any decoder already registered for the same method.
    pub fn register(&mut self, decoder: Box<dyn Reconstructor>) -> &mut Self {
        self.decoders.insert(decoder.method(), decoder);
        self
    }

    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        self.decoders.keys().copied()
    }

    pub fn decode(&self, payload: &[u8], params: &Reconstruction, limit: u64) -> Result<Vec<u8>> {
        let method = params.method();
        let decoder = self
            .decoders
            .get(&method)
            .ok_or_else(|| RecastError::UnknownReconstructionMethod(method.name().to_string()))?;
        decoder.reconstruct(payload, params, limit)
    }

    /// Decode `payload` as described by `recipe`, bounded by [`decode_limit`].
    pub fn decode_recipe(&self, recipe: &Recipe, payload: &[u8]) -> Result<Vec<u8>> {
        self.decode(payload, &recipe.reconstruction, decode_limit(recipe))
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        let mut d = Dispatcher::empty();
        d.register(Box::new(generic::StoreDecoder))
            .register(Box::new(generic::ZstdDecoder))
            .register(Box::new(image::ImageDecoder));
        d
    }
}

pub(crate) fn wrong_params(expected: Method, got: &Reconstruction) -> RecastError {
    RecastError::Decode(format!(
        "{expected} decoder handed {} parameters",
        got.method()
    ))
}
