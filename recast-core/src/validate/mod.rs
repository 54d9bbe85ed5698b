pub mod batch;
pub mod chunk;
pub mod manifest;
