use std::collections::BTreeMap;
use std::io::Read;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use crate::error::{RecastError, Result};

/// Block size used when feeding several hashers from one buffer.
pub const HASH_BLOCK: usize = 64 * 1024;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
    Blake3,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 3] = [
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha512,
        HashAlgorithm::Blake3,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Blake3 => "blake3",
        }
    }

    /// Digest length in bytes (hex length is twice this).
    pub fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 | HashAlgorithm::Blake3 => 32,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = RecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(RecastError::Format(format!(
                "unsupported hash algorithm: {other}"
            ))),
        }
    }
}

/// Incremental hasher over any supported algorithm.
#[derive(Clone)]
pub enum Hasher {
    Sha256(Sha256),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => Hasher::Sha512(Sha512::new()),
            HashAlgorithm::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            Hasher::Sha256(_) => HashAlgorithm::Sha256,
            Hasher::Sha512(_) => HashAlgorithm::Sha512,
            Hasher::Blake3(_) => HashAlgorithm::Blake3,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
            Hasher::Blake3(h) => {
                h.update(data);
            }
        }
    }

    /// Lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        match self {
            Hasher::Sha256(h) => hex::encode(h.finalize()),
            Hasher::Sha512(h) => hex::encode(h.finalize()),
            Hasher::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

pub fn digest(bytes: &[u8], algorithm: HashAlgorithm) -> String {
    let mut h = Hasher::new(algorithm);
    h.update(bytes);
    h.finalize_hex()
}

/// Compute several digests while walking `bytes` once.
///
/// Each block is handed to every hasher before moving on, so large inputs
/// stay hot in cache instead of being re-read once per algorithm. Duplicate
/// algorithms collapse into a single entry.
pub fn digest_multi(bytes: &[u8], algorithms: &[HashAlgorithm]) -> BTreeMap<HashAlgorithm, String> {
    let mut hashers: BTreeMap<HashAlgorithm, Hasher> = algorithms
        .iter()
        .map(|a| (*a, Hasher::new(*a)))
        .collect();
    for block in bytes.chunks(HASH_BLOCK) {
        for h in hashers.values_mut() {
            h.update(block);
        }
    }
    hashers
        .into_iter()
        .map(|(a, h)| (a, h.finalize_hex()))
        .collect()
}

/// Streaming digest; returns the hex digest and the number of bytes read.
pub fn digest_reader<R: Read>(mut reader: R, algorithm: HashAlgorithm) -> Result<(String, u64)> {
    let mut h = Hasher::new(algorithm);
    let mut buf = vec![0u8; HASH_BLOCK];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        h.update(&buf[..n]);
        total += n as u64;
    }
    Ok((h.finalize_hex(), total))
}

/// Streaming [`digest_multi`]: every hasher sees each block as it is read.
pub fn digest_reader_multi<R: Read>(
    mut reader: R,
    algorithms: &[HashAlgorithm],
) -> Result<(BTreeMap<HashAlgorithm, String>, u64)> {
    let mut hashers: BTreeMap<HashAlgorithm, Hasher> = algorithms
        .iter()
        .map(|a| (*a, Hasher::new(*a)))
        .collect();
    let mut buf = vec![0u8; HASH_BLOCK];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        for h in hashers.values_mut() {
            h.update(&buf[..n]);
        }
        total += n as u64;
    }
    let digests = hashers
        .into_iter()
        .map(|(a, h)| (a, h.finalize_hex()))
        .collect();
    Ok((digests, total))
}

/// Hex digests compare case-insensitively.
pub fn same_digest(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
