//! Algorithm-tagged digests for source archive verification

use crate::CHUNK_SIZE;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use spkg_errors::{DescriptorError, Error, IntegrityError};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Digest algorithms accepted in descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    /// Name used in `algo:hex` checksum strings
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }

    fn hasher(self) -> StreamHasher {
        match self {
            Self::Sha256 => StreamHasher::Sha256(Sha256::new()),
            Self::Blake3 => StreamHasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(DescriptorError::MalformedChecksum {
                value: s.to_string(),
                message: format!("unsupported algorithm {other:?}"),
            }),
        }
    }
}

enum StreamHasher {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl StreamHasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize(self) -> [u8; 32] {
        match self {
            Self::Sha256(h) => {
                let mut out = [0u8; 32];
                out.copy_from_slice(&h.finalize());
                out
            }
            Self::Blake3(h) => *h.finalize().as_bytes(),
        }
    }
}

/// Decode a 32-byte digest from hex, rejecting anything that is not exactly
/// 64 hex characters.
pub(crate) fn decode_digest(hex_str: &str, algorithm: &str) -> Result<[u8; 32], DescriptorError> {
    let trimmed = hex_str.trim();
    if trimmed.len() != 64 {
        return Err(DescriptorError::MalformedChecksum {
            value: hex_str.to_string(),
            message: format!(
                "{algorithm} digests are 64 hex characters, got {}",
                trimmed.len()
            ),
        });
    }

    let bytes = hex::decode(trimmed).map_err(|e| DescriptorError::MalformedChecksum {
        value: hex_str.to_string(),
        message: format!("invalid hex: {e}"),
    })?;

    let mut array = [0u8; 32];
    array.copy_from_slice(&bytes);
    Ok(array)
}

/// Expected digest of a source archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntegrityHash {
    algorithm: HashAlgorithm,
    digest: [u8; 32],
}

impl IntegrityHash {
    /// Build from an algorithm and a hex digest
    ///
    /// # Errors
    /// Returns `MalformedChecksum` if the digest is not 64 hex characters.
    pub fn from_hex(algorithm: HashAlgorithm, hex_str: &str) -> Result<Self, DescriptorError> {
        let digest = decode_digest(hex_str, algorithm.as_str())?;
        Ok(Self { algorithm, digest })
    }

    /// Parse `sha256:<hex>`, `blake3:<hex>` or a bare hex string (SHA-256)
    ///
    /// # Errors
    /// Returns `MalformedChecksum` for unknown algorithms or malformed digests.
    pub fn parse(value: &str) -> Result<Self, DescriptorError> {
        match value.split_once(':') {
            Some((algo, hex_str)) => Self::from_hex(algo.parse()?, hex_str),
            None => Self::from_hex(HashAlgorithm::Sha256, value),
        }
    }

    /// Digest of an in-memory buffer
    #[must_use]
    pub fn compute(algorithm: HashAlgorithm, data: &[u8]) -> Self {
        let mut hasher = algorithm.hasher();
        hasher.update(data);
        Self {
            algorithm,
            digest: hasher.finalize(),
        }
    }

    /// Streaming digest of a file
    ///
    /// # Errors
    /// Returns `IntegrityError::Unreadable` if the file cannot be read.
    pub async fn compute_file(algorithm: HashAlgorithm, path: &Path) -> Result<Self, Error> {
        let unreadable = |e: std::io::Error| IntegrityError::Unreadable {
            file: path.display().to_string(),
            message: e.to_string(),
        };

        let mut file = File::open(path).await.map_err(unreadable)?;
        let mut hasher = algorithm.hasher();
        let mut buffer = vec![0; CHUNK_SIZE];

        loop {
            let n = file.read(&mut buffer).await.map_err(unreadable)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(Self {
            algorithm,
            digest: hasher.finalize(),
        })
    }

    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    #[must_use]
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Lowercase hex digest without the algorithm prefix
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

impl fmt::Display for IntegrityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl FromStr for IntegrityHash {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for IntegrityHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for IntegrityHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Hash `path` with the expected digest's algorithm and compare
///
/// Returns the computed digest on success.
///
/// # Errors
/// Returns `IntegrityError::Mismatch` when the digests differ, or
/// `IntegrityError::Unreadable` if the file cannot be read.
pub async fn verify_file(path: &Path, expected: &IntegrityHash) -> Result<IntegrityHash, Error> {
    let actual = IntegrityHash::compute_file(expected.algorithm, path).await?;
    if actual != *expected {
        return Err(IntegrityError::Mismatch {
            file: path.display().to_string(),
            algorithm: expected.algorithm.to_string(),
            expected: expected.to_hex(),
            actual: actual.to_hex(),
        }
        .into());
    }
    Ok(actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITSYHOME_SHA256: &str =
        "e0a853e65e8f9d4254bce331022da9e1d3961253da1313dc753acc71dbc6e345";

    #[test]
    fn test_known_sha256() {
        let digest = IntegrityHash::compute(HashAlgorithm::Sha256, b"abc");
        assert_eq!(
            digest.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_parse_bare_hex_defaults_to_sha256() {
        let hash = IntegrityHash::parse(ITSYHOME_SHA256).unwrap();
        assert_eq!(hash.algorithm(), HashAlgorithm::Sha256);
        assert_eq!(hash.to_hex(), ITSYHOME_SHA256);
        assert_eq!(hash.to_string(), format!("sha256:{ITSYHOME_SHA256}"));
    }

    #[test]
    fn test_parse_prefixed() {
        let hash = IntegrityHash::parse(&format!("BLAKE3:{ITSYHOME_SHA256}")).unwrap();
        assert_eq!(hash.algorithm(), HashAlgorithm::Blake3);
    }

    #[test]
    fn test_parse_normalises_uppercase_hex() {
        let hash = IntegrityHash::parse(&ITSYHOME_SHA256.to_uppercase()).unwrap();
        assert_eq!(hash.to_hex(), ITSYHOME_SHA256);
    }

    #[test]
    fn test_rejects_malformed_checksums() {
        // too long, as if a longer digest were pasted into a sha256 field
        let long = format!("{ITSYHOME_SHA256}00");
        assert!(matches!(
            IntegrityHash::parse(&long),
            Err(DescriptorError::MalformedChecksum { .. })
        ));
        assert!(IntegrityHash::parse(&ITSYHOME_SHA256[..60]).is_err());
        assert!(IntegrityHash::parse(&ITSYHOME_SHA256.replace('e', "z")).is_err());
        assert!(IntegrityHash::parse(&format!("md5:{ITSYHOME_SHA256}")).is_err());
        assert!(IntegrityHash::parse("").is_err());
    }

    #[test]
    fn test_serde_string_form() {
        let hash = IntegrityHash::parse(ITSYHOME_SHA256).unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"sha256:{ITSYHOME_SHA256}\""));
        let back: IntegrityHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
