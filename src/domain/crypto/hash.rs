//! Digest algorithm domain type.
//!
//! Provides the core `DigestAlgorithm` enumeration supporting SHA-256, SHA-384
//! and SHA-512, with one-shot and streaming digest computation.

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::domain::constants::{SHA256_ALGORITHM_OID, SHA384_ALGORITHM_OID, SHA512_ALGORITHM_OID};
use crate::infra::error::SigningError;

const STREAM_BUFFER_SIZE: usize = 64 * 1024;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-384")]
    Sha384,
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha384 => "sha384",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }

    /// Standard algorithm name, as written into signature envelopes.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    pub fn digest_size(&self) -> usize {
        match self {
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    /// DER content bytes of the algorithm OID (without tag and length).
    pub fn oid_bytes(&self) -> &'static [u8] {
        match self {
            DigestAlgorithm::Sha256 => SHA256_ALGORITHM_OID,
            DigestAlgorithm::Sha384 => SHA384_ALGORITHM_OID,
            DigestAlgorithm::Sha512 => SHA512_ALGORITHM_OID,
        }
    }

    /// Inverse of [`DigestAlgorithm::oid_bytes`].
    pub fn from_oid_bytes(oid: &[u8]) -> Option<Self> {
        [
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ]
        .into_iter()
        .find(|alg| alg.oid_bytes() == oid)
    }

    /// Digest a byte slice in one shot.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// Digest everything a reader yields without buffering it whole.
    pub fn digest_reader<R: Read + ?Sized>(&self, reader: &mut R) -> io::Result<Vec<u8>> {
        match self {
            DigestAlgorithm::Sha256 => hash_stream::<Sha256, R>(reader),
            DigestAlgorithm::Sha384 => hash_stream::<Sha384, R>(reader),
            DigestAlgorithm::Sha512 => hash_stream::<Sha512, R>(reader),
        }
    }
}

fn hash_stream<D: Digest, R: Read + ?Sized>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; STREAM_BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_vec())
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha384" => Ok(DigestAlgorithm::Sha384),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(SigningError::ParameterError(format!(
                "Unsupported digest algorithm: {s}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_algorithm_properties() {
        assert_eq!(DigestAlgorithm::Sha256.as_str(), "sha256");
        assert_eq!(DigestAlgorithm::Sha256.digest_size(), 32);
        assert_eq!(DigestAlgorithm::Sha384.name(), "SHA-384");
        assert_eq!(DigestAlgorithm::Sha512.digest_size(), 64);
    }

    #[test]
    fn test_parse_accepts_common_spellings() {
        for s in ["sha256", "SHA-256", "SHA256", "sha_256"] {
            assert_eq!(s.parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        }
        assert!("md5".parse::<DigestAlgorithm>().is_err());
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let data = vec![0x5au8; STREAM_BUFFER_SIZE * 2 + 17];
        for alg in [
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ] {
            let streamed = alg.digest_reader(&mut data.as_slice()).unwrap();
            assert_eq!(streamed, alg.digest(&data));
            assert_eq!(streamed.len(), alg.digest_size());
        }
    }

    #[test]
    fn test_oid_round_trip() {
        let alg = DigestAlgorithm::from_oid_bytes(SHA384_ALGORITHM_OID).unwrap();
        assert_eq!(alg, DigestAlgorithm::Sha384);
        assert!(DigestAlgorithm::from_oid_bytes(&[0x2a]).is_none());
    }

    #[test]
    fn test_serde_uses_standard_names() {
        let json = serde_json::to_string(&DigestAlgorithm::Sha256).unwrap();
        assert_eq!(json, "\"SHA-256\"");
    }
}
