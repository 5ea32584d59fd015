use std::fmt;

use crate::domain::crypto::{DigestAlgorithm, DigestBytes};

/// Canonical bytes a private-key operation signs, tagged with the digest
/// algorithm the signature format canonicalized them for.
#[derive(Clone, PartialEq, Eq)]
pub struct ToBeSigned {
    digest_algorithm: DigestAlgorithm,
    bytes: Box<[u8]>,
}

impl ToBeSigned {
    #[must_use]
    pub fn new(digest_algorithm: DigestAlgorithm, bytes: Vec<u8>) -> Self {
        Self {
            digest_algorithm,
            bytes: bytes.into_boxed_slice(),
        }
    }

    #[must_use]
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Digest of the canonical bytes, for tokens that sign pre-hashed input.
    #[must_use]
    pub fn digest(&self) -> DigestBytes {
        DigestBytes::compute(self.digest_algorithm, &self.bytes)
    }
}

impl fmt::Debug for ToBeSigned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ToBeSigned(algo={:?}, len={})",
            self.digest_algorithm,
            self.bytes.len()
        )
    }
}
