use std::fmt;

use super::{DigestAlgorithm, KeyAlgorithm};

/// Raw signature bytes produced by a token, with the algorithms that produced them.
/// For ECDSA the bytes are the ASN.1 DER encoded Ecdsa-Sig-Value.
#[derive(Clone, Eq, PartialEq)]
pub struct SignatureValue {
    digest_algorithm: DigestAlgorithm,
    key_algorithm: KeyAlgorithm,
    bytes: Box<[u8]>,
}

impl SignatureValue {
    #[must_use]
    pub fn new(
        digest_algorithm: DigestAlgorithm,
        key_algorithm: KeyAlgorithm,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            digest_algorithm,
            key_algorithm,
            bytes: bytes.into_boxed_slice(),
        }
    }
    #[must_use]
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }
    #[must_use]
    pub fn key_algorithm(&self) -> KeyAlgorithm {
        self.key_algorithm
    }
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// JCA-style signature algorithm name, e.g. `SHA256withRSA`.
    #[must_use]
    pub fn algorithm_name(&self) -> String {
        let digest = self.digest_algorithm.name().replace('-', "");
        format!("{digest}with{}", self.key_algorithm.as_str())
    }
}

impl fmt::Debug for SignatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SignatureValue(algo={}, len={})",
            self.algorithm_name(),
            self.bytes.len()
        )
    }
}
