//! Key entries: opaque references to keys held by a signing token.

use std::fmt;

use crate::domain::crypto::{EndEntityCert, IntermediateCert, KeyAlgorithm};

/// Token-specific identifier of a key (keystore alias, PIV slot, HSM label).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyHandle(String);

impl KeyHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A signing key as seen from outside its token: a handle, the certificate
/// and the public-key algorithm. Never carries private key bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    handle: KeyHandle,
    certificate: EndEntityCert,
    chain: Vec<IntermediateCert>,
    key_algorithm: KeyAlgorithm,
}

impl KeyEntry {
    #[must_use]
    pub fn new(handle: KeyHandle, certificate: EndEntityCert, key_algorithm: KeyAlgorithm) -> Self {
        Self {
            handle,
            certificate,
            chain: Vec::new(),
            key_algorithm,
        }
    }

    #[must_use]
    pub fn with_chain(mut self, chain: Vec<IntermediateCert>) -> Self {
        self.chain = chain;
        self
    }

    pub fn handle(&self) -> &KeyHandle {
        &self.handle
    }

    pub fn certificate(&self) -> &EndEntityCert {
        &self.certificate
    }

    pub fn certificate_chain(&self) -> &[IntermediateCert] {
        &self.chain
    }

    pub fn key_algorithm(&self) -> KeyAlgorithm {
        self.key_algorithm
    }
}
