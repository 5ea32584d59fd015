//! Signing token capability.
//!
//! A [`TokenConnection`] holds private keys and performs key operations
//! without ever handing key material out. One instance usually stands for
//! exclusive access to one device, so implementations serialize concurrent
//! calls themselves.

use crate::domain::crypto::{DigestAlgorithm, SignatureValue};
use crate::domain::key_entry::KeyEntry;
use crate::domain::to_be_signed::ToBeSigned;
use crate::infra::error::SigningResult;

pub trait TokenConnection: Send + Sync {
    /// Keys this token can sign with.
    fn keys(&self) -> SigningResult<Vec<KeyEntry>>;

    /// Sign `data` with the key behind `key_entry`, hashing with `digest_algorithm`.
    ///
    /// May block indefinitely (PIN entry, touch confirmation). Must not retry
    /// internally or return a signature produced by an earlier call.
    fn sign(
        &self,
        data: &ToBeSigned,
        digest_algorithm: DigestAlgorithm,
        key_entry: &KeyEntry,
    ) -> SigningResult<SignatureValue>;
}
