//! Foundational cryptographic domain types.
//!
//! Provides strongly-typed wrappers for cryptographic artifacts including:
//! - Digest algorithms and digest values with size validation
//! - Certificate representations and key algorithm families
//! - Signature values tagged with the algorithms that produced them
//!
//! None of these types ever hold private key material.

mod cert;
mod digest_bytes;
mod hash;
mod signature;

pub use cert::{EndEntityCert, IntermediateCert, KeyAlgorithm};
pub use digest_bytes::{DigestBytes, DigestBytesError};
pub use hash::DigestAlgorithm;
pub use signature::SignatureValue;
