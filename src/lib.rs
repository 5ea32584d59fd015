//! Token Signer Library
//!
//! Detached document signing with keys held by a signing token (a `YubiKey`
//! PIV slot or a PKCS#12 keystore), with optional RFC 3161 signature
//! timestamps.
//!
//! Signing runs in three phases: the to-be-signed bytes are derived from the
//! documents and [`SignatureParameters`], a single call to the token produces
//! the signature value, and the signature format assembles the signed output
//! document. See [`pipelines::session`] for the state machine.
//!
//! ```no_run
//! use token_signer::{Document, KeystoreToken, SignatureParameters, DigestAlgorithm};
//! use token_signer::{adapters::EnvPin, TokenConnection};
//!
//! # fn main() -> token_signer::SigningResult<()> {
//! let token = KeystoreToken::from_pkcs12_file("signer.p12", &EnvPin::new("TOKEN_SIGNER_PIN"))?;
//! let key = token.keys()?.remove(0);
//! let parameters = SignatureParameters::new()
//!     .with_digest_algorithm(DigestAlgorithm::Sha256)
//!     .with_signing_certificate(key.certificate().clone());
//! let document = Document::from_file("contract.pdf")?;
//! let signed = token_signer::sign_document(&document, &parameters, &key, &token)?;
//! signed.save(signed.name())?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod pipelines;
pub mod services;

pub use adapters::{KeystoreToken, TokenConnection};
pub use domain::crypto::{DigestAlgorithm, EndEntityCert, IntermediateCert, SignatureValue};
pub use domain::document::{Document, MimeType};
pub use domain::key_entry::{KeyEntry, KeyHandle};
pub use domain::parameters::{SignaturePackaging, SignatureParameters};
pub use domain::to_be_signed::ToBeSigned;
pub use domain::verification::VerificationReport;
pub use infra::error::{ErrorKind, SigningError, SigningResult, TimestampFailure, TokenFailure};
pub use pipelines::{
    CancellationToken, SessionState, SigningContext, SigningOrchestrator, SigningSession,
    VerifyWorkflow,
};

/// Sign `document` with the default context: detached envelope, no timestamp
/// and no certificate checks.
pub fn sign_document(
    document: &Document,
    parameters: &SignatureParameters,
    key_entry: &KeyEntry,
    token: &dyn TokenConnection,
) -> SigningResult<Document> {
    SigningOrchestrator::default().sign_document(document, parameters, key_entry, token)
}

/// Verify a signature envelope against its detached parts.
pub fn verify_document(
    signature: &Document,
    detached: &[Document],
) -> SigningResult<VerificationReport> {
    VerifyWorkflow::new().run(signature, detached)
}
