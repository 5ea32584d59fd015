//! Signature format seam.
//!
//! A format owns canonicalization (what bytes get signed) and embedding (how
//! the signature value ends up in a document). The orchestrator drives it but
//! never looks inside the bytes.

use crate::domain::crypto::{DigestBytes, SignatureValue};
use crate::domain::document::Document;
use crate::domain::key_entry::KeyEntry;
use crate::domain::parameters::SignatureParameters;
use crate::domain::timestamp::TimestampToken;
use crate::domain::to_be_signed::ToBeSigned;
use crate::infra::error::SigningResult;

pub trait SignatureFormat: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Canonical bytes to sign. Must be a pure function of the document
    /// chain and the parameters.
    fn data_to_sign(
        &self,
        document: &Document,
        parameters: &SignatureParameters,
    ) -> SigningResult<ToBeSigned>;

    /// Digest a timestamp authority should bind to the produced signature.
    fn timestamp_imprint(
        &self,
        parameters: &SignatureParameters,
        signature: &SignatureValue,
    ) -> SigningResult<DigestBytes>;

    /// Assemble the final signed document around `to_be_signed`, the bytes
    /// the token actually signed. Fails if `document` no longer matches them.
    fn embed(
        &self,
        document: &Document,
        parameters: &SignatureParameters,
        key_entry: &KeyEntry,
        to_be_signed: &ToBeSigned,
        signature: &SignatureValue,
        timestamp: Option<&TimestampToken>,
    ) -> SigningResult<Document>;
}
