//! Detached JSON signature envelope.
//!
//! The signed properties (digest of every part, signing certificate digest,
//! signing time and options) are serialized with `serde_json` in declaration
//! order; those bytes are what the token signs. The envelope then carries the
//! signed properties verbatim next to the signature value, the certificates
//! and the optional signature timestamp.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::domain::constants::ENVELOPE_FORMAT_ID;
use crate::domain::crypto::{DigestAlgorithm, DigestBytes, SignatureValue};
use crate::domain::document::{Document, MimeType};
use crate::domain::key_entry::KeyEntry;
use crate::domain::parameters::{SignaturePackaging, SignatureParameters};
use crate::domain::timestamp::TimestampToken;
use crate::domain::to_be_signed::ToBeSigned;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::format::SignatureFormat;

/// Digest of one signed part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    pub mime_type: String,
    pub digest: String,
}

/// Everything covered by the signature value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedProperties {
    pub format: String,
    pub digest_algorithm: DigestAlgorithm,
    /// Seconds since the Unix epoch.
    pub signing_time: u64,
    pub signing_certificate_digest: String,
    pub packaging: SignaturePackaging,
    pub references: Vec<Reference>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl SignedProperties {
    /// The exact bytes a token signs.
    pub fn canonical_bytes(&self) -> SigningResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            SigningError::FormatError(format!("Failed to canonicalize signed properties: {e}"))
        })
    }

    /// Recover the properties from bytes produced by [`SignedProperties::canonical_bytes`].
    pub fn from_canonical_bytes(bytes: &[u8]) -> SigningResult<Self> {
        let properties: Self = serde_json::from_slice(bytes).map_err(|e| {
            SigningError::FormatError(format!("To-be-signed bytes are not signed properties: {e}"))
        })?;
        if properties.canonical_bytes()? != bytes {
            return Err(SigningError::FormatError(
                "To-be-signed bytes are not in canonical form".into(),
            ));
        }
        Ok(properties)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureTimestamp {
    pub digest_algorithm: DigestAlgorithm,
    /// Base64 DER `TimeStampToken`.
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopedContent {
    pub name: String,
    pub content: String,
}

/// The serialized signed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEnvelope {
    pub signed_properties: SignedProperties,
    pub signature_algorithm: String,
    pub signature_value: String,
    pub signing_certificate: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificate_chain: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_timestamp: Option<SignatureTimestamp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<EnvelopedContent>,
}

impl SignatureEnvelope {
    pub fn from_slice(bytes: &[u8]) -> SigningResult<Self> {
        let envelope: Self = serde_json::from_slice(bytes)
            .map_err(|e| SigningError::FormatError(format!("Not a signature envelope: {e}")))?;
        if envelope.signed_properties.format != ENVELOPE_FORMAT_ID {
            return Err(SigningError::FormatError(format!(
                "Unsupported envelope format '{}'",
                envelope.signed_properties.format
            )));
        }
        Ok(envelope)
    }

    pub fn from_document(document: &Document) -> SigningResult<Self> {
        Self::from_slice(&document.bytes()?)
    }

    pub fn signature_bytes(&self) -> SigningResult<Vec<u8>> {
        decode_field("signature_value", &self.signature_value)
    }

    pub fn certificate_der(&self) -> SigningResult<Vec<u8>> {
        decode_field("signing_certificate", &self.signing_certificate)
    }
}

pub(crate) fn decode_field(field: &str, value: &str) -> SigningResult<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|e| SigningError::FormatError(format!("Field '{field}' is not base64: {e}")))
}

/// JSON envelope format, detached or enveloping depending on the parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedEnvelopeFormat;

impl DetachedEnvelopeFormat {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Signed properties for `document` and every part chained after it.
    pub fn signed_properties(
        &self,
        document: &Document,
        parameters: &SignatureParameters,
    ) -> SigningResult<SignedProperties> {
        let digest_algorithm = parameters.require_digest_algorithm()?;
        let certificate = parameters.require_signing_certificate()?;

        let references = document
            .chain()
            .map(|part| {
                Ok(Reference {
                    name: part.name().to_string(),
                    mime_type: part.mime_type().to_string(),
                    digest: part.digest(digest_algorithm)?,
                })
            })
            .collect::<SigningResult<Vec<_>>>()?;

        Ok(SignedProperties {
            format: ENVELOPE_FORMAT_ID.to_string(),
            digest_algorithm,
            signing_time: parameters.signing_time_unix(),
            signing_certificate_digest: certificate.digest(digest_algorithm).to_base64(),
            packaging: parameters.packaging(),
            references,
            options: parameters.options().clone(),
        })
    }

    fn output_name(document: &Document, packaging: SignaturePackaging) -> String {
        match packaging {
            SignaturePackaging::Detached => format!("{}.sig.json", document.name()),
            SignaturePackaging::Enveloping => format!("{}.signed.json", document.name()),
        }
    }
}

impl SignatureFormat for DetachedEnvelopeFormat {
    fn name(&self) -> &'static str {
        "detached-envelope"
    }

    fn data_to_sign(
        &self,
        document: &Document,
        parameters: &SignatureParameters,
    ) -> SigningResult<ToBeSigned> {
        let properties = self.signed_properties(document, parameters)?;
        let bytes = properties.canonical_bytes()?;
        log::debug!(
            "Canonicalized {} reference(s) into {} bytes",
            properties.references.len(),
            bytes.len()
        );
        Ok(ToBeSigned::new(properties.digest_algorithm, bytes))
    }

    fn timestamp_imprint(
        &self,
        parameters: &SignatureParameters,
        signature: &SignatureValue,
    ) -> SigningResult<DigestBytes> {
        let algorithm = parameters.require_digest_algorithm()?;
        Ok(DigestBytes::compute(algorithm, signature.as_slice()))
    }

    fn embed(
        &self,
        document: &Document,
        parameters: &SignatureParameters,
        key_entry: &KeyEntry,
        to_be_signed: &ToBeSigned,
        signature: &SignatureValue,
        timestamp: Option<&TimestampToken>,
    ) -> SigningResult<Document> {
        // The envelope carries exactly what the token signed.
        let signed_properties = SignedProperties::from_canonical_bytes(to_be_signed.as_slice())?;
        if signature.digest_algorithm() != signed_properties.digest_algorithm {
            return Err(SigningError::FormatError(format!(
                "Signature value uses {} but the signed properties use {}",
                signature.digest_algorithm(),
                signed_properties.digest_algorithm
            )));
        }
        if self.signed_properties(document, parameters)? != signed_properties {
            return Err(SigningError::FormatError(format!(
                "Document '{}' changed after its signed properties were computed",
                document.name()
            )));
        }

        let signature_timestamp = match timestamp {
            Some(token) => {
                let imprint = self.timestamp_imprint(parameters, signature)?;
                if !token.covers(&imprint) {
                    return Err(SigningError::FormatError(
                        "Timestamp token does not cover the signature value".into(),
                    ));
                }
                Some(SignatureTimestamp {
                    digest_algorithm: token.digest_algorithm(),
                    token: BASE64.encode(token.as_der()),
                })
            }
            None => None,
        };

        let contents = match parameters.packaging() {
            SignaturePackaging::Detached => Vec::new(),
            SignaturePackaging::Enveloping => document
                .chain()
                .zip(&signed_properties.references)
                .map(|(part, reference)| {
                    // Read once; the embedded bytes must match the signed reference.
                    let bytes = part.bytes()?;
                    let digest = DigestBytes::compute(signed_properties.digest_algorithm, &bytes);
                    if digest.to_base64() != reference.digest {
                        return Err(SigningError::FormatError(format!(
                            "Part '{}' changed after it was signed",
                            part.name()
                        )));
                    }
                    Ok(EnvelopedContent {
                        name: part.name().to_string(),
                        content: BASE64.encode(bytes),
                    })
                })
                .collect::<SigningResult<Vec<_>>>()?,
        };

        // Parameters win over the key entry for the chain; fall back to what the token holds.
        let chain = if parameters.certificate_chain().is_empty() {
            key_entry.certificate_chain()
        } else {
            parameters.certificate_chain()
        };

        let envelope = SignatureEnvelope {
            signed_properties,
            signature_algorithm: signature.algorithm_name(),
            signature_value: BASE64.encode(signature.as_slice()),
            signing_certificate: BASE64.encode(key_entry.certificate().as_der()),
            certificate_chain: chain.iter().map(|c| BASE64.encode(c.as_der())).collect(),
            signature_timestamp,
            contents,
        };

        let bytes = serde_json::to_vec_pretty(&envelope).map_err(|e| {
            SigningError::FormatError(format!("Failed to serialize signature envelope: {e}"))
        })?;
        let name = Self::output_name(document, parameters.packaging());
        log::debug!("Assembled envelope '{name}' ({} bytes)", bytes.len());
        Ok(Document::from_bytes(name, bytes).with_mime_type(MimeType::Json))
    }
}
