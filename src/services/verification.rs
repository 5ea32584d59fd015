//! Verification service: checks a signature envelope against its parts.
//!
//! Each check is independent; a failing check is recorded in the report
//! rather than aborting, so callers see every problem at once.

use openssl::hash::MessageDigest;
use openssl::sign::Verifier;
use openssl::x509::X509;

use crate::domain::crypto::{DigestAlgorithm, DigestBytes, EndEntityCert};
use crate::domain::document::Document;
use crate::domain::timestamp::TimestampToken;
use crate::domain::verification::VerificationReport;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::envelope::{decode_field, Reference, SignatureEnvelope};

/// OpenSSL digest matching a [`DigestAlgorithm`].
#[must_use]
pub fn openssl_digest(algorithm: DigestAlgorithm) -> MessageDigest {
    match algorithm {
        DigestAlgorithm::Sha256 => MessageDigest::sha256(),
        DigestAlgorithm::Sha384 => MessageDigest::sha384(),
        DigestAlgorithm::Sha512 => MessageDigest::sha512(),
    }
}

/// Service verifying signature envelopes produced by the envelope format.
#[derive(Debug, Default)]
pub struct VerificationService;

impl VerificationService {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Verify `signature` (an envelope document). Detached parts are looked up
    /// in `detached` by name, falling back to position.
    pub fn verify(
        &self,
        signature: &Document,
        detached: &[Document],
    ) -> SigningResult<VerificationReport> {
        let envelope = match SignatureEnvelope::from_document(signature) {
            Ok(envelope) => envelope,
            Err(SigningError::IoError(e)) => return Err(SigningError::IoError(e)),
            Err(e) => return Ok(VerificationReport::unreadable(e.to_string())),
        };
        Ok(self.verify_envelope(&envelope, detached))
    }

    pub fn verify_envelope(
        &self,
        envelope: &SignatureEnvelope,
        detached: &[Document],
    ) -> VerificationReport {
        let mut problems = Vec::new();
        let properties = &envelope.signed_properties;
        let algorithm = properties.digest_algorithm;

        let signature_bytes = envelope.signature_bytes();
        let certificate_der = envelope.certificate_der();

        let certificate_ok = match &certificate_der {
            Ok(der) => {
                let digest = EndEntityCert::from_der(der.clone()).digest(algorithm);
                let ok = digest.to_base64() == properties.signing_certificate_digest;
                if !ok {
                    problems.push("Signing certificate does not match the signed digest".into());
                }
                ok
            }
            Err(e) => {
                problems.push(e.to_string());
                false
            }
        };

        let signature_ok = match (&certificate_der, &signature_bytes) {
            (Ok(der), Ok(sig)) => match Self::check_signature(envelope, der, sig) {
                Ok(true) => true,
                Ok(false) => {
                    problems.push("Signature value does not verify".into());
                    false
                }
                Err(e) => {
                    problems.push(e.to_string());
                    false
                }
            },
            (_, Err(e)) => {
                problems.push(e.to_string());
                false
            }
            _ => false,
        };

        let mut references_ok = !properties.references.is_empty();
        for (index, reference) in properties.references.iter().enumerate() {
            if let Err(problem) = Self::check_reference(envelope, reference, index, detached) {
                problems.push(problem);
                references_ok = false;
            }
        }

        let timestamped = envelope.signature_timestamp.is_some();
        let timestamp_ok = match (&envelope.signature_timestamp, &signature_bytes) {
            (None, _) => true,
            (Some(ts), Ok(sig)) => {
                match decode_field("signature_timestamp", &ts.token)
                    .and_then(TimestampToken::from_der)
                {
                    Ok(token) => {
                        let imprint = DigestBytes::compute(token.digest_algorithm(), sig);
                        let ok = token.covers(&imprint)
                            && token.digest_algorithm() == ts.digest_algorithm;
                        if !ok {
                            problems.push("Timestamp does not cover the signature value".into());
                        }
                        ok
                    }
                    Err(e) => {
                        problems.push(e.to_string());
                        false
                    }
                }
            }
            (Some(_), Err(_)) => false,
        };

        let report = VerificationReport {
            signature_ok,
            certificate_ok,
            references_ok,
            timestamp_ok,
            timestamped,
            problems,
        };
        if report.success() {
            log::info!(
                "Signature envelope verified ({} reference(s))",
                properties.references.len()
            );
        } else {
            for problem in &report.problems {
                log::warn!("Verification problem: {problem}");
            }
        }
        report
    }

    fn check_signature(
        envelope: &SignatureEnvelope,
        certificate_der: &[u8],
        signature: &[u8],
    ) -> SigningResult<bool> {
        let canonical = envelope.signed_properties.canonical_bytes()?;
        let certificate = X509::from_der(certificate_der)
            .map_err(|e| SigningError::CertificateError(format!("Invalid certificate: {e}")))?;
        let public_key = certificate
            .public_key()
            .map_err(|e| SigningError::CertificateError(format!("No usable public key: {e}")))?;
        let digest = openssl_digest(envelope.signed_properties.digest_algorithm);
        let crypto = |e: openssl::error::ErrorStack| {
            SigningError::FormatError(format!("Signature check failed: {e}"))
        };
        let mut verifier = Verifier::new(digest, &public_key).map_err(crypto)?;
        verifier.update(&canonical).map_err(crypto)?;
        // OpenSSL reports malformed signatures as errors; treat them as a failed check.
        Ok(verifier.verify(signature).unwrap_or(false))
    }

    fn check_reference(
        envelope: &SignatureEnvelope,
        reference: &Reference,
        index: usize,
        detached: &[Document],
    ) -> Result<(), String> {
        let algorithm = envelope.signed_properties.digest_algorithm;
        let actual = if envelope.contents.is_empty() {
            let part = detached
                .iter()
                .find(|d| d.name() == reference.name)
                .or_else(|| detached.get(index))
                .ok_or_else(|| format!("Detached part '{}' was not supplied", reference.name))?;
            part.digest(algorithm).map_err(|e| e.to_string())?
        } else {
            let content = envelope
                .contents
                .iter()
                .find(|c| c.name == reference.name)
                .ok_or_else(|| format!("Enveloped part '{}' is missing", reference.name))?;
            let bytes = decode_field("contents", &content.content).map_err(|e| e.to_string())?;
            DigestBytes::compute(algorithm, &bytes).to_base64()
        };
        if actual == reference.digest {
            Ok(())
        } else {
            Err(format!("Digest of part '{}' does not match", reference.name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparseable_envelope_reports_failure() {
        let doc = Document::from_bytes("x.sig.json", b"not json".to_vec());
        let report = VerificationService::new().verify(&doc, &[]).unwrap();
        assert!(!report.success());
        assert!(!report.problems.is_empty());
    }

    #[test]
    fn digest_mapping_sizes() {
        for algorithm in [
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ] {
            assert_eq!(openssl_digest(algorithm).size(), algorithm.digest_size());
        }
    }
}
