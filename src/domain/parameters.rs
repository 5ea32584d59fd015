//! Signature parameters: how a document is to be signed.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::domain::crypto::{DigestAlgorithm, EndEntityCert, IntermediateCert};
use crate::infra::error::{SigningError, SigningResult};

/// Where the signed content lives relative to the signature container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignaturePackaging {
    /// Content stays outside the container and is referenced by digest.
    #[default]
    Detached,
    /// Content is carried inside the container.
    Enveloping,
}

impl fmt::Display for SignaturePackaging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignaturePackaging::Detached => f.write_str("detached"),
            SignaturePackaging::Enveloping => f.write_str("enveloping"),
        }
    }
}

impl FromStr for SignaturePackaging {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "detached" => Ok(SignaturePackaging::Detached),
            "enveloping" => Ok(SignaturePackaging::Enveloping),
            _ => Err(SigningError::ParameterError(format!(
                "Unknown signature packaging: {s}"
            ))),
        }
    }
}

/// Configuration describing how a document is to be signed.
///
/// The signing time is fixed when the parameters are built so that the
/// canonical to-be-signed bytes are a pure function of document and parameters.
#[derive(Debug, Clone)]
pub struct SignatureParameters {
    digest_algorithm: Option<DigestAlgorithm>,
    signing_certificate: Option<EndEntityCert>,
    certificate_chain: Vec<IntermediateCert>,
    packaging: SignaturePackaging,
    signing_time: SystemTime,
    options: BTreeMap<String, String>,
}

impl Default for SignatureParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureParameters {
    /// Empty parameters stamped with the current time (whole seconds).
    #[must_use]
    pub fn new() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            digest_algorithm: None,
            signing_certificate: None,
            certificate_chain: Vec::new(),
            packaging: SignaturePackaging::default(),
            signing_time: UNIX_EPOCH + Duration::from_secs(now),
            options: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_digest_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.digest_algorithm = Some(algorithm);
        self
    }

    #[must_use]
    pub fn with_signing_certificate(mut self, certificate: EndEntityCert) -> Self {
        self.signing_certificate = Some(certificate);
        self
    }

    #[must_use]
    pub fn with_certificate_chain(mut self, chain: Vec<IntermediateCert>) -> Self {
        self.certificate_chain = chain;
        self
    }

    #[must_use]
    pub fn with_packaging(mut self, packaging: SignaturePackaging) -> Self {
        self.packaging = packaging;
        self
    }

    /// Override the signing time. Sub-second precision is dropped.
    #[must_use]
    pub fn with_signing_time(mut self, time: SystemTime) -> Self {
        let secs = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.signing_time = UNIX_EPOCH + Duration::from_secs(secs);
        self
    }

    /// Format-specific option, covered by the signature.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        self.digest_algorithm
    }

    pub fn signing_certificate(&self) -> Option<&EndEntityCert> {
        self.signing_certificate.as_ref()
    }

    pub fn certificate_chain(&self) -> &[IntermediateCert] {
        &self.certificate_chain
    }

    pub fn packaging(&self) -> SignaturePackaging {
        self.packaging
    }

    pub fn signing_time(&self) -> SystemTime {
        self.signing_time
    }

    pub fn signing_time_unix(&self) -> u64 {
        self.signing_time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// Digest algorithm, or a parameter error when absent.
    pub fn require_digest_algorithm(&self) -> SigningResult<DigestAlgorithm> {
        self.digest_algorithm.ok_or_else(|| {
            SigningError::ParameterError("Digest algorithm is not set".to_string())
        })
    }

    /// Signing certificate, or a parameter error when absent.
    pub fn require_signing_certificate(&self) -> SigningResult<&EndEntityCert> {
        self.signing_certificate.as_ref().ok_or_else(|| {
            SigningError::ParameterError("Signing certificate is not set".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_parameter_errors() {
        let params = SignatureParameters::new();
        assert!(matches!(
            params.require_digest_algorithm(),
            Err(SigningError::ParameterError(_))
        ));
        assert!(matches!(
            params.require_signing_certificate(),
            Err(SigningError::ParameterError(_))
        ));
    }

    #[test]
    fn signing_time_is_truncated_to_seconds() {
        let t = UNIX_EPOCH + Duration::from_millis(1_700_000_000_750);
        let params = SignatureParameters::new().with_signing_time(t);
        assert_eq!(params.signing_time_unix(), 1_700_000_000);
        assert_eq!(params.signing_time(), UNIX_EPOCH + Duration::from_secs(1_700_000_000));
    }

    #[test]
    fn packaging_parses() {
        assert_eq!(
            "Enveloping".parse::<SignaturePackaging>().unwrap(),
            SignaturePackaging::Enveloping
        );
        assert!("attached".parse::<SignaturePackaging>().is_err());
    }
}
