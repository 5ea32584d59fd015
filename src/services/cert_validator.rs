//! Certificate validation service.
//!
//! [`CertificateVerifier`] is the seam the orchestrator calls before any key
//! operation. [`BasicCertificateVerifier`] checks what can be decided from the
//! certificate alone; trust-path building and revocation belong elsewhere.

use std::time::{Duration, SystemTime};

use x509_cert::ext::pkix::KeyUsage;
use x509_cert::Certificate;

use crate::domain::crypto::{EndEntityCert, IntermediateCert};
use crate::infra::error::{SigningError, SigningResult};

const SECONDS_PER_DAY: u64 = 86_400;

/// Outcome of a successful certificate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateReport {
    pub subject: String,
    pub issuer: String,
    pub serial_number: String,
    /// Whole days between the checked instant and `notAfter`.
    pub days_until_expiry: u64,
    pub self_signed: bool,
    pub warnings: Vec<String>,
}

/// Validates that a certificate may be used to sign at a given instant.
pub trait CertificateVerifier: Send + Sync {
    /// Return a report, or `CertificateError` when the certificate must not be used.
    fn verify(
        &self,
        certificate: &EndEntityCert,
        chain: &[IntermediateCert],
        at: SystemTime,
    ) -> SigningResult<CertificateReport>;
}

/// Validity window, key usage and self-signed policy checks.
#[derive(Debug, Clone)]
pub struct BasicCertificateVerifier {
    allow_self_signed: bool,
    expiry_warning: Duration,
}

impl Default for BasicCertificateVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicCertificateVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            allow_self_signed: true,
            expiry_warning: Duration::from_secs(30 * SECONDS_PER_DAY),
        }
    }

    #[must_use]
    pub fn allow_self_signed(mut self, allow: bool) -> Self {
        self.allow_self_signed = allow;
        self
    }

    #[must_use]
    pub fn expiry_warning_days(mut self, days: u32) -> Self {
        self.expiry_warning = Duration::from_secs(u64::from(days) * SECONDS_PER_DAY);
        self
    }

    fn check_validity(certificate: &Certificate, at: SystemTime) -> SigningResult<Duration> {
        let validity = &certificate.tbs_certificate.validity;
        let not_before = validity.not_before.to_system_time();
        let not_after = validity.not_after.to_system_time();
        if at < not_before {
            return Err(SigningError::CertificateError(format!(
                "Certificate is not valid before {}",
                validity.not_before
            )));
        }
        not_after.duration_since(at).map_err(|_| {
            SigningError::CertificateError(format!(
                "Certificate expired at {}",
                validity.not_after
            ))
        })
    }

    /// `None` when the extension is absent.
    fn signing_key_usage(certificate: &Certificate) -> SigningResult<Option<bool>> {
        let key_usage = certificate
            .tbs_certificate
            .get::<KeyUsage>()
            .map_err(|e| SigningError::CertificateError(format!("Invalid keyUsage: {e}")))?;
        Ok(key_usage.map(|(_, ku)| ku.digital_signature() || ku.non_repudiation()))
    }
}

impl CertificateVerifier for BasicCertificateVerifier {
    fn verify(
        &self,
        certificate: &EndEntityCert,
        chain: &[IntermediateCert],
        at: SystemTime,
    ) -> SigningResult<CertificateReport> {
        let parsed = certificate.parse()?;
        let tbs = &parsed.tbs_certificate;
        let subject = tbs.subject.to_string();
        log::info!("Validating signing certificate: {subject}");

        let remaining = Self::check_validity(&parsed, at)?;

        if Self::signing_key_usage(&parsed)? == Some(false) {
            return Err(SigningError::CertificateError(format!(
                "Certificate '{subject}' keyUsage allows neither digitalSignature nor nonRepudiation"
            )));
        }

        let self_signed = tbs.subject == tbs.issuer;
        if self_signed && !self.allow_self_signed {
            return Err(SigningError::CertificateError(format!(
                "Certificate '{subject}' is self-signed"
            )));
        }

        let mut warnings = Vec::new();
        let days_until_expiry = remaining.as_secs() / SECONDS_PER_DAY;
        if remaining < self.expiry_warning {
            warnings.push(format!("Certificate expires in {days_until_expiry} days"));
        }
        if self_signed {
            warnings.push("Certificate is self-signed - may not be trusted by all systems".into());
        } else if chain.is_empty() {
            warnings.push("No intermediate certificates supplied".into());
        }
        for warning in &warnings {
            log::warn!("{warning}");
        }

        Ok(CertificateReport {
            subject,
            issuer: tbs.issuer.to_string(),
            serial_number: hex::encode(tbs.serial_number.as_bytes()),
            days_until_expiry,
            self_signed,
            warnings,
        })
    }
}
