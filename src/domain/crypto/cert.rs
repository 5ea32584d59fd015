use std::fmt;

use der::asn1::ObjectIdentifier;
use der::Decode;
use x509_cert::Certificate;

use super::{DigestAlgorithm, DigestBytes};
use crate::domain::constants::{EC_PUBLIC_KEY_OID, RSA_ENCRYPTION_OID};
use crate::infra::error::{SigningError, SigningResult};

/// Public-key algorithm family of a signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Rsa,
    Ecdsa,
}

impl KeyAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa => "RSA",
            KeyAlgorithm::Ecdsa => "ECDSA",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// End-entity signing certificate wrapper.
#[derive(Clone, PartialEq, Eq)]
pub struct EndEntityCert {
    der: Box<[u8]>,
}

/// Intermediate certificate wrapper.
#[derive(Clone, PartialEq, Eq)]
pub struct IntermediateCert {
    der: Box<[u8]>,
}

impl EndEntityCert {
    #[must_use]
    pub fn from_der(der: Vec<u8>) -> Self {
        Self {
            der: der.into_boxed_slice(),
        }
    }
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Parse into an X.509 structure.
    pub fn parse(&self) -> SigningResult<Certificate> {
        Certificate::from_der(&self.der).map_err(|e| {
            SigningError::CertificateError(format!("Failed to parse certificate: {e}"))
        })
    }

    /// Digest over the DER encoding, used to bind a signature to its certificate.
    #[must_use]
    pub fn digest(&self, algorithm: DigestAlgorithm) -> DigestBytes {
        DigestBytes::compute(algorithm, &self.der)
    }

    /// Subject distinguished name in RFC 4514 form.
    pub fn subject(&self) -> SigningResult<String> {
        Ok(self.parse()?.tbs_certificate.subject.to_string())
    }

    /// Key algorithm family from the subject public key info.
    pub fn key_algorithm(&self) -> SigningResult<KeyAlgorithm> {
        let cert = self.parse()?;
        let oid = cert.tbs_certificate.subject_public_key_info.algorithm.oid;
        match oid.to_string().as_str() {
            RSA_ENCRYPTION_OID => Ok(KeyAlgorithm::Rsa),
            EC_PUBLIC_KEY_OID => Ok(KeyAlgorithm::Ecdsa),
            other => Err(SigningError::CertificateError(format!(
                "Unsupported public key algorithm {other}"
            ))),
        }
    }

    /// Named curve OID (dotted form) for EC keys, `None` for RSA.
    pub fn named_curve(&self) -> SigningResult<Option<String>> {
        let cert = self.parse()?;
        let algorithm = &cert.tbs_certificate.subject_public_key_info.algorithm;
        if algorithm.oid.to_string() != EC_PUBLIC_KEY_OID {
            return Ok(None);
        }
        let params = algorithm.parameters.as_ref().ok_or_else(|| {
            SigningError::CertificateError("EC key without curve parameters".into())
        })?;
        let curve: ObjectIdentifier = params.decode_as()?;
        Ok(Some(curve.to_string()))
    }
}

impl IntermediateCert {
    #[must_use]
    pub fn from_der(der: Vec<u8>) -> Self {
        Self {
            der: der.into_boxed_slice(),
        }
    }
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
}

impl fmt::Debug for EndEntityCert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EndEntityCert(len={})", self.der.len())
    }
}
impl fmt::Debug for IntermediateCert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IntermediateCert(len={})", self.der.len())
    }
}
