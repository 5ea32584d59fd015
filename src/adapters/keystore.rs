//! Software keystore token backed by OpenSSL.
//!
//! Loads keys from PKCS#12 files (or PEM key + certificate pairs) and signs
//! with them in process. Private keys never leave this module; callers only
//! see [`KeyEntry`] values.

use std::path::Path;
use std::sync::Mutex;

use openssl::pkcs12::Pkcs12;
use openssl::pkey::{Id, PKey, Private};
use openssl::sign::Signer;
use openssl::x509::X509;

use crate::adapters::pin::PinProvider;
use crate::adapters::token::TokenConnection;
use crate::domain::crypto::{
    DigestAlgorithm, EndEntityCert, IntermediateCert, KeyAlgorithm, SignatureValue,
};
use crate::domain::key_entry::{KeyEntry, KeyHandle};
use crate::domain::to_be_signed::ToBeSigned;
use crate::domain::types::Pin;
use crate::infra::error::{SigningError, SigningResult, TokenFailure};
use crate::services::verification::openssl_digest;

struct StoredKey {
    entry: KeyEntry,
    key: PKey<Private>,
}

pub struct KeystoreToken {
    keys: Mutex<Vec<StoredKey>>,
}

impl KeystoreToken {
    /// Open a PKCS#12 file, asking `pin_provider` for its password.
    /// The key is registered under the file stem.
    pub fn from_pkcs12_file<P: AsRef<Path>>(
        path: P,
        pin_provider: &dyn PinProvider,
    ) -> SigningResult<Self> {
        let path = path.as_ref();
        let der = std::fs::read(path).map_err(|e| {
            SigningError::token(
                TokenFailure::DeviceAbsent,
                format!("Cannot open keystore {}: {e}", path.display()),
            )
        })?;
        let alias = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "keystore".to_string());
        let password = pin_provider.provide_pin(&format!("keystore {}", path.display()))?;
        Self::from_pkcs12_der(alias, &der, &password)
    }

    pub fn from_pkcs12_der(
        alias: impl Into<String>,
        der: &[u8],
        password: &Pin,
    ) -> SigningResult<Self> {
        let pkcs12 = Pkcs12::from_der(der).map_err(|e| {
            SigningError::token(
                TokenFailure::DeviceFault,
                format!("Not a PKCS#12 keystore: {e}"),
            )
        })?;
        let parsed = pkcs12.parse2(password.as_str()).map_err(|e| {
            SigningError::token(
                TokenFailure::WrongCredential,
                format!("Keystore password rejected: {e}"),
            )
        })?;
        let key = parsed.pkey.ok_or_else(|| {
            SigningError::token(TokenFailure::KeyNotFound, "Keystore holds no private key")
        })?;
        let cert = parsed.cert.ok_or_else(|| {
            SigningError::token(TokenFailure::KeyNotFound, "Keystore holds no certificate")
        })?;
        let chain = parsed
            .ca
            .map(|stack| stack.iter().map(|c| c.to_der()).collect::<Result<Vec<_>, _>>())
            .transpose()
            .map_err(device_fault)?
            .unwrap_or_default();

        let token = Self::empty();
        token.insert(alias.into(), key, &cert, chain)?;
        Ok(token)
    }

    /// Key and certificate from PEM text.
    pub fn from_pem(alias: impl Into<String>, key_pem: &[u8], cert_pem: &[u8]) -> SigningResult<Self> {
        let key = PKey::private_key_from_pem(key_pem).map_err(|e| {
            SigningError::token(TokenFailure::DeviceFault, format!("Invalid PEM key: {e}"))
        })?;
        let cert = X509::from_pem(cert_pem).map_err(|e| {
            SigningError::CertificateError(format!("Invalid PEM certificate: {e}"))
        })?;
        let token = Self::empty();
        token.insert(alias.into(), key, &cert, Vec::new())?;
        Ok(token)
    }

    fn empty() -> Self {
        Self {
            keys: Mutex::new(Vec::new()),
        }
    }

    fn insert(
        &self,
        alias: String,
        key: PKey<Private>,
        cert: &X509,
        chain: Vec<Vec<u8>>,
    ) -> SigningResult<()> {
        let key_algorithm = match key.id() {
            Id::RSA => KeyAlgorithm::Rsa,
            Id::EC => KeyAlgorithm::Ecdsa,
            other => {
                return Err(SigningError::token(
                    TokenFailure::DeviceFault,
                    format!("Unsupported key type {other:?}"),
                ))
            }
        };
        let cert_public = cert.public_key().map_err(device_fault)?;
        if !key.public_eq(&cert_public) {
            return Err(SigningError::CertificateError(format!(
                "Certificate for '{alias}' does not belong to its private key"
            )));
        }
        let certificate = EndEntityCert::from_der(cert.to_der().map_err(device_fault)?);
        let entry = KeyEntry::new(KeyHandle::new(alias), certificate, key_algorithm)
            .with_chain(chain.into_iter().map(IntermediateCert::from_der).collect());
        log::debug!(
            "Keystore key '{}' loaded ({})",
            entry.handle(),
            entry.key_algorithm()
        );
        self.lock()?.push(StoredKey { entry, key });
        Ok(())
    }

    fn lock(&self) -> SigningResult<std::sync::MutexGuard<'_, Vec<StoredKey>>> {
        self.keys
            .lock()
            .map_err(|_| SigningError::token(TokenFailure::DeviceFault, "Keystore lock poisoned"))
    }
}

fn device_fault(e: openssl::error::ErrorStack) -> SigningError {
    SigningError::token(TokenFailure::DeviceFault, e.to_string())
}

impl TokenConnection for KeystoreToken {
    fn keys(&self) -> SigningResult<Vec<KeyEntry>> {
        Ok(self.lock()?.iter().map(|k| k.entry.clone()).collect())
    }

    fn sign(
        &self,
        data: &ToBeSigned,
        digest_algorithm: DigestAlgorithm,
        key_entry: &KeyEntry,
    ) -> SigningResult<SignatureValue> {
        let keys = self.lock()?;
        let stored = keys
            .iter()
            .find(|k| k.entry.handle() == key_entry.handle())
            .filter(|k| k.entry.certificate() == key_entry.certificate())
            .ok_or_else(|| {
                SigningError::token(
                    TokenFailure::KeyNotFound,
                    format!("No key '{}' with that certificate", key_entry.handle()),
                )
            })?;

        let mut signer =
            Signer::new(openssl_digest(digest_algorithm), &stored.key).map_err(device_fault)?;
        signer.update(data.as_slice()).map_err(device_fault)?;
        let bytes = signer.sign_to_vec().map_err(device_fault)?;
        log::debug!(
            "Keystore produced {} byte signature with '{}'",
            bytes.len(),
            key_entry.handle()
        );
        Ok(SignatureValue::new(
            digest_algorithm,
            stored.entry.key_algorithm(),
            bytes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::asn1::Asn1Time;
    use openssl::hash::MessageDigest;
    use openssl::rsa::Rsa;
    use openssl::x509::{X509Builder, X509NameBuilder};

    fn key_and_cert() -> (PKey<Private>, X509) {
        let pkey = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", "Keystore Test").unwrap();
        let name = name.build();
        let mut builder = X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&pkey).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(30).unwrap())
            .unwrap();
        builder.sign(&pkey, MessageDigest::sha256()).unwrap();
        (pkey, builder.build())
    }

    fn pkcs12(password: &str) -> Vec<u8> {
        let (pkey, cert) = key_and_cert();
        Pkcs12::builder()
            .name("signer")
            .pkey(&pkey)
            .cert(&cert)
            .build2(password)
            .unwrap()
            .to_der()
            .unwrap()
    }

    #[test]
    fn wrong_password_is_wrong_credential() {
        let der = pkcs12("correct");
        let err = KeystoreToken::from_pkcs12_der("signer", &der, &Pin::new("wrong").unwrap())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SigningError::TokenError {
                kind: TokenFailure::WrongCredential,
                ..
            }
        ));
    }

    #[test]
    fn rsa_signatures_are_deterministic() {
        let der = pkcs12("pw");
        let token = KeystoreToken::from_pkcs12_der("signer", &der, &Pin::new("pw").unwrap()).unwrap();
        let entry = token.keys().unwrap().remove(0);
        assert_eq!(entry.key_algorithm(), KeyAlgorithm::Rsa);

        let tbs = ToBeSigned::new(DigestAlgorithm::Sha256, b"canonical".to_vec());
        let a = token.sign(&tbs, DigestAlgorithm::Sha256, &entry).unwrap();
        let b = token.sign(&tbs, DigestAlgorithm::Sha256, &entry).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_slice().len(), 256);
    }

    #[test]
    fn unknown_handle_is_key_not_found() {
        let der = pkcs12("pw");
        let token = KeystoreToken::from_pkcs12_der("signer", &der, &Pin::new("pw").unwrap()).unwrap();
        let entry = token.keys().unwrap().remove(0);
        let other = KeyEntry::new(
            KeyHandle::new("other"),
            entry.certificate().clone(),
            KeyAlgorithm::Rsa,
        );
        let tbs = ToBeSigned::new(DigestAlgorithm::Sha256, b"x".to_vec());
        assert!(matches!(
            token.sign(&tbs, DigestAlgorithm::Sha256, &other),
            Err(SigningError::TokenError {
                kind: TokenFailure::KeyNotFound,
                ..
            })
        ));
    }

    #[test]
    fn pem_pair_must_match() {
        let (pkey, cert) = key_and_cert();
        let (other_key, _) = key_and_cert();
        let cert_pem = cert.to_pem().unwrap();
        assert!(KeystoreToken::from_pem(
            "pem",
            &pkey.private_key_to_pem_pkcs8().unwrap(),
            &cert_pem
        )
        .is_ok());
        assert!(KeystoreToken::from_pem(
            "pem",
            &other_key.private_key_to_pem_pkcs8().unwrap(),
            &cert_pem
        )
        .is_err());
    }
}
