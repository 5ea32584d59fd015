//! `YubiKey` PIV token.
//!
//! [`PivToken`] exposes one PIV slot as a [`TokenConnection`]. The device is
//! opened on first use and the PIN is requested from the injected
//! [`PinProvider`] right before the first private-key operation.
//!
//! This module requires the `pcsc-backend` feature.

pub mod ops;

use std::sync::{Arc, Mutex};

use openssl::x509::X509;
use yubikey::piv::AlgorithmId;

use crate::adapters::pin::PinProvider;
use crate::adapters::token::TokenConnection;
use crate::domain::constants::{
    DIGEST_INFO_PREFIX_SHA256, DIGEST_INFO_PREFIX_SHA384, DIGEST_INFO_PREFIX_SHA512,
    EC_CURVE_P256_OID, EC_CURVE_P384_OID,
};
use crate::domain::crypto::{DigestAlgorithm, EndEntityCert, KeyAlgorithm, SignatureValue};
use crate::domain::key_entry::{KeyEntry, KeyHandle};
use crate::domain::to_be_signed::ToBeSigned;
use crate::domain::types::PivSlot;
use crate::infra::error::{SigningError, SigningResult, TokenFailure};

use self::ops::YubiKeyOperations;

pub struct PivToken {
    slot: PivSlot,
    pin_provider: Arc<dyn PinProvider>,
    device: Mutex<Option<YubiKeyOperations>>,
}

impl PivToken {
    pub fn new(slot: PivSlot, pin_provider: Arc<dyn PinProvider>) -> Self {
        Self {
            slot,
            pin_provider,
            device: Mutex::new(None),
        }
    }

    fn with_device<T>(
        &self,
        f: impl FnOnce(&mut YubiKeyOperations) -> SigningResult<T>,
    ) -> SigningResult<T> {
        let mut guard = self
            .device
            .lock()
            .map_err(|_| SigningError::token(TokenFailure::DeviceFault, "Device lock poisoned"))?;
        if guard.is_none() {
            *guard = Some(YubiKeyOperations::connect()?);
        }
        match guard.as_mut() {
            Some(device) => f(device),
            None => Err(SigningError::token(
                TokenFailure::DeviceAbsent,
                "YubiKey connection unavailable",
            )),
        }
    }

    fn entry(&self, certificate_der: Vec<u8>) -> SigningResult<KeyEntry> {
        let certificate = EndEntityCert::from_der(certificate_der);
        let key_algorithm = certificate.key_algorithm()?;
        Ok(KeyEntry::new(
            KeyHandle::new(self.slot.to_string()),
            certificate,
            key_algorithm,
        ))
    }

    /// PIV algorithm and card input for `digest` under the slot certificate.
    fn card_input(
        certificate: &EndEntityCert,
        key_algorithm: KeyAlgorithm,
        digest: &[u8],
        digest_algorithm: DigestAlgorithm,
    ) -> SigningResult<(AlgorithmId, Vec<u8>)> {
        match key_algorithm {
            KeyAlgorithm::Ecdsa => {
                let curve = certificate.named_curve()?.unwrap_or_default();
                // ECDSA uses the leftmost field-size bytes of the hash
                let (algorithm, field_len) = match curve.as_str() {
                    EC_CURVE_P256_OID => (AlgorithmId::EccP256, 32),
                    EC_CURVE_P384_OID => (AlgorithmId::EccP384, 48),
                    other => {
                        return Err(SigningError::token(
                            TokenFailure::DeviceFault,
                            format!("Unsupported PIV curve {other}"),
                        ))
                    }
                };
                let take = digest.len().min(field_len);
                Ok((algorithm, digest[..take].to_vec()))
            }
            KeyAlgorithm::Rsa => {
                let bits = X509::from_der(certificate.as_der())
                    .and_then(|c| c.public_key())
                    .map(|k| k.bits())
                    .map_err(|e| SigningError::CertificateError(e.to_string()))?;
                let algorithm = match bits {
                    1024 => AlgorithmId::Rsa1024,
                    2048 => AlgorithmId::Rsa2048,
                    other => {
                        return Err(SigningError::token(
                            TokenFailure::DeviceFault,
                            format!("Unsupported PIV RSA key size {other}"),
                        ))
                    }
                };
                let prefix = match digest_algorithm {
                    DigestAlgorithm::Sha256 => DIGEST_INFO_PREFIX_SHA256,
                    DigestAlgorithm::Sha384 => DIGEST_INFO_PREFIX_SHA384,
                    DigestAlgorithm::Sha512 => DIGEST_INFO_PREFIX_SHA512,
                };
                let digest_info = [prefix, digest].concat();
                Ok((algorithm, pkcs1_v15_pad(&digest_info, bits as usize / 8)?))
            }
        }
    }
}

/// EMSA-PKCS1-v1_5 block: `00 01 FF..FF 00 || DigestInfo`.
fn pkcs1_v15_pad(digest_info: &[u8], modulus_len: usize) -> SigningResult<Vec<u8>> {
    if digest_info.len() + 11 > modulus_len {
        return Err(SigningError::ParameterError(format!(
            "DigestInfo of {} bytes does not fit a {modulus_len} byte modulus",
            digest_info.len()
        )));
    }
    let mut block = Vec::with_capacity(modulus_len);
    block.extend_from_slice(&[0x00, 0x01]);
    block.resize(modulus_len - digest_info.len() - 1, 0xff);
    block.push(0x00);
    block.extend_from_slice(digest_info);
    Ok(block)
}

impl TokenConnection for PivToken {
    fn keys(&self) -> SigningResult<Vec<KeyEntry>> {
        let der = self.with_device(|device| device.certificate_der(self.slot))?;
        Ok(vec![self.entry(der)?])
    }

    fn sign(
        &self,
        data: &ToBeSigned,
        digest_algorithm: DigestAlgorithm,
        key_entry: &KeyEntry,
    ) -> SigningResult<SignatureValue> {
        if key_entry.handle().as_str() != self.slot.to_string() {
            return Err(SigningError::token(
                TokenFailure::KeyNotFound,
                format!("Key '{}' is not held in slot {}", key_entry.handle(), self.slot),
            ));
        }
        let digest = digest_algorithm.digest(data.as_slice());
        let (algorithm, input) = Self::card_input(
            key_entry.certificate(),
            key_entry.key_algorithm(),
            &digest,
            digest_algorithm,
        )?;

        let bytes = self.with_device(|device| {
            let on_card = device.certificate_der(self.slot)?;
            if on_card != key_entry.certificate().as_der() {
                return Err(SigningError::token(
                    TokenFailure::KeyNotFound,
                    format!("Slot {} holds a different certificate", self.slot),
                ));
            }
            if !device.is_authenticated() {
                let pin = self
                    .pin_provider
                    .provide_pin(&format!("YubiKey PIV slot {}", self.slot))?;
                device.authenticate(&pin)?;
            }
            device.sign_raw(&input, algorithm, self.slot)
        })?;

        log::info!("YubiKey slot {} produced {} byte signature", self.slot, bytes.len());
        Ok(SignatureValue::new(
            digest_algorithm,
            key_entry.key_algorithm(),
            bytes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pkcs1_padding_layout() {
        let digest_info = [DIGEST_INFO_PREFIX_SHA256, &[0xab; 32][..]].concat();
        let block = pkcs1_v15_pad(&digest_info, 256).unwrap();
        assert_eq!(block.len(), 256);
        assert_eq!(&block[..2], &[0x00, 0x01]);
        assert_eq!(block[256 - digest_info.len() - 1], 0x00);
        assert!(block[2..256 - digest_info.len() - 1].iter().all(|b| *b == 0xff));
        assert!(pkcs1_v15_pad(&[0u8; 250], 256).is_err());
    }
}
