//! `YubiKey` hardware PIV operations adapter.
//!
//! Thin wrapper over the `yubikey` crate: open, PIN verification, slot
//! certificate retrieval and raw private-key operations.

use der::Encode;
use yubikey::piv::{AlgorithmId, SlotId};
use yubikey::YubiKey;

use crate::domain::constants;
use crate::domain::types::{Pin, PivSlot};
use crate::infra::error::{SigningError, SigningResult, TokenFailure};

/// Convert a validated slot to the `yubikey` crate's `SlotId`.
#[must_use]
pub fn slot_id(slot: PivSlot) -> SlotId {
    match slot.as_u8() {
        constants::PIV_SLOT_AUTHENTICATION => SlotId::Authentication,
        constants::PIV_SLOT_KEY_MANAGEMENT => SlotId::KeyManagement,
        constants::PIV_SLOT_CARD_AUTHENTICATION => SlotId::CardAuthentication,
        _ => SlotId::Signature,
    }
}

/// Low-level `YubiKey` PIV operations.
pub struct YubiKeyOperations {
    yubikey: YubiKey,
    authenticated: bool,
}

impl YubiKeyOperations {
    /// Open a connection to the first available `YubiKey`.
    pub fn connect() -> SigningResult<Self> {
        let yubikey = YubiKey::open().map_err(|e| {
            SigningError::token(
                TokenFailure::DeviceAbsent,
                format!("Failed to open YubiKey: {e}"),
            )
        })?;
        log::info!("Connected to YubiKey serial {}", yubikey.serial());
        Ok(Self {
            yubikey,
            authenticated: false,
        })
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Verify PIN to unlock private key operations.
    pub fn authenticate(&mut self, pin: &Pin) -> SigningResult<()> {
        self.yubikey.verify_pin(pin.as_bytes())?;
        self.authenticated = true;
        Ok(())
    }

    /// Raw DER certificate bytes stored in `slot`.
    pub fn certificate_der(&mut self, slot: PivSlot) -> SigningResult<Vec<u8>> {
        let cert = yubikey::Certificate::read(&mut self.yubikey, slot_id(slot)).map_err(|e| {
            SigningError::token(
                TokenFailure::KeyNotFound,
                format!("No certificate in slot {slot}: {e}"),
            )
        })?;
        Ok(cert.cert.to_der()?)
    }

    /// Private-key operation over `input` (a hash for ECC, a padded block for RSA).
    pub fn sign_raw(
        &mut self,
        input: &[u8],
        algorithm: AlgorithmId,
        slot: PivSlot,
    ) -> SigningResult<Vec<u8>> {
        if !self.authenticated {
            return Err(SigningError::token(
                TokenFailure::WrongCredential,
                "PIN has not been verified",
            ));
        }
        let signature = yubikey::piv::sign_data(&mut self.yubikey, input, algorithm, slot_id(slot))?;
        Ok(signature.to_vec())
    }
}
