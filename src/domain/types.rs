//! Type-safe wrappers using new-type pattern
//!
//! This module provides type-safe wrappers for various inputs to prevent
//! common errors and improve API safety.

use std::fmt;
use std::str::FromStr;

use crate::domain::constants::VALID_PIV_SLOTS;
use crate::infra::error::{SigningError, SigningResult};

/// Type-safe wrapper for timestamp authority URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampUrl(String);

impl TimestampUrl {
    /// Create a new `TimestampUrl` after validation
    pub fn new(url: impl AsRef<str>) -> SigningResult<Self> {
        let url = url.as_ref().trim();
        Self::validate_url(url)?;
        Ok(TimestampUrl(url.to_string()))
    }

    /// Get the URL as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate_url(url: &str) -> SigningResult<()> {
        let parsed = reqwest::Url::parse(url).map_err(|e| {
            SigningError::ConfigurationError(format!("Invalid timestamp URL '{url}': {e}"))
        })?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(SigningError::ConfigurationError(format!(
                    "Timestamp URL must use http or https, got: {other}"
                )))
            }
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(SigningError::ConfigurationError(format!(
                "Timestamp URL has no host: {url}"
            )));
        }
        Ok(())
    }
}

impl FromStr for TimestampUrl {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TimestampUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Secret used to unlock a token (PIV PIN, keystore password).
#[derive(Clone)]
pub struct Pin(String);

impl Pin {
    /// Create a new `Pin`; empty secrets are rejected.
    pub fn new(pin: impl Into<String>) -> SigningResult<Self> {
        let pin = pin.into();
        if pin.is_empty() {
            return Err(SigningError::ParameterError("PIN must not be empty".into()));
        }
        Ok(Pin(pin))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

// Never print the secret
impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin([REDACTED])")
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[PIN REDACTED]")
    }
}

/// Type-safe wrapper for PIV slot IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PivSlot(u8);

impl PivSlot {
    /// Create a new `PivSlot` after validation
    pub fn new(slot: u8) -> SigningResult<Self> {
        if VALID_PIV_SLOTS.contains(&slot) {
            Ok(PivSlot(slot))
        } else {
            Err(SigningError::ParameterError(format!(
                "Invalid PIV slot 0x{slot:02x}. Valid slots: 0x9a (Auth), 0x9c (Sign), 0x9d (KeyMgmt), 0x9e (CardAuth)"
            )))
        }
    }

    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl FromStr for PivSlot {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_start_matches("0x").trim_start_matches("0X");
        let slot = u8::from_str_radix(trimmed, 16).map_err(|_| {
            SigningError::ParameterError(format!(
                "Invalid slot format '{s}'. Expected hex value (9a, 9c, 9d, or 9e)"
            ))
        })?;
        Self::new(slot)
    }
}

impl fmt::Display for PivSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}
