//! Error types for document signing sessions.
//!
//! Every phase of a signing session reports through [`SigningError`]. The
//! variant tells the caller which collaborator failed (parameters, token,
//! timestamp authority, storage, signature format); [`SigningError::kind`]
//! flattens that into an [`ErrorKind`] for matching without string inspection.

use std::fmt;

use thiserror::Error;

/// Result type for signing operations
pub type SigningResult<T> = Result<T, SigningError>;

/// Why a signing token refused or failed a key operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFailure {
    /// No device or keystore could be opened.
    DeviceAbsent,
    /// PIN or keystore password rejected.
    WrongCredential,
    /// The user declined to provide a credential.
    UserCancelled,
    /// The requested key is not held by this token.
    KeyNotFound,
    /// The device reported a fault while performing the operation.
    DeviceFault,
}

impl fmt::Display for TokenFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenFailure::DeviceAbsent => "device absent",
            TokenFailure::WrongCredential => "wrong credential",
            TokenFailure::UserCancelled => "cancelled by user",
            TokenFailure::KeyNotFound => "key not found",
            TokenFailure::DeviceFault => "device fault",
        };
        f.write_str(s)
    }
}

/// Why a timestamp authority exchange failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFailure {
    /// Connection to the authority could not be established.
    Unreachable,
    /// The authority did not answer within the configured timeout.
    Timeout,
    /// The authority answered but refused to grant a token.
    Rejected,
    /// The answer could not be parsed or does not match the request.
    MalformedResponse,
}

impl fmt::Display for TimestampFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimestampFailure::Unreachable => "authority unreachable",
            TimestampFailure::Timeout => "timeout",
            TimestampFailure::Rejected => "request rejected",
            TimestampFailure::MalformedResponse => "malformed response",
        };
        f.write_str(s)
    }
}

/// Flat discriminant of [`SigningError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parameter,
    Token,
    Timestamp,
    Io,
    Format,
    Certificate,
    Configuration,
    Cancelled,
    InvalidState,
}

/// Structured error taxonomy for signing sessions
#[derive(Error, Debug, Clone, PartialEq, Eq, miette::Diagnostic)]
pub enum SigningError {
    #[error("Parameter error: {0}")]
    #[diagnostic(code(token_signer::parameter))]
    ParameterError(String),

    #[error("Token error ({kind}): {message}")]
    #[diagnostic(code(token_signer::token))]
    TokenError { kind: TokenFailure, message: String },

    #[error("Timestamp error ({kind}): {message}")]
    #[diagnostic(code(token_signer::timestamp))]
    TimestampError {
        kind: TimestampFailure,
        message: String,
    },

    #[error("IO error: {0}")]
    #[diagnostic(code(token_signer::io))]
    IoError(String),

    #[error("Signature format error: {0}")]
    #[diagnostic(code(token_signer::format))]
    FormatError(String),

    #[error("Certificate error: {0}")]
    #[diagnostic(code(token_signer::certificate))]
    CertificateError(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(token_signer::configuration))]
    ConfigurationError(String),

    #[error("Signing session cancelled")]
    #[diagnostic(code(token_signer::cancelled))]
    Cancelled,

    #[error("Invalid session state: {0}")]
    #[diagnostic(code(token_signer::state))]
    InvalidState(String),
}

impl SigningError {
    pub fn token(kind: TokenFailure, message: impl Into<String>) -> Self {
        SigningError::TokenError {
            kind,
            message: message.into(),
        }
    }

    pub fn timestamp(kind: TimestampFailure, message: impl Into<String>) -> Self {
        SigningError::TimestampError {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SigningError::ParameterError(_) => ErrorKind::Parameter,
            SigningError::TokenError { .. } => ErrorKind::Token,
            SigningError::TimestampError { .. } => ErrorKind::Timestamp,
            SigningError::IoError(_) => ErrorKind::Io,
            SigningError::FormatError(_) => ErrorKind::Format,
            SigningError::CertificateError(_) => ErrorKind::Certificate,
            SigningError::ConfigurationError(_) => ErrorKind::Configuration,
            SigningError::Cancelled => ErrorKind::Cancelled,
            SigningError::InvalidState(_) => ErrorKind::InvalidState,
        }
    }

    /// Re-wrap a failure reported by a token as a token error, keeping
    /// errors that already are token errors untouched.
    #[must_use]
    pub fn into_token_error(self) -> Self {
        match self {
            e @ SigningError::TokenError { .. } => e,
            other => SigningError::token(TokenFailure::DeviceFault, other.to_string()),
        }
    }

    /// Re-wrap a failure reported by a timestamp source as a timestamp error.
    #[must_use]
    pub fn into_timestamp_error(self) -> Self {
        match self {
            e @ SigningError::TimestampError { .. } => e,
            other => SigningError::timestamp(TimestampFailure::Rejected, other.to_string()),
        }
    }
}

impl From<std::io::Error> for SigningError {
    fn from(error: std::io::Error) -> Self {
        SigningError::IoError(error.to_string())
    }
}

impl From<der::Error> for SigningError {
    fn from(error: der::Error) -> Self {
        SigningError::CertificateError(error.to_string())
    }
}

impl From<serde_json::Error> for SigningError {
    fn from(error: serde_json::Error) -> Self {
        SigningError::FormatError(error.to_string())
    }
}

#[cfg(feature = "pcsc-backend")]
impl From<yubikey::Error> for SigningError {
    fn from(error: yubikey::Error) -> Self {
        let kind = match error {
            yubikey::Error::NotFound | yubikey::Error::PcscError { .. } => {
                TokenFailure::DeviceAbsent
            }
            yubikey::Error::WrongPin { .. } | yubikey::Error::PinLocked => {
                TokenFailure::WrongCredential
            }
            _ => TokenFailure::DeviceFault,
        };
        SigningError::token(kind, error.to_string())
    }
}
