//! Adapter layer modules for external system integration.
//!
//! Provides adapters for:
//! - signing tokens (software keystore, `YubiKey` PIV)
//! - PIN / password collection
//! - HTTP timestamp authority communication

pub mod keystore;
pub mod pin;
pub mod timestamp_http_client;
pub mod token;
#[cfg(feature = "pcsc-backend")]
pub mod yubikey;

pub use keystore::KeystoreToken;
pub use pin::{CallbackPin, EnvPin, PinProvider, StaticPin, TerminalPin};
pub use timestamp_http_client::HttpTimestampSource;
pub use token::TokenConnection;
#[cfg(feature = "pcsc-backend")]
pub use self::yubikey::PivToken;
