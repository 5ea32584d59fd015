//! PIN and password collection.
//!
//! Tokens ask a [`PinProvider`] for their secret at the moment they need it.
//! Providers are handed to the token by the caller; nothing here is global.

use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use crate::domain::types::Pin;
use crate::infra::error::{SigningError, SigningResult, TokenFailure};

pub trait PinProvider: Send + Sync {
    /// `context` names what the secret unlocks, e.g. `"keystore signer.p12"`.
    fn provide_pin(&self, context: &str) -> SigningResult<Pin>;
}

/// Pre-supplied secret for automated flows.
#[derive(Debug, Clone)]
pub struct StaticPin(Pin);

impl StaticPin {
    #[must_use]
    pub fn new(pin: Pin) -> Self {
        Self(pin)
    }
}

impl PinProvider for StaticPin {
    fn provide_pin(&self, _context: &str) -> SigningResult<Pin> {
        Ok(self.0.clone())
    }
}

/// Reads the secret from an environment variable at request time.
#[derive(Debug, Clone)]
pub struct EnvPin {
    variable: String,
}

impl EnvPin {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }
}

impl PinProvider for EnvPin {
    fn provide_pin(&self, context: &str) -> SigningResult<Pin> {
        let value = std::env::var(&self.variable).map_err(|_| {
            SigningError::token(
                TokenFailure::UserCancelled,
                format!("No secret for {context}: ${} is not set", self.variable),
            )
        })?;
        Pin::new(value)
    }
}

/// Delegates to a caller-supplied closure (API callback, GUI bridge).
pub struct CallbackPin<F>(F);

impl<F> CallbackPin<F>
where
    F: Fn(&str) -> SigningResult<Pin> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

impl<F> PinProvider for CallbackPin<F>
where
    F: Fn(&str) -> SigningResult<Pin> + Send + Sync,
{
    fn provide_pin(&self, context: &str) -> SigningResult<Pin> {
        (self.0)(context)
    }
}

/// Prompts on stderr and reads one line from stdin. An empty answer cancels.
#[derive(Debug, Default)]
pub struct TerminalPin {
    // stdin is shared; one prompt at a time
    lock: Mutex<()>,
}

impl TerminalPin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read_answer(context: &str, input: &mut dyn BufRead, prompt: &mut dyn Write) -> SigningResult<Pin> {
        write!(prompt, "Enter PIN for {context}: ")?;
        prompt.flush()?;
        let mut line = String::new();
        input.read_line(&mut line)?;
        let answer = line.trim_end_matches(['\r', '\n']);
        if answer.is_empty() {
            return Err(SigningError::token(
                TokenFailure::UserCancelled,
                format!("No PIN entered for {context}"),
            ));
        }
        Pin::new(answer)
    }
}

impl PinProvider for TerminalPin {
    fn provide_pin(&self, context: &str) -> SigningResult<Pin> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| SigningError::token(TokenFailure::DeviceFault, "PIN prompt poisoned"))?;
        let stdin = io::stdin();
        let mut input = stdin.lock();
        Self::read_answer(context, &mut input, &mut io::stderr())
    }
}
