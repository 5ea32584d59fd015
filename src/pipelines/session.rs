//! One signing session: the three-phase protocol and its state machine.
//!
//! ```text
//! Init --prepare--> Prepared --sign--> Signed --finalize--> Finalized
//!   \________________\___________________\_____________> Failed(error)
//! ```
//!
//! `Failed` is terminal and keeps the originating error. Calling a phase out
//! of order fails the session with `InvalidState`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::adapters::token::TokenConnection;
use crate::domain::crypto::SignatureValue;
use crate::domain::document::Document;
use crate::domain::key_entry::KeyEntry;
use crate::domain::parameters::SignatureParameters;
use crate::domain::to_be_signed::ToBeSigned;
use crate::infra::error::{SigningError, SigningResult, TimestampFailure};
use crate::pipelines::sign::SigningContext;

/// Cooperative cancellation flag shared between a caller and a session.
///
/// Honoured before the token is dispatched. Once the token call is running it
/// completes, and a pending cancellation then stops the session before
/// finalization.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Prepared,
    Signed,
    Finalized,
    Failed(SigningError),
}

impl SessionState {
    fn label(&self) -> &'static str {
        match self {
            SessionState::Init => "Init",
            SessionState::Prepared => "Prepared",
            SessionState::Signed => "Signed",
            SessionState::Finalized => "Finalized",
            SessionState::Failed(_) => "Failed",
        }
    }
}

pub struct SigningSession<'a> {
    context: &'a SigningContext,
    document: &'a Document,
    parameters: &'a SignatureParameters,
    key_entry: &'a KeyEntry,
    token: &'a dyn TokenConnection,
    cancellation: CancellationToken,
    state: SessionState,
    to_be_signed: Option<ToBeSigned>,
    signature: Option<SignatureValue>,
}

impl<'a> SigningSession<'a> {
    pub(crate) fn new(
        context: &'a SigningContext,
        document: &'a Document,
        parameters: &'a SignatureParameters,
        key_entry: &'a KeyEntry,
        token: &'a dyn TokenConnection,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            context,
            document,
            parameters,
            key_entry,
            token,
            cancellation,
            state: SessionState::Init,
            to_be_signed: None,
            signature: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn to_be_signed(&self) -> Option<&ToBeSigned> {
        self.to_be_signed.as_ref()
    }

    pub fn signature_value(&self) -> Option<&SignatureValue> {
        self.signature.as_ref()
    }

    /// Run all three phases.
    pub fn run(&mut self) -> SigningResult<Document> {
        self.prepare()?;
        self.sign()?;
        self.finalize()
    }

    /// Phase 1: check parameters and compute the to-be-signed bytes.
    pub fn prepare(&mut self) -> SigningResult<()> {
        self.enter(&SessionState::Init, "prepare")?;
        match self.compute_to_be_signed() {
            Ok(tbs) => {
                log::info!(
                    "Session prepared: {} part(s), {} to-be-signed bytes",
                    self.document.chain_len(),
                    tbs.as_slice().len()
                );
                self.to_be_signed = Some(tbs);
                self.state = SessionState::Prepared;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Phase 2: one token call. Never retried.
    pub fn sign(&mut self) -> SigningResult<()> {
        self.enter(&SessionState::Prepared, "sign")?;
        match self.dispatch() {
            Ok(signature) => {
                log::info!("Token returned {signature:?}");
                self.signature = Some(signature);
                self.state = SessionState::Signed;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Phase 3: optional timestamp, then embedding. Nothing partial escapes.
    pub fn finalize(&mut self) -> SigningResult<Document> {
        self.enter(&SessionState::Signed, "finalize")?;
        match self.assemble() {
            Ok(document) => {
                log::info!("Session finalized: '{}'", document.name());
                self.state = SessionState::Finalized;
                Ok(document)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn compute_to_be_signed(&self) -> SigningResult<ToBeSigned> {
        if self.cancellation.is_cancelled() {
            return Err(SigningError::Cancelled);
        }
        let algorithm = self.parameters.require_digest_algorithm()?;
        let certificate = self.parameters.require_signing_certificate()?;
        if certificate != self.key_entry.certificate() {
            return Err(SigningError::ParameterError(format!(
                "Signing certificate does not belong to key '{}'",
                self.key_entry.handle()
            )));
        }

        if let Some(verifier) = self.context.certificate_verifier() {
            let chain = if self.parameters.certificate_chain().is_empty() {
                self.key_entry.certificate_chain()
            } else {
                self.parameters.certificate_chain()
            };
            let report = verifier
                .verify(certificate, chain, self.parameters.signing_time())
                .map_err(|e| match e {
                    e @ SigningError::CertificateError(_) => e,
                    other => SigningError::CertificateError(other.to_string()),
                })?;
            for warning in &report.warnings {
                log::warn!("{warning}");
            }
        }

        let format = self.context.format();
        log::debug!("Canonicalizing with format '{}'", format.name());
        let tbs = format.data_to_sign(self.document, self.parameters)?;
        if tbs.digest_algorithm() != algorithm {
            return Err(SigningError::ParameterError(format!(
                "Format canonicalized for {} but parameters request {algorithm}",
                tbs.digest_algorithm()
            )));
        }
        Ok(tbs)
    }

    fn dispatch(&self) -> SigningResult<SignatureValue> {
        let algorithm = self.parameters.require_digest_algorithm()?;
        let tbs = self
            .to_be_signed
            .as_ref()
            .ok_or_else(|| SigningError::InvalidState("No to-be-signed bytes".into()))?;
        if tbs.digest_algorithm() != algorithm {
            return Err(SigningError::ParameterError(format!(
                "To-be-signed bytes use {} but the token call would use {algorithm}",
                tbs.digest_algorithm()
            )));
        }
        if self.cancellation.is_cancelled() {
            log::info!("Cancellation honoured before token dispatch");
            return Err(SigningError::Cancelled);
        }

        log::info!(
            "Dispatching {algorithm} signature to token key '{}'",
            self.key_entry.handle()
        );
        let signature = self
            .token
            .sign(tbs, algorithm, self.key_entry)
            .map_err(SigningError::into_token_error)?;

        if signature.digest_algorithm() != algorithm {
            return Err(SigningError::ParameterError(format!(
                "Token signed with {} but parameters request {algorithm}",
                signature.digest_algorithm()
            )));
        }
        Ok(signature)
    }

    fn assemble(&self) -> SigningResult<Document> {
        if self.cancellation.is_cancelled() {
            log::info!("Cancellation honoured after token returned");
            return Err(SigningError::Cancelled);
        }
        let signature = self
            .signature
            .as_ref()
            .ok_or_else(|| SigningError::InvalidState("No signature value".into()))?;
        let tbs = self
            .to_be_signed
            .as_ref()
            .ok_or_else(|| SigningError::InvalidState("No to-be-signed bytes".into()))?;
        let format = self.context.format();

        let timestamp = match self.context.timestamp_source() {
            Some(source) => {
                let imprint = format.timestamp_imprint(self.parameters, signature)?;
                let token = source
                    .timestamp(&imprint)
                    .map_err(SigningError::into_timestamp_error)?;
                if !token.covers(&imprint) {
                    return Err(SigningError::timestamp(
                        TimestampFailure::MalformedResponse,
                        "Timestamp token is not bound to the signature value",
                    ));
                }
                log::info!("Signature timestamped: {token:?}");
                Some(token)
            }
            None => None,
        };

        format.embed(
            self.document,
            self.parameters,
            self.key_entry,
            tbs,
            signature,
            timestamp.as_ref(),
        )
    }

    /// Check the session is in `expected` before running `phase`.
    fn enter(&mut self, expected: &SessionState, phase: &str) -> SigningResult<()> {
        if let SessionState::Failed(original) = &self.state {
            return Err(SigningError::InvalidState(format!(
                "Cannot {phase}: session already failed ({original})"
            )));
        }
        if &self.state != expected {
            let error = SigningError::InvalidState(format!(
                "Cannot {phase} in state {}",
                self.state.label()
            ));
            return Err(self.fail(error));
        }
        Ok(())
    }

    fn fail(&mut self, error: SigningError) -> SigningError {
        log::warn!(
            "Signing session failed in state {}: {error}",
            self.state.label()
        );
        self.to_be_signed = None;
        self.signature = None;
        self.state = SessionState::Failed(error.clone());
        error
    }
}
