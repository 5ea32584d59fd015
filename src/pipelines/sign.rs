//! Signing orchestration.
//!
//! [`SigningContext`] holds the collaborators shared by every session: the
//! signature format, an optional timestamp source and an optional certificate
//! verifier. [`SigningOrchestrator`] opens a [`SigningSession`] per document.

use std::sync::Arc;

use crate::adapters::timestamp_http_client::HttpTimestampSource;
use crate::adapters::token::TokenConnection;
use crate::domain::document::Document;
use crate::domain::key_entry::KeyEntry;
use crate::domain::parameters::SignatureParameters;
use crate::infra::config::SigningConfiguration;
use crate::infra::error::SigningResult;
use crate::pipelines::session::{CancellationToken, SigningSession};
use crate::services::cert_validator::{BasicCertificateVerifier, CertificateVerifier};
use crate::services::envelope::DetachedEnvelopeFormat;
use crate::services::format::SignatureFormat;
use crate::services::timestamp::TimestampSource;

#[derive(Clone)]
pub struct SigningContext {
    format: Arc<dyn SignatureFormat>,
    timestamp_source: Option<Arc<dyn TimestampSource>>,
    certificate_verifier: Option<Arc<dyn CertificateVerifier>>,
}

impl Default for SigningContext {
    fn default() -> Self {
        Self {
            format: Arc::new(DetachedEnvelopeFormat::new()),
            timestamp_source: None,
            certificate_verifier: None,
        }
    }
}

impl SigningContext {
    /// Detached envelope format, no timestamp, no certificate checks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context described by a loaded configuration.
    ///
    /// Builds a blocking HTTP client when a timestamp authority is set, so call
    /// this outside of an async runtime.
    pub fn from_configuration(config: &SigningConfiguration) -> SigningResult<Self> {
        let mut context = Self::new();
        if let Some(ts_config) = config.timestamp_config()? {
            log::debug!("Timestamp authority: {}", ts_config.url);
            context = context.with_timestamp_source(Arc::new(HttpTimestampSource::new(
                &ts_config,
            )?));
        }
        let validation = &config.certificate_validation;
        if validation.enabled {
            context = context.with_certificate_verifier(Arc::new(
                BasicCertificateVerifier::new()
                    .allow_self_signed(validation.allow_self_signed)
                    .expiry_warning_days(validation.expiry_warning_days),
            ));
        }
        Ok(context)
    }

    #[must_use]
    pub fn with_format(mut self, format: Arc<dyn SignatureFormat>) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_timestamp_source(mut self, source: Arc<dyn TimestampSource>) -> Self {
        self.timestamp_source = Some(source);
        self
    }

    #[must_use]
    pub fn with_certificate_verifier(mut self, verifier: Arc<dyn CertificateVerifier>) -> Self {
        self.certificate_verifier = Some(verifier);
        self
    }

    pub fn format(&self) -> &dyn SignatureFormat {
        self.format.as_ref()
    }

    pub fn timestamp_source(&self) -> Option<&dyn TimestampSource> {
        self.timestamp_source.as_deref()
    }

    pub fn certificate_verifier(&self) -> Option<&dyn CertificateVerifier> {
        self.certificate_verifier.as_deref()
    }
}

/// Entry point for signing documents with a shared [`SigningContext`].
#[derive(Clone, Default)]
pub struct SigningOrchestrator {
    context: SigningContext,
}

impl SigningOrchestrator {
    #[must_use]
    pub fn new(context: SigningContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &SigningContext {
        &self.context
    }

    /// A fresh session in state `Init`, for callers that drive the phases themselves.
    pub fn session<'a>(
        &'a self,
        document: &'a Document,
        parameters: &'a SignatureParameters,
        key_entry: &'a KeyEntry,
        token: &'a dyn TokenConnection,
    ) -> SigningSession<'a> {
        self.session_with_cancellation(
            document,
            parameters,
            key_entry,
            token,
            CancellationToken::new(),
        )
    }

    pub fn session_with_cancellation<'a>(
        &'a self,
        document: &'a Document,
        parameters: &'a SignatureParameters,
        key_entry: &'a KeyEntry,
        token: &'a dyn TokenConnection,
        cancellation: CancellationToken,
    ) -> SigningSession<'a> {
        SigningSession::new(
            &self.context,
            document,
            parameters,
            key_entry,
            token,
            cancellation,
        )
    }

    /// Sign `document` (and every part chained after it) in one call.
    pub fn sign_document(
        &self,
        document: &Document,
        parameters: &SignatureParameters,
        key_entry: &KeyEntry,
        token: &dyn TokenConnection,
    ) -> SigningResult<Document> {
        self.session(document, parameters, key_entry, token).run()
    }

    pub fn sign_document_with_cancellation(
        &self,
        document: &Document,
        parameters: &SignatureParameters,
        key_entry: &KeyEntry,
        token: &dyn TokenConnection,
        cancellation: CancellationToken,
    ) -> SigningResult<Document> {
        self.session_with_cancellation(document, parameters, key_entry, token, cancellation)
            .run()
    }
}
