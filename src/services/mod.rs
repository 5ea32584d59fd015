//! Service layer module root.
//! Signature formats, timestamp protocol handling and certificate checks.

pub mod cert_validator;
pub mod envelope;
pub mod format;
pub mod timestamp;
pub mod timestamp_parser;
pub mod timestamp_request_builder;
pub mod verification;

pub use cert_validator::{BasicCertificateVerifier, CertificateReport, CertificateVerifier};
pub use envelope::{DetachedEnvelopeFormat, SignatureEnvelope, SignedProperties};
pub use format::SignatureFormat;
pub use timestamp::{TimestampConfig, TimestampSource};
pub use timestamp_parser::TimestampParserService;
pub use timestamp_request_builder::{TimestampRequest, TimestampRequestBuilder};
pub use verification::VerificationService;
