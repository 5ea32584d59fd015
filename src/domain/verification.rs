//! Verification domain types for signature envelopes.
//!
//! Aggregates the outcome of each independent check; the cryptographic work
//! itself lives in the verification service.

/// Result of verifying a signature envelope.
///
/// Each field represents one aspect of the verification:
/// - `signature_ok`: signature value validates over the re-derived signed properties
/// - `certificate_ok`: embedded certificate matches the signed certificate digest
/// - `references_ok`: every referenced part digests to the signed value
/// - `timestamp_ok`: signature timestamp (when present) covers the signature value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub signature_ok: bool,
    pub certificate_ok: bool,
    pub references_ok: bool,
    pub timestamp_ok: bool,
    /// Whether the envelope carried a signature timestamp at all.
    pub timestamped: bool,
    /// Human-readable reasons for every failed check.
    pub problems: Vec<String>,
}

impl VerificationReport {
    /// Report for input that could not even be parsed as an envelope.
    #[must_use]
    pub fn unreadable(reason: impl Into<String>) -> Self {
        Self {
            signature_ok: false,
            certificate_ok: false,
            references_ok: false,
            timestamp_ok: false,
            timestamped: false,
            problems: vec![reason.into()],
        }
    }

    /// Overall success indicator - true only if all checks passed.
    #[must_use]
    pub fn success(&self) -> bool {
        self.signature_ok && self.certificate_ok && self.references_ok && self.timestamp_ok
    }
}
