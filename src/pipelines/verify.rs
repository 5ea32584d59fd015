//! `VerifyWorkflow`: high-level facade for verifying signature envelopes.
//!
//! Delegates to `VerificationService`; keeps symmetry with the signing orchestrator.

use std::path::Path;

use crate::domain::document::Document;
use crate::domain::verification::VerificationReport;
use crate::infra::error::SigningResult;
use crate::services::verification::VerificationService;

/// Orchestrates verification of a signature envelope and its detached parts.
pub struct VerifyWorkflow {
    svc: VerificationService,
}

impl Default for VerifyWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl VerifyWorkflow {
    #[must_use]
    pub fn new() -> Self {
        Self {
            svc: VerificationService::new(),
        }
    }

    /// Run verification over an envelope document.
    pub fn run(
        &self,
        signature: &Document,
        detached: &[Document],
    ) -> SigningResult<VerificationReport> {
        let report = self.svc.verify(signature, detached)?;
        if report.success() {
            log::info!("Signature '{}' verified", signature.name());
        } else {
            log::warn!(
                "Signature '{}' failed verification: {}",
                signature.name(),
                report.problems.join("; ")
            );
        }
        Ok(report)
    }

    /// Load the envelope and detached parts from disk and verify them.
    pub fn run_files<P: AsRef<Path>>(
        &self,
        signature: P,
        detached: &[P],
    ) -> SigningResult<VerificationReport> {
        let signature = Document::from_file(signature)?;
        let detached = detached
            .iter()
            .map(Document::from_file)
            .collect::<SigningResult<Vec<_>>>()?;
        self.run(&signature, &detached)
    }
}
