//! Trusted timestamp capability.
//!
//! A [`TimestampSource`] binds a digest to a signed time assertion. Sources
//! are injected per session through the signing context; there is no shared
//! process-wide instance. Once configured, a source failure fails the whole
//! signing session.

use std::time::Duration;

use crate::domain::crypto::DigestBytes;
use crate::domain::timestamp::TimestampToken;
use crate::domain::types::TimestampUrl;
use crate::infra::error::SigningResult;

/// Default per-request timeout for timestamp authorities.
pub const DEFAULT_TIMESTAMP_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of RFC3161 timestamp tokens.
///
/// Implementations perform a single exchange per call; callers decide
/// whether to try again.
pub trait TimestampSource: Send + Sync {
    /// Obtain a token whose message imprint equals `digest`.
    fn timestamp(&self, digest: &DigestBytes) -> SigningResult<TimestampToken>;
}

/// Settings for an HTTP timestamp authority.
#[derive(Debug, Clone)]
pub struct TimestampConfig {
    pub url: TimestampUrl,
    pub timeout: Duration,
    /// Requested TSA policy, dotted OID form.
    pub policy_oid: Option<String>,
}

impl TimestampConfig {
    #[must_use]
    pub fn new(url: TimestampUrl) -> Self {
        Self {
            url,
            timeout: DEFAULT_TIMESTAMP_TIMEOUT,
            policy_oid: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_policy_oid(mut self, policy_oid: impl Into<String>) -> Self {
        self.policy_oid = Some(policy_oid.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let cfg = TimestampConfig::new(TimestampUrl::new("http://timestamp.digicert.com").unwrap());
        assert_eq!(cfg.timeout, DEFAULT_TIMESTAMP_TIMEOUT);
        assert!(cfg.policy_oid.is_none());

        let cfg = cfg
            .with_timeout(Duration::from_secs(5))
            .with_policy_oid("1.2.3.4");
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert_eq!(cfg.policy_oid.as_deref(), Some("1.2.3.4"));
    }
}
