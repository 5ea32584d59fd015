//! Timestamp HTTP client adapter.
//!
//! RFC3161 over HTTP(S): one POST of an `application/timestamp-query` body per
//! call. There is no retry or failover; a failed exchange is reported to the
//! caller with its failure kind.
//!
//! Uses the blocking `reqwest` client. Build and drop it outside of any async
//! runtime (e.g. inside `tokio::task::spawn_blocking`).

use std::time::Duration;

use crate::domain::constants::{TIMESTAMP_QUERY_CONTENT_TYPE, TIMESTAMP_REPLY_CONTENT_TYPE};
use crate::domain::crypto::DigestBytes;
use crate::domain::timestamp::TimestampToken;
use crate::domain::types::TimestampUrl;
use crate::infra::error::{SigningError, SigningResult, TimestampFailure};
use crate::services::timestamp::{TimestampConfig, TimestampSource};
use crate::services::timestamp_parser::TimestampParserService;
use crate::services::timestamp_request_builder::TimestampRequestBuilder;

const USER_AGENT: &str = concat!("token-signer/", env!("CARGO_PKG_VERSION"));

/// [`TimestampSource`] talking to one timestamp authority.
pub struct HttpTimestampSource {
    url: TimestampUrl,
    timeout: Duration,
    builder: TimestampRequestBuilder,
    http: reqwest::blocking::Client,
}

impl HttpTimestampSource {
    pub fn new(config: &TimestampConfig) -> SigningResult<Self> {
        let builder = match &config.policy_oid {
            Some(oid) => TimestampRequestBuilder::new().with_policy(oid)?,
            None => TimestampRequestBuilder::new(),
        };
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                SigningError::ConfigurationError(format!("Cannot build HTTP client: {e}"))
            })?;
        Ok(Self {
            url: config.url.clone(),
            timeout: config.timeout,
            builder,
            http,
        })
    }

    #[must_use]
    pub fn url(&self) -> &TimestampUrl {
        &self.url
    }

    fn classify(&self, error: &reqwest::Error) -> SigningError {
        let kind = if error.is_timeout() {
            TimestampFailure::Timeout
        } else if error.is_connect() || error.is_request() {
            TimestampFailure::Unreachable
        } else {
            TimestampFailure::MalformedResponse
        };
        let message = match kind {
            TimestampFailure::Timeout => format!(
                "{} did not answer within {}s",
                self.url,
                self.timeout.as_secs()
            ),
            _ => format!("{}: {error}", self.url),
        };
        SigningError::timestamp(kind, message)
    }
}

impl TimestampSource for HttpTimestampSource {
    fn timestamp(&self, digest: &DigestBytes) -> SigningResult<TimestampToken> {
        let request = self.builder.build_request(digest)?;
        log::info!("Requesting timestamp from {}", self.url);

        let response = self
            .http
            .post(self.url.as_str())
            .header(reqwest::header::CONTENT_TYPE, TIMESTAMP_QUERY_CONTENT_TYPE)
            .header(reqwest::header::ACCEPT, TIMESTAMP_REPLY_CONTENT_TYPE)
            .body(request.der)
            .send()
            .map_err(|e| self.classify(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SigningError::timestamp(
                TimestampFailure::Rejected,
                format!("HTTP {status} from {}", self.url),
            ));
        }
        let body = response.bytes().map_err(|e| self.classify(&e))?;
        log::debug!("Timestamp response: {} bytes", body.len());

        TimestampParserService::parse_response(&body, digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::crypto::DigestAlgorithm;

    #[test]
    fn unreachable_authority_is_classified() {
        // Port 9 on localhost: connection refused on any sane test host
        let config = TimestampConfig::new(TimestampUrl::new("http://127.0.0.1:9/tsr").unwrap())
            .with_timeout(Duration::from_secs(5));
        let source = HttpTimestampSource::new(&config).unwrap();
        let digest = DigestBytes::compute(DigestAlgorithm::Sha256, b"sig");
        match source.timestamp(&digest) {
            Err(SigningError::TimestampError { kind, .. }) => assert!(matches!(
                kind,
                TimestampFailure::Unreachable | TimestampFailure::Timeout
            )),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn invalid_policy_fails_construction() {
        let config = TimestampConfig::new(TimestampUrl::new("http://localhost/tsr").unwrap())
            .with_policy_oid("bogus");
        assert!(HttpTimestampSource::new(&config).is_err());
    }

    #[cfg(feature = "network-tests")]
    #[test]
    fn public_authority_grants_token() {
        let config =
            TimestampConfig::new(TimestampUrl::new("http://timestamp.digicert.com").unwrap());
        let source = HttpTimestampSource::new(&config).unwrap();
        let digest = DigestBytes::compute(DigestAlgorithm::Sha256, b"signature bytes");
        let token = source.timestamp(&digest).unwrap();
        assert!(token.covers(&digest));
    }
}
