//! Timestamp response parser service.

use crate::domain::asn1::{expect_tlv, read_small_unsigned, read_tlv};
use crate::domain::constants::{
    ASN1_INTEGER_TAG, ASN1_SEQUENCE_TAG, PKI_STATUS_GRANTED, PKI_STATUS_GRANTED_WITH_MODS,
};
use crate::domain::crypto::DigestBytes;
use crate::domain::timestamp::TimestampToken;
use crate::infra::error::{SigningError, SigningResult, TimestampFailure};

const ASN1_UTF8_STRING_TAG: u8 = 0x0c;

/// Service responsible for parsing raw `TimeStampResp` bytes and validating
/// the message imprint against the digest that was sent.
pub struct TimestampParserService;

impl TimestampParserService {
    /// ```text
    /// TimeStampResp ::= SEQUENCE {
    ///     status          PKIStatusInfo,
    ///     timeStampToken  TimeStampToken OPTIONAL }
    /// ```
    pub fn parse_response(body: &[u8], expected: &DigestBytes) -> SigningResult<TimestampToken> {
        let malformed = |e: String| {
            SigningError::timestamp(
                TimestampFailure::MalformedResponse,
                format!("Invalid TimeStampResp: {e}"),
            )
        };

        let (resp, _) = expect_tlv(body, ASN1_SEQUENCE_TAG, "TimeStampResp").map_err(malformed)?;
        let (status_info, rest) =
            expect_tlv(resp.value, ASN1_SEQUENCE_TAG, "PKIStatusInfo").map_err(malformed)?;
        let (status, status_rest) =
            expect_tlv(status_info.value, ASN1_INTEGER_TAG, "PKIStatus").map_err(malformed)?;
        let status = read_small_unsigned(status.value)
            .ok_or_else(|| malformed("PKIStatus is not a small integer".into()))?;

        if status != u64::from(PKI_STATUS_GRANTED) && status != u64::from(PKI_STATUS_GRANTED_WITH_MODS)
        {
            let reason = Self::status_text(status_rest)
                .map(|text| format!(": {text}"))
                .unwrap_or_default();
            return Err(SigningError::timestamp(
                TimestampFailure::Rejected,
                format!("Timestamp authority returned status {status}{reason}"),
            ));
        }

        let (token, _) = read_tlv(rest)
            .map_err(|e| malformed(format!("granted response carries no token ({e})")))?;
        let token = TimestampToken::from_der(token.raw.to_vec())?;

        if !token.covers(expected) {
            return Err(SigningError::timestamp(
                TimestampFailure::MalformedResponse,
                format!(
                    "Message imprint mismatch: sent {}, token covers {}:{}",
                    hex::encode(expected.as_slice()),
                    token.digest_algorithm(),
                    hex::encode(token.message_imprint())
                ),
            ));
        }
        log::debug!("Timestamp token accepted: {token:?}");
        Ok(token)
    }

    /// First `UTF8String` of the optional `statusString`.
    fn status_text(rest: &[u8]) -> Option<String> {
        let (free_text, _) = expect_tlv(rest, ASN1_SEQUENCE_TAG, "PKIFreeText").ok()?;
        let (text, _) = expect_tlv(free_text.value, ASN1_UTF8_STRING_TAG, "UTF8String").ok()?;
        Some(String::from_utf8_lossy(text.value).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asn1::{encode_tlv, encode_unsigned_integer};
    use crate::domain::crypto::DigestAlgorithm;
    use crate::domain::timestamp::test_support::token_der;

    fn response(status: u8, extra: &[u8]) -> Vec<u8> {
        encode_tlv(
            ASN1_SEQUENCE_TAG,
            &[encode_unsigned_integer(&[status]), extra.to_vec()].concat(),
        )
    }

    fn wrap(status_info: Vec<u8>, token: Option<Vec<u8>>) -> Vec<u8> {
        encode_tlv(
            ASN1_SEQUENCE_TAG,
            &[status_info, token.unwrap_or_default()].concat(),
        )
    }

    #[test]
    fn granted_response_yields_token() {
        let digest = DigestBytes::compute(DigestAlgorithm::Sha256, b"sig");
        let body = wrap(
            response(0, &[]),
            Some(token_der(DigestAlgorithm::Sha256, digest.as_slice())),
        );
        let token = TimestampParserService::parse_response(&body, &digest).unwrap();
        assert!(token.covers(&digest));
    }

    #[test]
    fn rejection_carries_status_text() {
        let digest = DigestBytes::compute(DigestAlgorithm::Sha256, b"sig");
        let text = encode_tlv(ASN1_SEQUENCE_TAG, &encode_tlv(ASN1_UTF8_STRING_TAG, b"bad alg"));
        let body = wrap(response(2, &text), None);
        match TimestampParserService::parse_response(&body, &digest) {
            Err(SigningError::TimestampError { kind, message }) => {
                assert_eq!(kind, TimestampFailure::Rejected);
                assert!(message.contains("bad alg"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn imprint_mismatch_is_malformed() {
        let sent = DigestBytes::compute(DigestAlgorithm::Sha256, b"sig");
        let other = DigestBytes::compute(DigestAlgorithm::Sha256, b"other");
        let body = wrap(
            response(0, &[]),
            Some(token_der(DigestAlgorithm::Sha256, other.as_slice())),
        );
        assert!(matches!(
            TimestampParserService::parse_response(&body, &sent),
            Err(SigningError::TimestampError {
                kind: TimestampFailure::MalformedResponse,
                ..
            })
        ));
    }

    #[test]
    fn granted_without_token_is_malformed() {
        let digest = DigestBytes::compute(DigestAlgorithm::Sha256, b"sig");
        let body = wrap(response(0, &[]), None);
        assert!(TimestampParserService::parse_response(&body, &digest).is_err());
        assert!(TimestampParserService::parse_response(&[0x30], &digest).is_err());
    }
}
