//! RFC3161 timestamp token domain type.

use std::fmt;

use crate::domain::asn1::{expect_tlv, read_tlv};
use crate::domain::constants::{
    ASN1_CONTEXT_0_EXPLICIT_TAG, ASN1_GENERALIZED_TIME_TAG, ASN1_INTEGER_TAG,
    ASN1_OCTET_STRING_TAG, ASN1_OID_TAG, ASN1_SEQUENCE_TAG, ASN1_SET_TAG,
};
use crate::domain::crypto::{DigestAlgorithm, DigestBytes};
use crate::infra::error::{SigningError, SigningResult, TimestampFailure};

/// A `TimeStampToken` (CMS `ContentInfo`) with the fields of its `TSTInfo`
/// needed to bind it to a digest.
#[derive(Clone, PartialEq, Eq)]
pub struct TimestampToken {
    der: Box<[u8]>,
    digest_algorithm: DigestAlgorithm,
    message_imprint: Box<[u8]>,
    generation_time: Option<String>,
}

impl TimestampToken {
    /// Parse a DER `TimeStampToken`.
    pub fn from_der(der: Vec<u8>) -> SigningResult<Self> {
        let (digest_algorithm, message_imprint, generation_time) = parse_tst_info(&der)
            .map_err(|e| {
                SigningError::timestamp(
                    TimestampFailure::MalformedResponse,
                    format!("Invalid TimeStampToken: {e}"),
                )
            })?;
        Ok(Self {
            der: der.into_boxed_slice(),
            digest_algorithm,
            message_imprint: message_imprint.into_boxed_slice(),
            generation_time,
        })
    }

    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    #[must_use]
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    #[must_use]
    pub fn message_imprint(&self) -> &[u8] {
        &self.message_imprint
    }

    /// `genTime` as the raw GeneralizedTime string (e.g. `20240101120000Z`).
    #[must_use]
    pub fn generation_time(&self) -> Option<&str> {
        self.generation_time.as_deref()
    }

    /// Whether this token timestamps exactly `digest`.
    #[must_use]
    pub fn covers(&self, digest: &DigestBytes) -> bool {
        self.digest_algorithm == digest.algorithm() && &*self.message_imprint == digest.as_slice()
    }
}

impl fmt::Debug for TimestampToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TimestampToken(len={}, imprint={:?}:{}, gen_time={:?})",
            self.der.len(),
            self.digest_algorithm,
            hex::encode(&self.message_imprint),
            self.generation_time
        )
    }
}

/// `ContentInfo` -> `SignedData` -> `EncapsulatedContentInfo` -> `TSTInfo`.
fn parse_tst_info(der: &[u8]) -> Result<(DigestAlgorithm, Vec<u8>, Option<String>), String> {
    let (content_info, _) = expect_tlv(der, ASN1_SEQUENCE_TAG, "ContentInfo")?;
    let (_, rest) = expect_tlv(content_info.value, ASN1_OID_TAG, "contentType")?;
    let (explicit, _) = expect_tlv(rest, ASN1_CONTEXT_0_EXPLICIT_TAG, "content")?;
    let (signed_data, _) = expect_tlv(explicit.value, ASN1_SEQUENCE_TAG, "SignedData")?;
    let (_, rest) = expect_tlv(signed_data.value, ASN1_INTEGER_TAG, "SignedData.version")?;
    let (_, rest) = expect_tlv(rest, ASN1_SET_TAG, "digestAlgorithms")?;
    let (encap, _) = expect_tlv(rest, ASN1_SEQUENCE_TAG, "encapContentInfo")?;
    let (_, rest) = expect_tlv(encap.value, ASN1_OID_TAG, "eContentType")?;
    let (econtent, _) = expect_tlv(rest, ASN1_CONTEXT_0_EXPLICIT_TAG, "eContent")?;
    let (octets, _) = expect_tlv(econtent.value, ASN1_OCTET_STRING_TAG, "eContent octets")?;

    let (tst_info, _) = expect_tlv(octets.value, ASN1_SEQUENCE_TAG, "TSTInfo")?;
    let (_, rest) = expect_tlv(tst_info.value, ASN1_INTEGER_TAG, "TSTInfo.version")?;
    let (_, rest) = expect_tlv(rest, ASN1_OID_TAG, "TSTInfo.policy")?;
    let (imprint, rest) = expect_tlv(rest, ASN1_SEQUENCE_TAG, "messageImprint")?;
    let (alg_id, after_alg) = expect_tlv(imprint.value, ASN1_SEQUENCE_TAG, "hashAlgorithm")?;
    let (oid, _) = expect_tlv(alg_id.value, ASN1_OID_TAG, "hashAlgorithm.algorithm")?;
    let algorithm = DigestAlgorithm::from_oid_bytes(oid.value).ok_or_else(|| {
        format!(
            "unsupported messageImprint algorithm {}",
            hex::encode(oid.value)
        )
    })?;
    let (hashed, _) = expect_tlv(after_alg, ASN1_OCTET_STRING_TAG, "hashedMessage")?;
    if hashed.value.len() != algorithm.digest_size() {
        return Err(format!(
            "hashedMessage is {} bytes, {} needs {}",
            hashed.value.len(),
            algorithm,
            algorithm.digest_size()
        ));
    }
    let (_, rest) = expect_tlv(rest, ASN1_INTEGER_TAG, "serialNumber")?;
    let generation_time = match read_tlv(rest) {
        Ok((tlv, _)) if tlv.tag == ASN1_GENERALIZED_TIME_TAG => {
            Some(String::from_utf8_lossy(tlv.value).into_owned())
        }
        _ => None,
    };
    Ok((algorithm, hashed.value.to_vec(), generation_time))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::asn1::{encode_tlv, encode_unsigned_integer};
    use crate::domain::constants::*;
    use crate::domain::crypto::DigestAlgorithm;

    /// Structurally valid (unsigned) `TimeStampToken` for parser tests.
    pub(crate) fn token_der(algorithm: DigestAlgorithm, imprint: &[u8]) -> Vec<u8> {
        let alg_id = encode_tlv(
            ASN1_SEQUENCE_TAG,
            &[encode_tlv(ASN1_OID_TAG, algorithm.oid_bytes()), ASN1_NULL.to_vec()].concat(),
        );
        let message_imprint = encode_tlv(
            ASN1_SEQUENCE_TAG,
            &[alg_id.clone(), encode_tlv(ASN1_OCTET_STRING_TAG, imprint)].concat(),
        );
        let tst_info = encode_tlv(
            ASN1_SEQUENCE_TAG,
            &[
                encode_unsigned_integer(&[1]),
                encode_tlv(ASN1_OID_TAG, &[0x2a, 0x03, 0x04]),
                message_imprint,
                encode_unsigned_integer(&[0x10, 0x20]),
                encode_tlv(ASN1_GENERALIZED_TIME_TAG, b"20240102030405Z"),
            ]
            .concat(),
        );
        let encap = encode_tlv(
            ASN1_SEQUENCE_TAG,
            &[
                encode_tlv(ASN1_OID_TAG, &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x10, 0x01, 0x04]),
                encode_tlv(
                    ASN1_CONTEXT_0_EXPLICIT_TAG,
                    &encode_tlv(ASN1_OCTET_STRING_TAG, &tst_info),
                ),
            ]
            .concat(),
        );
        let signed_data = encode_tlv(
            ASN1_SEQUENCE_TAG,
            &[
                encode_unsigned_integer(&[3]),
                encode_tlv(ASN1_SET_TAG, &alg_id),
                encap,
            ]
            .concat(),
        );
        encode_tlv(
            ASN1_SEQUENCE_TAG,
            &[
                encode_tlv(ASN1_OID_TAG, &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x02]),
                encode_tlv(ASN1_CONTEXT_0_EXPLICIT_TAG, &signed_data),
            ]
            .concat(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::token_der;
    use super::*;

    #[test]
    fn parses_imprint_and_time() {
        let digest = DigestBytes::compute(DigestAlgorithm::Sha256, b"signature value");
        let token = TimestampToken::from_der(token_der(DigestAlgorithm::Sha256, digest.as_slice()))
            .unwrap();
        assert_eq!(token.digest_algorithm(), DigestAlgorithm::Sha256);
        assert!(token.covers(&digest));
        assert_eq!(token.generation_time(), Some("20240102030405Z"));
    }

    #[test]
    fn other_digest_is_not_covered() {
        let digest = DigestBytes::compute(DigestAlgorithm::Sha384, b"a");
        let token =
            TimestampToken::from_der(token_der(DigestAlgorithm::Sha384, digest.as_slice())).unwrap();
        assert!(!token.covers(&DigestBytes::compute(DigestAlgorithm::Sha384, b"b")));
        assert!(!token.covers(&DigestBytes::compute(DigestAlgorithm::Sha256, b"a")));
    }

    #[test]
    fn garbage_is_malformed_response() {
        let err = TimestampToken::from_der(vec![0x30, 0x03, 0x02, 0x01, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            SigningError::TimestampError {
                kind: TimestampFailure::MalformedResponse,
                ..
            }
        ));
    }

    #[test]
    fn wrong_imprint_length_is_rejected() {
        let der = token_der(DigestAlgorithm::Sha256, &[0u8; 20]);
        assert!(TimestampToken::from_der(der).is_err());
    }
}
