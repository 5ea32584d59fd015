//! Timestamp request builder service.
//!
//! Builds RFC3161 `TimeStampReq` structures for a message imprint.

use der::asn1::ObjectIdentifier;
use rand::RngCore;

use crate::domain::asn1::{encode_tlv, encode_unsigned_integer};
use crate::domain::constants::{
    ASN1_BOOLEAN_TAG, ASN1_NULL, ASN1_OCTET_STRING_TAG, ASN1_OID_TAG, ASN1_SEQUENCE_TAG,
    TS_REQ_NONCE_BYTES, TS_REQ_VERSION_1,
};
use crate::domain::crypto::DigestBytes;
use crate::infra::error::{SigningError, SigningResult};

/// An encoded request together with the nonce it carries.
#[derive(Debug, Clone)]
pub struct TimestampRequest {
    pub der: Vec<u8>,
    pub nonce: [u8; TS_REQ_NONCE_BYTES],
}

/// Service for building RFC3161 timestamp requests.
#[derive(Debug, Clone, Default)]
pub struct TimestampRequestBuilder {
    policy: Option<ObjectIdentifier>,
}

impl TimestampRequestBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a specific TSA policy (dotted OID).
    pub fn with_policy(mut self, policy_oid: &str) -> SigningResult<Self> {
        let oid = ObjectIdentifier::new(policy_oid).map_err(|e| {
            SigningError::ConfigurationError(format!("Invalid TSA policy OID '{policy_oid}': {e}"))
        })?;
        self.policy = Some(oid);
        Ok(self)
    }

    /// Build a request for the given imprint.
    ///
    /// ```text
    /// TimeStampReq ::= SEQUENCE {
    ///     version         INTEGER { v1(1) },
    ///     messageImprint  MessageImprint,
    ///     reqPolicy       TSAPolicyId OPTIONAL,
    ///     nonce           INTEGER OPTIONAL,
    ///     certReq         BOOLEAN DEFAULT FALSE }
    /// ```
    pub fn build_request(&self, imprint: &DigestBytes) -> SigningResult<TimestampRequest> {
        let mut nonce = [0u8; TS_REQ_NONCE_BYTES];
        rand::thread_rng().fill_bytes(&mut nonce);
        Ok(self.build_with_nonce(imprint, nonce))
    }

    fn build_with_nonce(
        &self,
        imprint: &DigestBytes,
        nonce: [u8; TS_REQ_NONCE_BYTES],
    ) -> TimestampRequest {
        let algorithm_identifier = encode_tlv(
            ASN1_SEQUENCE_TAG,
            &[
                encode_tlv(ASN1_OID_TAG, imprint.algorithm().oid_bytes()),
                ASN1_NULL.to_vec(),
            ]
            .concat(),
        );
        let message_imprint = encode_tlv(
            ASN1_SEQUENCE_TAG,
            &[
                algorithm_identifier,
                encode_tlv(ASN1_OCTET_STRING_TAG, imprint.as_slice()),
            ]
            .concat(),
        );

        let mut body = encode_unsigned_integer(&[TS_REQ_VERSION_1]);
        body.extend_from_slice(&message_imprint);
        if let Some(policy) = &self.policy {
            body.extend_from_slice(&encode_tlv(ASN1_OID_TAG, policy.as_bytes()));
        }
        body.extend_from_slice(&encode_unsigned_integer(&nonce));
        body.extend_from_slice(&encode_tlv(ASN1_BOOLEAN_TAG, &[0xff]));

        let der = encode_tlv(ASN1_SEQUENCE_TAG, &body);
        log::debug!(
            "Built RFC3161 timestamp request: {} bytes for {} imprint",
            der.len(),
            imprint.algorithm()
        );
        TimestampRequest { der, nonce }
    }
}
