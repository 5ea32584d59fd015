//! Centralized constants for commonly repeated DER/OID bytes and tags.
//! Keep this intentionally small; only broadly reused literals should live here.

// === ASN.1 DER Constants ===

/// ASN.1 NULL value (tag + length + null)
pub const ASN1_NULL: &[u8] = &[0x05, 0x00];

/// ASN.1 BOOLEAN tag
pub const ASN1_BOOLEAN_TAG: u8 = 0x01;

/// ASN.1 INTEGER tag
pub const ASN1_INTEGER_TAG: u8 = 0x02;

/// ASN.1 OCTET STRING tag
pub const ASN1_OCTET_STRING_TAG: u8 = 0x04;

/// ASN.1 OBJECT IDENTIFIER tag
pub const ASN1_OID_TAG: u8 = 0x06;

/// ASN.1 GeneralizedTime tag
pub const ASN1_GENERALIZED_TIME_TAG: u8 = 0x18;

/// ASN.1 SEQUENCE tag
pub const ASN1_SEQUENCE_TAG: u8 = 0x30;

/// ASN.1 SET tag
pub const ASN1_SET_TAG: u8 = 0x31;

/// ASN.1 context-specific tag [0] EXPLICIT (constructed)
pub const ASN1_CONTEXT_0_EXPLICIT_TAG: u8 = 0xa0;

// === RFC3161 Constants ===

/// Version 1 for RFC3161 timestamp requests
pub const TS_REQ_VERSION_1: u8 = 0x01;

/// Number of random bytes in a timestamp request nonce
pub const TS_REQ_NONCE_BYTES: usize = 8;

/// `PKIStatus` granted
pub const PKI_STATUS_GRANTED: u8 = 0;

/// `PKIStatus` grantedWithMods
pub const PKI_STATUS_GRANTED_WITH_MODS: u8 = 1;

/// HTTP content type of an RFC3161 request body
pub const TIMESTAMP_QUERY_CONTENT_TYPE: &str = "application/timestamp-query";

/// HTTP content type of an RFC3161 response body
pub const TIMESTAMP_REPLY_CONTENT_TYPE: &str = "application/timestamp-reply";

// === Hash Algorithm OIDs ===

/// SHA-256 algorithm OID (2.16.840.1.101.3.4.2.1) DER encoding
pub const SHA256_ALGORITHM_OID: &[u8] = &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01];

/// SHA-384 algorithm OID (2.16.840.1.101.3.4.2.2) DER encoding
pub const SHA384_ALGORITHM_OID: &[u8] = &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x02];

/// SHA-512 algorithm OID (2.16.840.1.101.3.4.2.3) DER encoding
pub const SHA512_ALGORITHM_OID: &[u8] = &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x03];

// === Public Key Algorithm OIDs ===

/// rsaEncryption (1.2.840.113549.1.1.1)
pub const RSA_ENCRYPTION_OID: &str = "1.2.840.113549.1.1.1";

/// id-ecPublicKey (1.2.840.10045.2.1)
pub const EC_PUBLIC_KEY_OID: &str = "1.2.840.10045.2.1";

/// secp256r1 / P-256 (1.2.840.10045.3.1.7)
pub const EC_CURVE_P256_OID: &str = "1.2.840.10045.3.1.7";

/// secp384r1 / P-384 (1.3.132.0.34)
pub const EC_CURVE_P384_OID: &str = "1.3.132.0.34";

// === Envelope Format ===

/// Format identifier written into every signature envelope
pub const ENVELOPE_FORMAT_ID: &str = "token-signer/detached-envelope/v1";

/// Mime type of signature envelopes
pub const ENVELOPE_MIME_TYPE: &str = "application/json";

// === PIV Slot Constants ===

/// PIV Authentication slot (9A)
pub const PIV_SLOT_AUTHENTICATION: u8 = 0x9a;

/// PIV Digital Signature slot (9C) - recommended for document signing
pub const PIV_SLOT_SIGNATURE: u8 = 0x9c;

/// PIV Key Management slot (9D)
pub const PIV_SLOT_KEY_MANAGEMENT: u8 = 0x9d;

/// PIV Card Authentication slot (9E)
pub const PIV_SLOT_CARD_AUTHENTICATION: u8 = 0x9e;

/// All valid PIV slots for certificate operations
pub const VALID_PIV_SLOTS: &[u8] = &[
    PIV_SLOT_AUTHENTICATION,
    PIV_SLOT_SIGNATURE,
    PIV_SLOT_KEY_MANAGEMENT,
    PIV_SLOT_CARD_AUTHENTICATION,
];

// === DigestInfo prefixes (PKCS#1 v1.5) ===

/// DER prefix of a SHA-256 `DigestInfo`
pub const DIGEST_INFO_PREFIX_SHA256: &[u8] = &[
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05,
    0x00, 0x04, 0x20,
];

/// DER prefix of a SHA-384 `DigestInfo`
pub const DIGEST_INFO_PREFIX_SHA384: &[u8] = &[
    0x30, 0x41, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x02, 0x05,
    0x00, 0x04, 0x30,
];

/// DER prefix of a SHA-512 `DigestInfo`
pub const DIGEST_INFO_PREFIX_SHA512: &[u8] = &[
    0x30, 0x51, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x03, 0x05,
    0x00, 0x04, 0x40,
];
