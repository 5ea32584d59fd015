//! Shared fixtures for integration tests: throwaway signing keys, a counting
//! token wrapper and in-process timestamp sources.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::KeyUsage;
use openssl::x509::{X509Builder, X509NameBuilder, X509};

use token_signer::domain::asn1::{encode_tlv, encode_unsigned_integer};
use token_signer::domain::constants::*;
use token_signer::domain::crypto::DigestBytes;
use token_signer::domain::timestamp::TimestampToken;
use token_signer::services::TimestampSource;
use token_signer::{
    CancellationToken, DigestAlgorithm, KeyEntry, KeystoreToken, SignatureParameters,
    SignatureValue, SigningError, SigningResult, TimestampFailure, ToBeSigned, TokenConnection,
};

pub const SIGNING_TIME_SECS: u64 = 1_700_000_000;

pub fn signing_time() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(SIGNING_TIME_SECS)
}

/// RSA-2048 key with a self-signed certificate valid around [`signing_time`].
pub fn rsa_signer(common_name: &str) -> (PKey<Private>, X509) {
    let pkey = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = Asn1Integer::from_bn(&BigNum::from_u32(4242).unwrap()).unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&pkey).unwrap();
    let not_before = Asn1Time::from_unix(SIGNING_TIME_SECS as i64 - 86_400).unwrap();
    let not_after = Asn1Time::days_from_now(365).unwrap();
    builder.set_not_before(&not_before).unwrap();
    builder.set_not_after(&not_after).unwrap();
    builder
        .append_extension(
            KeyUsage::new()
                .critical()
                .digital_signature()
                .non_repudiation()
                .build()
                .unwrap(),
        )
        .unwrap();
    builder.sign(&pkey, MessageDigest::sha256()).unwrap();
    (pkey, builder.build())
}

/// Keystore token holding one fresh key under `alias`, and its key entry.
pub fn keystore(alias: &str) -> (KeystoreToken, KeyEntry) {
    let (pkey, cert) = rsa_signer(alias);
    let token = KeystoreToken::from_pem(
        alias,
        &pkey.private_key_to_pem_pkcs8().unwrap(),
        &cert.to_pem().unwrap(),
    )
    .unwrap();
    let entry = token.keys().unwrap().remove(0);
    (token, entry)
}

/// Write a PKCS#12 keystore protected by `password` into `dir`.
pub fn pkcs12_file(dir: &Path, file_name: &str, password: &str) -> PathBuf {
    let (pkey, cert) = rsa_signer("PKCS12 Signer");
    let der = Pkcs12::builder()
        .name("signer")
        .pkey(&pkey)
        .cert(&cert)
        .build2(password)
        .unwrap()
        .to_der()
        .unwrap();
    let path = dir.join(file_name);
    std::fs::write(&path, der).unwrap();
    path
}

pub fn parameters(entry: &KeyEntry) -> SignatureParameters {
    SignatureParameters::new()
        .with_digest_algorithm(DigestAlgorithm::Sha256)
        .with_signing_certificate(entry.certificate().clone())
        .with_signing_time(signing_time())
}

/// Forwards to an inner token and counts `sign` calls. Can trip a
/// cancellation while the call is in flight.
pub struct CountingToken<T> {
    inner: T,
    calls: AtomicUsize,
    cancel_on_sign: Option<CancellationToken>,
}

impl<T: TokenConnection> CountingToken<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            cancel_on_sign: None,
        }
    }

    pub fn cancelling(inner: T, cancellation: CancellationToken) -> Self {
        Self {
            cancel_on_sign: Some(cancellation),
            ..Self::new(inner)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<T: TokenConnection> TokenConnection for CountingToken<T> {
    fn keys(&self) -> SigningResult<Vec<KeyEntry>> {
        self.inner.keys()
    }

    fn sign(
        &self,
        data: &ToBeSigned,
        digest_algorithm: DigestAlgorithm,
        key_entry: &KeyEntry,
    ) -> SigningResult<SignatureValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self.inner.sign(data, digest_algorithm, key_entry);
        if let Some(cancellation) = &self.cancel_on_sign {
            cancellation.cancel();
        }
        result
    }
}

/// Unsigned but well-formed `TimeStampToken` over `imprint`.
pub fn timestamp_token_der(algorithm: DigestAlgorithm, imprint: &[u8]) -> Vec<u8> {
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
            encode_unsigned_integer(&[0x01, 0x02, 0x03]),
            encode_tlv(ASN1_GENERALIZED_TIME_TAG, b"20231114221320Z"),
        ]
        .concat(),
    );
    let id_ct_tst_info = [0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x10, 0x01, 0x04];
    let encap = encode_tlv(
        ASN1_SEQUENCE_TAG,
        &[
            encode_tlv(ASN1_OID_TAG, &id_ct_tst_info),
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
    let id_signed_data = [0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x02];
    encode_tlv(
        ASN1_SEQUENCE_TAG,
        &[
            encode_tlv(ASN1_OID_TAG, &id_signed_data),
            encode_tlv(ASN1_CONTEXT_0_EXPLICIT_TAG, &signed_data),
        ]
        .concat(),
    )
}

/// Grants a token for whatever digest it is asked about.
#[derive(Default)]
pub struct LocalTimestamp {
    calls: AtomicUsize,
}

impl LocalTimestamp {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TimestampSource for LocalTimestamp {
    fn timestamp(&self, digest: &DigestBytes) -> SigningResult<TimestampToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        TimestampToken::from_der(timestamp_token_der(digest.algorithm(), digest.as_slice()))
    }
}

/// Always fails with the given kind, like an authority that cannot be reached.
pub struct FailingTimestamp(pub TimestampFailure);

impl TimestampSource for FailingTimestamp {
    fn timestamp(&self, _digest: &DigestBytes) -> SigningResult<TimestampToken> {
        Err(SigningError::timestamp(self.0, "simulated authority failure"))
    }
}
