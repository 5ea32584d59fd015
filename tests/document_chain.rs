//! Multi-part signing: every chained document is covered by one signature.

mod common;

use std::path::PathBuf;

use common::{keystore, parameters, pkcs12_file};
use tempfile::TempDir;
use token_signer::adapters::StaticPin;
use token_signer::domain::types::Pin;
use token_signer::services::SignatureEnvelope;
use token_signer::{
    DigestAlgorithm, Document, ErrorKind, KeyEntry, KeystoreToken, SessionState,
    SignaturePackaging, SignatureValue, SigningError, SigningOrchestrator, SigningResult,
    ToBeSigned, TokenConnection, TokenFailure, VerifyWorkflow,
};

/// Rewrites a file while the key operation is in progress, like an editor
/// saving during a PIN prompt.
struct RewritingToken {
    inner: KeystoreToken,
    path: PathBuf,
}

impl TokenConnection for RewritingToken {
    fn keys(&self) -> SigningResult<Vec<KeyEntry>> {
        self.inner.keys()
    }

    fn sign(
        &self,
        data: &ToBeSigned,
        digest_algorithm: DigestAlgorithm,
        key_entry: &KeyEntry,
    ) -> SigningResult<SignatureValue> {
        std::fs::write(&self.path, b"amended terms").unwrap();
        self.inner.sign(data, digest_algorithm, key_entry)
    }
}

fn chain_of(parts: usize) -> Document {
    let mut head = Document::from_bytes("part-0.txt", b"part 0".to_vec());
    for i in 1..parts {
        head.append_document(Document::from_bytes(
            format!("part-{i}.txt"),
            format!("part {i}").into_bytes(),
        ));
    }
    head
}

#[test]
fn every_chained_part_is_referenced() {
    let (token, entry) = keystore("chain");
    let document = chain_of(4);
    assert_eq!(document.chain_len(), 4);

    let signed = token_signer::sign_document(&document, &parameters(&entry), &entry, &token)
        .unwrap();
    let envelope = SignatureEnvelope::from_document(&signed).unwrap();
    let names: Vec<_> = envelope
        .signed_properties
        .references
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(names, ["part-0.txt", "part-1.txt", "part-2.txt", "part-3.txt"]);

    let detached: Vec<_> = document
        .chain()
        .map(|d| Document::from_bytes(d.name(), d.bytes().unwrap()))
        .collect();
    let report = VerifyWorkflow::new().run(&signed, &detached).unwrap();
    assert!(report.success(), "{:?}", report.problems);
}

#[test]
fn missing_part_fails_verification() {
    let (token, entry) = keystore("chain-missing");
    let document = chain_of(2);
    let signed = token_signer::sign_document(&document, &parameters(&entry), &entry, &token)
        .unwrap();

    let only_first = [Document::from_bytes("part-0.txt", b"part 0".to_vec())];
    let report = VerifyWorkflow::new().run(&signed, &only_first).unwrap();
    assert!(!report.references_ok);
}

#[test]
fn file_backed_digest_is_stable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.pdf");
    std::fs::write(&path, b"%PDF-1.7 fake").unwrap();

    let document = Document::from_file(&path).unwrap();
    let first = document.digest(DigestAlgorithm::Sha512).unwrap();
    let second = document.digest(DigestAlgorithm::Sha512).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first,
        Document::from_bytes("report.pdf", b"%PDF-1.7 fake".to_vec())
            .digest(DigestAlgorithm::Sha512)
            .unwrap()
    );
    assert!(document.absolute_path().is_some());
}

#[test]
fn saved_signature_verifies_from_disk() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("memo.txt");
    std::fs::write(&input, b"memo body").unwrap();

    let (token, entry) = keystore("disk");
    let document = Document::from_file(&input).unwrap();
    let signed = token_signer::sign_document(&document, &parameters(&entry), &entry, &token)
        .unwrap();
    let output = dir.path().join(signed.name());
    signed.save(&output).unwrap();

    let report = VerifyWorkflow::new()
        .run_files(&output, &[&input])
        .unwrap();
    assert!(report.success(), "{:?}", report.problems);
}

#[test]
fn file_changed_during_token_call_yields_no_document() {
    for packaging in [SignaturePackaging::Detached, SignaturePackaging::Enveloping] {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("contract.txt");
        std::fs::write(&input, b"original terms").unwrap();

        let (inner, entry) = keystore("rewritten");
        let token = RewritingToken {
            inner,
            path: input.clone(),
        };
        let document = Document::from_file(&input).unwrap();
        let params = parameters(&entry).with_packaging(packaging);
        let orchestrator = SigningOrchestrator::default();

        let mut session = orchestrator.session(&document, &params, &entry, &token);
        session.prepare().unwrap();
        session.sign().unwrap();
        let err = session.finalize().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Format, "{packaging:?}: {err:?}");
        assert!(matches!(session.state(), SessionState::Failed(_)));
        assert!(session.signature_value().is_none());
    }
}

#[test]
fn pkcs12_keystore_signs() {
    let dir = TempDir::new().unwrap();
    let path = pkcs12_file(dir.path(), "signer.p12", "s3cret");

    let token =
        KeystoreToken::from_pkcs12_file(&path, &StaticPin::new(Pin::new("s3cret").unwrap()))
            .unwrap();
    let entry = token.keys().unwrap().remove(0);
    assert_eq!(entry.handle().as_str(), "signer");

    let document = chain_of(1);
    let signed = token_signer::sign_document(&document, &parameters(&entry), &entry, &token)
        .unwrap();
    let report = VerifyWorkflow::new()
        .run(&signed, &[Document::from_bytes("part-0.txt", b"part 0".to_vec())])
        .unwrap();
    assert!(report.success(), "{:?}", report.problems);
}

#[test]
fn pkcs12_wrong_password_is_wrong_credential() {
    let dir = TempDir::new().unwrap();
    let path = pkcs12_file(dir.path(), "signer.p12", "right");

    let err = KeystoreToken::from_pkcs12_file(&path, &StaticPin::new(Pin::new("wrong").unwrap()))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        SigningError::TokenError {
            kind: TokenFailure::WrongCredential,
            ..
        }
    ));
}
