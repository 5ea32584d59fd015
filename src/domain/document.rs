//! Document domain type.
//!
//! A [`Document`] is an immutable source of bytes to be signed (or an already
//! signed result) plus metadata. Documents can be chained through an owned
//! *next document* link when one signature covers several parts; ownership
//! makes the chain acyclic by construction.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::domain::crypto::{DigestAlgorithm, DigestBytes};
use crate::infra::error::{SigningError, SigningResult};

/// Mime type metadata carried alongside document content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimeType {
    Binary,
    Text,
    Xml,
    Json,
    Pdf,
    Pkcs7,
    Other(String),
}

impl MimeType {
    pub fn as_str(&self) -> &str {
        match self {
            MimeType::Binary => "application/octet-stream",
            MimeType::Text => "text/plain",
            MimeType::Xml => "text/xml",
            MimeType::Json => "application/json",
            MimeType::Pdf => "application/pdf",
            MimeType::Pkcs7 => "application/pkcs7-signature",
            MimeType::Other(s) => s,
        }
    }

    /// Parse a mime type string; unknown types are kept verbatim.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "application/octet-stream" => MimeType::Binary,
            "text/plain" => MimeType::Text,
            "text/xml" | "application/xml" => MimeType::Xml,
            "application/json" => MimeType::Json,
            "application/pdf" => MimeType::Pdf,
            "application/pkcs7-signature" => MimeType::Pkcs7,
            _ => MimeType::Other(s.trim().to_string()),
        }
    }

    /// Guess from a file name extension, falling back to binary.
    pub fn from_file_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("txt") => MimeType::Text,
            Some("xml") => MimeType::Xml,
            Some("json") => MimeType::Json,
            Some("pdf") => MimeType::Pdf,
            Some("p7s") | Some("p7m") => MimeType::Pkcs7,
            _ => MimeType::Binary,
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
enum Content {
    Memory(Arc<[u8]>),
    /// File-backed content; the file must not change while the document is in use.
    File(PathBuf),
}

/// Immutable source of bytes with metadata and an optional next document.
pub struct Document {
    name: String,
    absolute_path: Option<PathBuf>,
    mime_type: MimeType,
    content: Content,
    next: Option<Box<Document>>,
}

impl Document {
    /// In-memory document.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        let mime_type = MimeType::from_file_name(&name);
        let bytes: Vec<u8> = bytes.into();
        Self {
            name,
            absolute_path: None,
            mime_type,
            content: Content::Memory(Arc::from(bytes)),
            next: None,
        }
    }

    /// File-backed document. Content is streamed from disk on every access.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SigningResult<Self> {
        let path = path.as_ref();
        let absolute = std::fs::canonicalize(path).map_err(|e| {
            SigningError::IoError(format!("Failed to resolve {}: {e}", path.display()))
        })?;
        if !absolute.is_file() {
            return Err(SigningError::IoError(format!(
                "Not a regular file: {}",
                absolute.display()
            )));
        }
        let name = absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| absolute.display().to_string());
        let mime_type = MimeType::from_file_name(&name);
        Ok(Self {
            name,
            absolute_path: Some(absolute.clone()),
            mime_type,
            content: Content::File(absolute),
            next: None,
        })
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: MimeType) -> Self {
        self.mime_type = mime_type;
        self
    }

    /// Fresh reader over the content; released when dropped.
    pub fn open_stream(&self) -> SigningResult<Box<dyn Read + Send + '_>> {
        match &self.content {
            Content::Memory(bytes) => Ok(Box::new(Cursor::new(&bytes[..]))),
            Content::File(path) => {
                let file = File::open(path).map_err(|e| {
                    SigningError::IoError(format!("Failed to open {}: {e}", path.display()))
                })?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }

    /// Whole content in memory. Prefer [`Document::open_stream`] for large content.
    pub fn bytes(&self) -> SigningResult<Vec<u8>> {
        match &self.content {
            Content::Memory(bytes) => Ok(bytes.to_vec()),
            Content::File(path) => std::fs::read(path).map_err(|e| {
                SigningError::IoError(format!("Failed to read {}: {e}", path.display()))
            }),
        }
    }

    /// Base64 encoding of the whole content.
    pub fn base64_encoded(&self) -> SigningResult<String> {
        Ok(BASE64.encode(self.bytes()?))
    }

    /// Digest of the content.
    pub fn digest_bytes(&self, algorithm: DigestAlgorithm) -> SigningResult<DigestBytes> {
        let mut stream = self.open_stream()?;
        let digest = algorithm.digest_reader(&mut stream).map_err(|e| {
            SigningError::IoError(format!("Failed to digest {}: {e}", self.name))
        })?;
        DigestBytes::new(algorithm, digest).map_err(|e| SigningError::IoError(e.to_string()))
    }

    /// Base64-encoded digest of the content.
    pub fn digest(&self, algorithm: DigestAlgorithm) -> SigningResult<String> {
        Ok(self.digest_bytes(algorithm)?.to_base64())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn absolute_path(&self) -> Option<&Path> {
        self.absolute_path.as_deref()
    }

    pub fn mime_type(&self) -> &MimeType {
        &self.mime_type
    }

    pub fn set_mime_type(&mut self, mime_type: MimeType) {
        self.mime_type = mime_type;
    }

    /// Persist the content bytes to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> SigningResult<()> {
        let path = path.as_ref();
        let mut stream = self.open_stream()?;
        let mut out = File::create(path).map_err(|e| {
            SigningError::IoError(format!("Failed to create {}: {e}", path.display()))
        })?;
        io::copy(&mut stream, &mut out).map_err(|e| {
            SigningError::IoError(format!("Failed to write {}: {e}", path.display()))
        })?;
        out.sync_all().map_err(|e| {
            SigningError::IoError(format!("Failed to flush {}: {e}", path.display()))
        })?;
        log::debug!("Saved document '{}' to {}", self.name, path.display());
        Ok(())
    }

    pub fn next_document(&self) -> Option<&Document> {
        self.next.as_deref()
    }

    /// Replace the next document, returning the one it displaced.
    pub fn set_next_document(&mut self, next: Document) -> Option<Document> {
        self.next.replace(Box::new(next)).map(|b| *b)
    }

    pub fn take_next_document(&mut self) -> Option<Document> {
        self.next.take().map(|b| *b)
    }

    /// Attach `document` after the last element of this chain.
    pub fn append_document(&mut self, document: Document) {
        let mut cursor = self;
        loop {
            if cursor.next.is_none() {
                cursor.next = Some(Box::new(document));
                return;
            }
            cursor = match cursor.next.as_deref_mut() {
                Some(next) => next,
                None => return,
            };
        }
    }

    /// Iterate this document followed by every chained document.
    pub fn chain(&self) -> DocumentChain<'_> {
        DocumentChain {
            current: Some(self),
        }
    }

    pub fn chain_len(&self) -> usize {
        self.chain().count()
    }
}

impl Document {
    /// Copy of this node alone, without its chain.
    fn clone_link(&self) -> Self {
        Self {
            name: self.name.clone(),
            absolute_path: self.absolute_path.clone(),
            mime_type: self.mime_type.clone(),
            content: self.content.clone(),
            next: None,
        }
    }
}

impl Clone for Document {
    // Relink from the tail so long chains do not recurse on clone.
    fn clone(&self) -> Self {
        let mut rest: Vec<Document> = self.chain().skip(1).map(Document::clone_link).collect();
        let mut next = None;
        while let Some(mut part) = rest.pop() {
            part.next = next;
            next = Some(Box::new(part));
        }
        let mut head = self.clone_link();
        head.next = next;
        head
    }
}

impl Drop for Document {
    // Unlink iteratively so long chains do not recurse on drop.
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(mut doc) = next {
            next = doc.next.take();
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.content {
            Content::Memory(bytes) => format!("memory({} bytes)", bytes.len()),
            Content::File(path) => format!("file({})", path.display()),
        };
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type.as_str())
            .field("content", &source)
            .field("chained", &(self.chain_len() - 1))
            .finish()
    }
}

/// Iterator over a document chain, head first.
pub struct DocumentChain<'a> {
    current: Option<&'a Document>,
}

impl<'a> Iterator for DocumentChain<'a> {
    type Item = &'a Document;

    fn next(&mut self) -> Option<Self::Item> {
        let doc = self.current?;
        self.current = doc.next_document();
        Some(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn digest_is_stable_for_unchanged_content() {
        let doc = Document::from_bytes("contract.txt", b"pay 100 EUR".to_vec());
        let first = doc.digest(DigestAlgorithm::Sha256).unwrap();
        let second = doc.digest(DigestAlgorithm::Sha256).unwrap();
        assert_eq!(first, second);
        assert_eq!(doc.mime_type(), &MimeType::Text);
    }

    #[test]
    fn streams_are_independent() {
        let doc = Document::from_bytes("a.bin", vec![1u8, 2, 3, 4]);
        let mut s1 = doc.open_stream().unwrap();
        let mut s2 = doc.open_stream().unwrap();
        let mut head = [0u8; 2];
        s1.read_exact(&mut head).unwrap();
        let mut all = Vec::new();
        s2.read_to_end(&mut all).unwrap();
        assert_eq!(head, [1, 2]);
        assert_eq!(all, vec![1, 2, 3, 4]);
    }

    #[test]
    fn mime_type_is_metadata_only() {
        let mut doc = Document::from_bytes("data.bin", b"<a/>".to_vec());
        let before = doc.digest(DigestAlgorithm::Sha256).unwrap();
        doc.set_mime_type(MimeType::Xml);
        assert_eq!(doc.mime_type().as_str(), "text/xml");
        assert_eq!(doc.digest(DigestAlgorithm::Sha256).unwrap(), before);
    }

    #[test]
    fn file_document_matches_memory_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("payload.xml");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"<doc>hello</doc>")
            .unwrap();

        let file_doc = Document::from_file(&path).unwrap();
        let mem_doc = Document::from_bytes("payload.xml", b"<doc>hello</doc>".to_vec());
        assert_eq!(file_doc.name(), "payload.xml");
        assert!(file_doc.absolute_path().unwrap().is_absolute());
        assert_eq!(file_doc.mime_type(), &MimeType::Xml);
        assert_eq!(
            file_doc.digest(DigestAlgorithm::Sha384).unwrap(),
            mem_doc.digest(DigestAlgorithm::Sha384).unwrap()
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Document::from_file("/definitely/not/here.bin").unwrap_err();
        assert!(matches!(err, SigningError::IoError(_)));
    }

    #[test]
    fn save_round_trips_bytes() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("copy.bin");
        let doc = Document::from_bytes("orig.bin", vec![9u8; 1000]);
        doc.save(&out).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), vec![9u8; 1000]);
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("missing").join("copy.bin");
        let doc = Document::from_bytes("orig.bin", vec![1u8]);
        assert!(matches!(doc.save(&out), Err(SigningError::IoError(_))));
    }

    #[test]
    fn set_next_replaces_link() {
        let mut head = Document::from_bytes("manifest.xml", b"m".to_vec());
        assert!(head.set_next_document(Document::from_bytes("a", b"a".to_vec())).is_none());
        let displaced = head
            .set_next_document(Document::from_bytes("b", b"b".to_vec()))
            .unwrap();
        assert_eq!(displaced.name(), "a");
        assert_eq!(head.next_document().unwrap().name(), "b");
        assert_eq!(head.chain_len(), 2);
    }

    #[test]
    fn long_chain_drops_without_recursion() {
        let mut head = Document::from_bytes("head", Vec::new());
        let mut tail = Document::from_bytes("n0", Vec::new());
        for i in 1..50_000 {
            let mut next = Document::from_bytes(format!("n{i}"), Vec::new());
            next.set_next_document(tail);
            tail = next;
        }
        head.set_next_document(tail);
        assert_eq!(head.chain_len(), 50_001);
        drop(head);
    }

    #[test]
    fn long_chain_clones_without_recursion() {
        let mut head = Document::from_bytes("head", b"h".to_vec());
        let mut tail = Document::from_bytes("n0", Vec::new());
        for i in 1..200_000 {
            let mut next = Document::from_bytes(format!("n{i}"), Vec::new());
            next.set_next_document(tail);
            tail = next;
        }
        head.set_next_document(tail);

        let copy = head.clone();
        assert_eq!(copy.chain_len(), 200_001);
        assert_eq!(copy.bytes().unwrap(), b"h");
        assert_eq!(copy.next_document().unwrap().name(), "n199999");
        assert_eq!(copy.chain().last().unwrap().name(), "n0");
        drop(head);
        drop(copy);
    }

    #[test]
    fn clone_is_independent_of_original() {
        let mut head = Document::from_bytes("a.txt", b"a".to_vec());
        head.append_document(Document::from_bytes("b.txt", b"b".to_vec()));
        let mut copy = head.clone();
        copy.append_document(Document::from_bytes("c.txt", b"c".to_vec()));
        copy.set_mime_type(MimeType::Json);

        assert_eq!(head.chain_len(), 2);
        assert_eq!(copy.chain_len(), 3);
        assert_eq!(head.mime_type(), &MimeType::from_file_name("a.txt"));
        let names: Vec<_> = copy.chain().map(Document::name).collect();
        assert_eq!(names, ["a.txt", "b.txt", "c.txt"]);
    }
}
