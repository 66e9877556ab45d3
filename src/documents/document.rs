//! Source Documents
//!
//! Plain extracted text plus the metadata recorded for each uploaded file.
//! Format-specific extraction (PDF, DOCX, OCR) happens outside this crate;
//! only plain-text files can be read directly from disk.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Maximum file size (50 MB) accepted by `load_document`.
const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0:?} files need an external text extractor")]
    NeedsExtraction(DocumentFormat),
    #[error("File too large: {0} bytes (max {1} bytes)")]
    FileTooLarge(u64, u64),
}

impl Serialize for DocumentError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Format tag derived from the upload's file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    /// txt / md
    Text,
    /// png / jpg / jpeg, read through OCR
    Image,
    Unknown,
}

impl DocumentFormat {
    pub fn from_filename(filename: &str) -> Self {
        let extension = Path::new(filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => DocumentFormat::Pdf,
            "docx" => DocumentFormat::Docx,
            "txt" | "md" | "markdown" => DocumentFormat::Text,
            "png" | "jpg" | "jpeg" => DocumentFormat::Image,
            _ => DocumentFormat::Unknown,
        }
    }
}

/// Extracted text of one uploaded file. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub filename: String,
    pub format: DocumentFormat,
    pub text: String,
    /// Character (not byte) count of `text`
    pub char_count: usize,
}

/// Per-upload metadata reported back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub filename: String,
    #[serde(rename = "type")]
    pub format: DocumentFormat,
    pub chars: usize,
}

impl Document {
    /// Wrap text produced by an external extractor.
    pub fn from_extracted(filename: impl Into<String>, text: impl Into<String>) -> Self {
        let filename = filename.into();
        let text = text.into();
        Self {
            format: DocumentFormat::from_filename(&filename),
            char_count: text.chars().count(),
            filename,
            text,
        }
    }

    pub fn meta(&self) -> DocumentMeta {
        DocumentMeta {
            filename: self.filename.clone(),
            format: self.format,
            chars: self.char_count,
        }
    }

    /// True when the text holds nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Read a plain-text document from disk.
///
/// Invalid UTF-8 sequences are replaced rather than rejected, so a stray
/// byte in an exported file does not sink the whole run.
pub fn load_document(path: &Path) -> Result<Document, DocumentError> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "uploaded_file".to_string());

    let format = DocumentFormat::from_filename(&filename);
    if format != DocumentFormat::Text {
        return Err(DocumentError::NeedsExtraction(format));
    }

    let file_size = fs::metadata(path)?.len();
    if file_size > MAX_FILE_SIZE {
        return Err(DocumentError::FileTooLarge(file_size, MAX_FILE_SIZE));
    }

    let raw = fs::read(path)?;
    let text = String::from_utf8_lossy(&raw).into_owned();
    Ok(Document::from_extracted(filename, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn scratch_file(name: &str, contents: &[u8]) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("skillscope-doc-{}", ulid::Ulid::new()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn test_format_from_filename() {
        assert_eq!(DocumentFormat::from_filename("plan.PDF"), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_filename("notes.docx"), DocumentFormat::Docx);
        assert_eq!(DocumentFormat::from_filename("readme.md"), DocumentFormat::Text);
        assert_eq!(DocumentFormat::from_filename("scan.jpeg"), DocumentFormat::Image);
        assert_eq!(DocumentFormat::from_filename("archive"), DocumentFormat::Unknown);
    }

    #[test]
    fn test_char_count_is_unicode_aware() {
        let doc = Document::from_extracted("misión.txt", "Misión: formación");
        assert_eq!(doc.char_count, 17);
        assert_eq!(doc.meta().chars, 17);
        assert_eq!(doc.meta().format, DocumentFormat::Text);
    }

    #[test]
    fn test_is_blank() {
        assert!(Document::from_extracted("a.txt", " \n\t ").is_blank());
        assert!(!Document::from_extracted("a.txt", " x ").is_blank());
    }

    #[test]
    fn test_load_text_document() {
        let path = scratch_file("strategy.txt", b"Mission: grow AI literacy.");
        let doc = load_document(&path).unwrap();
        assert_eq!(doc.filename, "strategy.txt");
        assert_eq!(doc.text, "Mission: grow AI literacy.");
        assert_eq!(doc.char_count, 26);
    }

    #[test]
    fn test_load_replaces_invalid_utf8() {
        let path = scratch_file("broken.txt", b"ok \xff done");
        let doc = load_document(&path).unwrap();
        assert!(doc.text.starts_with("ok "));
        assert!(doc.text.ends_with(" done"));
    }

    #[test]
    fn test_load_rejects_binary_formats() {
        let path = scratch_file("report.pdf", b"%PDF-1.7");
        match load_document(&path) {
            Err(DocumentError::NeedsExtraction(DocumentFormat::Pdf)) => {}
            other => panic!("expected NeedsExtraction, got {:?}", other),
        }
    }

    #[test]
    fn test_meta_serializes_type_field() {
        let meta = Document::from_extracted("scan.png", "text").meta();
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["chars"], 4);
    }
}
