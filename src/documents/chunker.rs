//! Document Chunking
//!
//! Splits extracted document text into overlapping fixed-size windows, the
//! unit of retrieval. Whitespace is collapsed first so chunk boundaries do
//! not depend on the layout the extractor happened to produce.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default window length in characters
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Default overlap between consecutive windows in characters
pub const DEFAULT_OVERLAP: usize = 120;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChunkerError {
    #[error("Chunk size must be positive")]
    ZeroChunkSize,
    #[error("Overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },
}

impl Serialize for ChunkerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// A retrievable span of the flattened corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Position in the flattened chunk sequence (matches the index position)
    pub position: usize,
    /// Index of the originating document in the input batch
    pub document: usize,
    pub text: String,
}

/// Check window parameters; the step `chunk_size - overlap` must be positive.
pub fn validate_window(chunk_size: usize, overlap: usize) -> Result<(), ChunkerError> {
    if chunk_size == 0 {
        return Err(ChunkerError::ZeroChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ChunkerError::OverlapTooLarge { chunk_size, overlap });
    }
    Ok(())
}

/// Collapse every whitespace run (newlines and tabs included) into a single
/// space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Chunk text into windows of `chunk_size` characters stepping by
/// `chunk_size - overlap`.
///
/// Windows start at 0 and keep going until the start reaches the end of the
/// normalized text, so only the trailing window(s) may be shorter than
/// `chunk_size`. Empty or whitespace-only input yields no chunks.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, ChunkerError> {
    validate_window(chunk_size, overlap)?;

    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return Ok(Vec::new());
    }

    // Byte offset of every char plus the end, so windows never split a code point
    let boundaries: Vec<usize> = normalized
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(normalized.len()))
        .collect();
    let char_len = boundaries.len() - 1;
    let step = chunk_size - overlap;

    let mut chunks = Vec::with_capacity(char_len / step + 1);
    let mut start = 0usize;
    while start < char_len {
        let end = (start + chunk_size).min(char_len);
        chunks.push(normalized[boundaries[start]..boundaries[end]].to_string());
        start += step;
    }

    Ok(chunks)
}
