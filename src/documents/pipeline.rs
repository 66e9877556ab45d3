//! Retrieval Pipeline
//!
//! Drives chunking → embedding → indexing over a batch of documents and
//! hands back a `RetrievalSession` that owns the index, the parallel chunk
//! sequence and the embedder that produced them. Queries go through the
//! session, so they always land in the index's embedding space.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::chunker::{chunk_text, validate_window, Chunk, ChunkerError};
use super::embeddings::{embed_checked, Embedder, EmbeddingError};
use super::index::{FlatIndex, IndexError, VectorIndex};
use super::retriever::{retrieve, search_chunks, RetrieverError};

#[derive(Error, Debug, PartialEq)]
pub enum PipelineError {
    #[error("No text could be extracted. Please upload readable documents or clear images for OCR.")]
    EmptyCorpus,
    #[error("Chunker error: {0}")]
    Chunker(#[from] ChunkerError),
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
    #[error("Retrieval failed: {0}")]
    Retriever(#[from] RetrieverError),
}

impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// A ranked passage with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passage {
    pub position: usize,
    pub document: usize,
    pub score: f32,
    pub text: String,
}

/// Size counters for a built session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub documents: usize,
    pub chunks: usize,
    pub dimension: usize,
}

/// Index, chunk sequence and embedder of one run. Immutable once built.
pub struct RetrievalSession<E> {
    index: FlatIndex,
    chunks: Vec<Chunk>,
    embedder: E,
    documents: usize,
}

impl<E: Embedder> RetrievalSession<E> {
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            documents: self.documents,
            chunks: self.chunks.len(),
            dimension: self.index.dimension(),
        }
    }

    /// Top `top_k` chunk texts for `query`, best first
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>, RetrieverError> {
        retrieve(query, &self.index, &self.chunks, &self.embedder, top_k)
    }

    /// Like `retrieve`, keeping scores and originating documents
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, RetrieverError> {
        Ok(search_chunks(query, &self.index, &self.chunks, &self.embedder, top_k)?
            .into_iter()
            .map(|(neighbor, chunk)| Passage {
                position: neighbor.position,
                document: chunk.document,
                score: neighbor.score,
                text: chunk.text.clone(),
            })
            .collect())
    }

    pub fn into_parts(self) -> (FlatIndex, Vec<Chunk>, E) {
        (self.index, self.chunks, self.embedder)
    }
}

impl AsRef<str> for Chunk {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Chunk every document, flatten the chunks in input order, embed them in
/// one batch and index the result.
///
/// Fails with `PipelineError::EmptyCorpus` when no document yields a chunk.
pub fn build_pipeline<S, E>(
    documents: &[S],
    chunk_size: usize,
    overlap: usize,
    embedder: E,
) -> Result<RetrievalSession<E>, PipelineError>
where
    S: AsRef<str>,
    E: Embedder,
{
    validate_window(chunk_size, overlap)?;

    let mut chunks: Vec<Chunk> = Vec::new();
    for (document, text) in documents.iter().enumerate() {
        let pieces = chunk_text(text.as_ref(), chunk_size, overlap)?;
        debug!(document, chunks = pieces.len(), "Chunked document");
        for piece in pieces {
            chunks.push(Chunk {
                position: chunks.len(),
                document,
                text: piece,
            });
        }
    }

    if chunks.is_empty() {
        return Err(PipelineError::EmptyCorpus);
    }

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let vectors = embed_checked(&embedder, &texts)?;
    let index = FlatIndex::build_tagged(embedder.model_id(), vectors)?;

    info!(
        documents = documents.len(),
        chunks = chunks.len(),
        dimension = index.dimension(),
        model = embedder.model_id(),
        "Built retrieval session"
    );

    Ok(RetrievalSession {
        index,
        chunks,
        embedder,
        documents: documents.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::embeddings::{CachedEmbedder, HashingEmbedder};

    const MISSION: &str = "Mission: grow AI literacy. Strategy: invest in data skills.";

    #[test]
    fn test_mission_scenario() {
        let session = build_pipeline(&[MISSION], 20, 5, HashingEmbedder::default()).unwrap();
        assert_eq!(session.chunks().len(), 4);

        // No 20-char window holds all of "grow AI literacy"; the one sharing "literacy" and "strategy" wins
        let results = session.retrieve("AI literacy strategy", 1).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].contains("literacy"));
        assert_eq!(results[0], "I literacy. Strategy");
    }

    #[test]
    fn test_empty_corpus() {
        let err = build_pipeline(&["", "   "], 800, 120, HashingEmbedder::default())
            .err()
            .unwrap();
        assert_eq!(err, PipelineError::EmptyCorpus);

        let none: [&str; 0] = [];
        assert_eq!(
            build_pipeline(&none, 800, 120, HashingEmbedder::default()).err(),
            Some(PipelineError::EmptyCorpus)
        );
    }

    #[test]
    fn test_invalid_window_rejected_before_chunking() {
        let err = build_pipeline(&[""], 10, 10, HashingEmbedder::default()).err().unwrap();
        assert!(matches!(err, PipelineError::Chunker(ChunkerError::OverlapTooLarge { .. })));
    }

    #[test]
    fn test_flattens_documents_in_order() {
        let docs = vec![
            "alpha beta gamma delta".to_string(),
            String::new(),
            "epsilon zeta".to_string(),
        ];
        let session = build_pipeline(&docs, 12, 2, HashingEmbedder::default()).unwrap();

        let chunks = session.chunks();
        assert!(chunks.iter().enumerate().all(|(i, c)| c.position == i));
        assert!(chunks.windows(2).all(|w| w[0].document <= w[1].document));
        assert_eq!(chunks.last().unwrap().document, 2);
        assert!(chunks.iter().all(|c| c.document != 1));
        assert_eq!(session.index().len(), chunks.len());
        assert_eq!(session.stats().documents, 3);
    }

    #[test]
    fn test_search_reports_provenance() {
        let docs = [
            "Quarterly budget review for the finance team.",
            "Mentor program pairing senior engineers with new managers.",
        ];
        let session = build_pipeline(&docs, 800, 120, HashingEmbedder::default()).unwrap();

        let passages = session.search("mentor program for managers", 2).unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].document, 1);
        assert!(passages[0].score > passages[1].score);
    }

    #[test]
    fn test_top_k_exactly_min() {
        let session = build_pipeline(&[MISSION], 20, 5, HashingEmbedder::default()).unwrap();
        assert_eq!(session.retrieve("data", 2).unwrap().len(), 2);
        assert_eq!(session.retrieve("data", 99).unwrap().len(), 4);
        assert!(session.retrieve("data", 0).unwrap().is_empty());
    }

    #[test]
    fn test_deterministic_runs() {
        let docs = [MISSION, "Training needs: analytics, leadership, and AI ethics."];
        let a = build_pipeline(&docs, 24, 6, HashingEmbedder::default()).unwrap();
        let b = build_pipeline(&docs, 24, 6, HashingEmbedder::default()).unwrap();

        assert_eq!(a.chunks(), b.chunks());
        assert_eq!(
            a.search("AI ethics training", 5).unwrap(),
            b.search("AI ethics training", 5).unwrap()
        );
    }

    #[test]
    fn test_session_with_cached_embedder() {
        let session = build_pipeline(&[MISSION], 20, 5, CachedEmbedder::new(HashingEmbedder::default())).unwrap();
        let first = session.retrieve("invest in data", 2).unwrap();
        let again = session.retrieve("invest in data", 2).unwrap();
        assert_eq!(first, again);
        assert_eq!(session.embedder().cached_len(), 5);
    }

    #[test]
    fn test_into_parts_keeps_correspondence() {
        let session = build_pipeline(&[MISSION], 20, 5, HashingEmbedder::default()).unwrap();
        let (index, chunks, embedder) = session.into_parts();
        let results = retrieve(&chunks[2].text, &index, &chunks, &embedder, 1).unwrap();
        assert_eq!(results, vec![chunks[2].text.clone()]);
    }
}
