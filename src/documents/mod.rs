//! Reference Document Retrieval
//!
//! Chunking, embedding, indexing and retrieval over the documents of a run.

pub mod chunker;
pub mod document;
pub mod embeddings;
pub mod index;
pub mod pipeline;
pub mod retriever;

// Re-export key public types
pub use chunker::{chunk_text, normalize_whitespace, Chunk, ChunkerError, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
pub use document::{load_document, Document, DocumentError, DocumentFormat, DocumentMeta};
pub use embeddings::{
    embed_checked, embedder_from_config, CachedEmbedder, Embedder, Embedding, EmbeddingError,
    HashingEmbedder,
};
pub use index::{FlatIndex, IndexError, Neighbor, VectorIndex};
pub use pipeline::{build_pipeline, Passage, PipelineError, RetrievalSession, SessionStats};
pub use retriever::{retrieve, search_chunks, RetrieverError};
