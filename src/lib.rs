// Skillscope Library
// Retrieval core and diagnosis glue, shared by the CLI binary and tests

pub mod config;
pub mod diagnosis;
pub mod documents;
pub mod llm;

pub use config::{default_config_path, ConfigError, LlmConfig, RagConfig, SkillscopeConfig, MAX_TOP_K};

pub use documents::{
    build_pipeline, chunk_text, embed_checked, embedder_from_config, load_document, normalize_whitespace,
    retrieve, search_chunks,
    CachedEmbedder, Chunk, ChunkerError, Document, DocumentError, DocumentFormat, DocumentMeta, Embedder,
    Embedding, EmbeddingError, FlatIndex, HashingEmbedder, IndexError, Neighbor, Passage, PipelineError,
    RetrievalSession, RetrieverError, SessionStats, VectorIndex,
    DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP,
};

pub use diagnosis::{
    diagnosis_prompt, diagnosis_query, format_context, parse_diagnosis,
    CompanyProfile, Diagnosis, DiagnosisError, DiagnosisReport, Priority, SkillGap, DIAGNOSIS_QUERY,
};

pub use llm::{ChatModel, GroqClient, LlmError};
