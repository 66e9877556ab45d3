//! Embeddings
//!
//! Maps chunk and query text into fixed-dimension, L2-normalized vectors so
//! that an inner product equals cosine similarity. The embedder is an
//! explicit value: build it once, then pass it to both the build and the
//! query path.
//!
//! The bundled `HashingEmbedder` uses the hashing trick: each token lands in
//! a fixed bucket, with no vocabulary to maintain. Embeddings are stable, so
//! the same text always produces the same vector whatever else has been
//! embedded.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Default dimensionality of the hashing embedder.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Model identifier of the hashing embedder.
pub const HASHING_MODEL_ID: &str = "feature-hash";

#[derive(Error, Debug, PartialEq)]
pub enum EmbeddingError {
    #[error("Embedding requested for an empty batch")]
    EmptyInput,
    #[error("Cannot embed empty text")]
    EmptyText,
    #[error("Embedding dimension must be positive")]
    ZeroDimension,
    #[error("Unknown embedding model: {0}")]
    UnknownModel(String),
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Embedder returned {actual} vectors for {expected} texts")]
    CountMismatch { expected: usize, actual: usize },
    #[error("Embedding generation failed: {0}")]
    GenerationFailed(String),
}

impl Serialize for EmbeddingError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Embedding vector
pub type Embedding = Vec<f32>;

/// Text-to-vector model shared by the build and query paths.
///
/// Implementations must return one unit-norm vector of length `dimension()`
/// per input text, and must fail with `EmbeddingError::EmptyInput` for an
/// empty batch.
pub trait Embedder: Send + Sync {
    /// Identity of the embedding space; vectors from different ids are not comparable.
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError>;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        (**self).embed(texts)
    }
}

/// Embed `texts` and verify the embedder honoured its contract: one vector
/// per text, every vector of the advertised dimension.
pub fn embed_checked<E: Embedder + ?Sized>(
    embedder: &E,
    texts: &[&str],
) -> Result<Vec<Embedding>, EmbeddingError> {
    let vectors = embedder.embed(texts)?;
    if vectors.len() != texts.len() {
        return Err(EmbeddingError::CountMismatch {
            expected: texts.len(),
            actual: vectors.len(),
        });
    }

    let expected = embedder.dimension();
    if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: bad.len(),
        });
    }

    Ok(vectors)
}

/// Resolve a configured model identity into an embedder.
pub fn embedder_from_config(model: &str, dimension: usize) -> Result<Box<dyn Embedder>, EmbeddingError> {
    match model {
        HASHING_MODEL_ID => Ok(Box::new(HashingEmbedder::new(dimension)?)),
        other => Err(EmbeddingError::UnknownModel(other.to_string())),
    }
}

/// Scale `v` to unit L2 norm. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Inner product; equals cosine similarity for unit-norm inputs
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

// ============ HASHING EMBEDDER ============

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a. Fixed across toolchains, unlike `DefaultHasher`, so bucket
/// assignment never drifts between builds.
fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Feature-hashing bag-of-words embedder
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::ZeroDimension);
        }
        Ok(Self { dimension })
    }

    fn bucket(&self, token: &str) -> usize {
        (fnv1a(token) % self.dimension as u64) as usize
    }

    /// Generate embedding for a single text.
    ///
    /// Lowercased alphanumeric tokens are counted into buckets. Text with no
    /// such token (punctuation only) falls back to its individual characters
    /// so every non-empty input still gets a unit vector.
    pub fn embed_one(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let tokens: Vec<String> = text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();

        let features: Vec<String> = if tokens.is_empty() {
            text.chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| c.to_string())
                .collect()
        } else {
            tokens
        };

        if features.is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        let mut tf = vec![0.0f32; self.dimension];
        for feature in &features {
            tf[self.bucket(feature)] += 1.0;
        }

        l2_normalize(&mut tf);
        Ok(tf)
    }
}

impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        HASHING_MODEL_ID
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}

// ============ CACHING WRAPPER ============

/// Memoizes another embedder's output by exact text.
///
/// The cache lives as long as the wrapper, so a session that re-asks the
/// same query only pays for the model call once.
pub struct CachedEmbedder<E> {
    inner: E,
    cache: RwLock<HashMap<String, Embedding>>,
}

impl<E: Embedder> CachedEmbedder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Number of cached texts
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }
}

impl<E: Embedder> Embedder for CachedEmbedder<E> {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut misses: Vec<&str> = {
            let cache = self.cache.read();
            texts.iter().copied().filter(|t| !cache.contains_key(*t)).collect()
        };
        misses.sort_unstable();
        misses.dedup();

        if !misses.is_empty() {
            debug!(hits = texts.len() - misses.len(), misses = misses.len(), "Embedding cache lookup");
            let fresh = embed_checked(&self.inner, &misses)?;
            let mut cache = self.cache.write();
            for (text, vector) in misses.iter().zip(fresh) {
                cache.insert((*text).to_string(), vector);
            }
        }

        let cache = self.cache.read();
        texts
            .iter()
            .map(|t| {
                cache.get(*t).cloned().ok_or_else(|| {
                    EmbeddingError::GenerationFailed(format!("missing cached embedding for {:?}", t))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn test_generate_embedding() {
        let embedder = HashingEmbedder::default();
        let embedding = embedder.embed_one("Hello world this is a test").unwrap();
        assert_eq!(embedding.len(), DEFAULT_EMBEDDING_DIM);
    }

    #[test]
    fn test_unit_norm() {
        let embedder = HashingEmbedder::new(64).unwrap();
        let texts = ["Strategy: invest in data skills.", "a a a a b", "!!! ???", "ó"];
        for v in embedder.embed(&texts).unwrap() {
            assert!((norm(&v) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_embedding_stability() {
        let embedder = HashingEmbedder::default();
        let emb1 = embedder.embed_one("The quick brown fox").unwrap();

        let _ = embedder.embed_one("completely different words zebra giraffe quantum");
        let _ = embedder.embed_one("another set of unique vocabulary items here");

        let emb2 = embedder.embed_one("The quick brown fox").unwrap();
        assert_eq!(emb1, emb2, "Embeddings for the same text must be identical regardless of intermediate calls");
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let embedder = HashingEmbedder::default();
        assert_eq!(
            embedder.embed_one("AI literacy, strategy!").unwrap(),
            embedder.embed_one("ai LITERACY strategy").unwrap()
        );
    }

    #[test]
    fn test_empty_batch_and_text() {
        let embedder = HashingEmbedder::default();
        assert_eq!(embedder.embed(&[]), Err(EmbeddingError::EmptyInput));
        assert_eq!(embedder.embed(&["   "]), Err(EmbeddingError::EmptyText));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert_eq!(HashingEmbedder::new(0).unwrap_err(), EmbeddingError::ZeroDimension);
    }

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a(""), 0xcbf29ce484222325);
        assert_eq!(fnv1a("a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_from_config() {
        let embedder = embedder_from_config(HASHING_MODEL_ID, 128).unwrap();
        assert_eq!(embedder.dimension(), 128);
        assert_eq!(embedder.model_id(), HASHING_MODEL_ID);
        assert!(matches!(
            embedder_from_config("all-MiniLM-L6-v2", 384),
            Err(EmbeddingError::UnknownModel(_))
        ));
    }

    struct CountingEmbedder {
        inner: HashingEmbedder,
        calls: AtomicUsize,
    }

    impl Embedder for CountingEmbedder {
        fn model_id(&self) -> &str {
            "counting"
        }
        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
        fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
            self.calls.fetch_add(texts.len(), Ordering::SeqCst);
            self.inner.embed(texts)
        }
    }

    #[test]
    fn test_cached_embedder_reuses_vectors() {
        let cached = CachedEmbedder::new(CountingEmbedder {
            inner: HashingEmbedder::new(32).unwrap(),
            calls: AtomicUsize::new(0),
        });

        let first = cached.embed(&["skills gap", "mentor", "skills gap"]).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first[0], first[2]);
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 2);

        let second = cached.embed(&["mentor"]).unwrap();
        assert_eq!(second[0], first[1]);
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 2);
        assert_eq!(cached.cached_len(), 2);

        cached.clear();
        assert_eq!(cached.cached_len(), 0);
    }

    struct BrokenEmbedder;

    impl Embedder for BrokenEmbedder {
        fn model_id(&self) -> &str {
            "broken"
        }
        fn dimension(&self) -> usize {
            4
        }
        fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[test]
    fn test_embed_checked_catches_bad_dimension() {
        assert_eq!(
            embed_checked(&BrokenEmbedder, &["x"]),
            Err(EmbeddingError::DimensionMismatch { expected: 4, actual: 2 })
        );
    }
}
