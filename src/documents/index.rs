//! Vector Index
//!
//! Exact inner-product search over L2-normalized embeddings. Corpora here are
//! tens to low thousands of chunks per run, so a linear scan is fast enough
//! and fully deterministic. An approximate index can replace `FlatIndex`
//! behind the `VectorIndex` trait without changing the ordering contract.

use serde::Serialize;
use std::cmp::Ordering;
use thiserror::Error;

use super::embeddings::{dot, Embedding};

#[derive(Error, Debug, PartialEq)]
pub enum IndexError {
    #[error("Cannot build an index from zero vectors")]
    Empty,
    #[error("Vector dimension mismatch at position {position}: expected {expected}, got {actual}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Query dimension mismatch: index holds {expected}-d vectors, query is {actual}-d")]
    QueryDimension { expected: usize, actual: usize },
}

impl Serialize for IndexError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// One search hit: insertion position and inner-product score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub position: usize,
    pub score: f32,
}

/// Read-only nearest-neighbour contract shared by every index backend.
///
/// `search` returns at most `k` hits sorted by descending score; ties keep
/// insertion order. When the index holds fewer than `k` vectors, all of them
/// are returned.
pub trait VectorIndex {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dimension(&self) -> usize;

    /// Identity of the embedder that produced the stored vectors, if recorded
    fn model_id(&self) -> Option<&str>;

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError>;
}

/// Brute-force index: vectors in insertion order, position `i` ↔ chunk `i`
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Embedding>,
    model_id: Option<String>,
}

impl FlatIndex {
    /// Build an index over `vectors`, recording their order as their position.
    pub fn build(vectors: Vec<Embedding>) -> Result<Self, IndexError> {
        let dimension = match vectors.first() {
            Some(first) => first.len(),
            None => return Err(IndexError::Empty),
        };

        if let Some((position, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimension) {
            return Err(IndexError::DimensionMismatch {
                position,
                expected: dimension,
                actual: v.len(),
            });
        }

        Ok(Self {
            dimension,
            vectors,
            model_id: None,
        })
    }

    /// Build an index tagged with the embedder identity that produced `vectors`.
    pub fn build_tagged(model_id: impl Into<String>, vectors: Vec<Embedding>) -> Result<Self, IndexError> {
        let mut index = Self::build(vectors)?;
        index.model_id = Some(model_id.into());
        Ok(index)
    }
}

impl VectorIndex for FlatIndex {
    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::QueryDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, v)| Neighbor {
                position,
                score: dot(query, v),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}
