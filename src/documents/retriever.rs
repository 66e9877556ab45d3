//! Document Retrieval
//!
//! Embeds a query, searches the index and maps the hit positions back to the
//! parallel chunk sequence. Results come back in the index's order
//! (descending similarity) and are never re-sorted here.
//!
//! The query must be embedded by the same embedder that built the index.
//! When the index carries a model tag this is checked; an untagged index
//! leaves it to the caller.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::embeddings::{embed_checked, Embedder, EmbeddingError};
use super::index::{IndexError, Neighbor, VectorIndex};

#[derive(Error, Debug, PartialEq)]
pub enum RetrieverError {
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
    #[error("Index was built with embedder {index:?} but the query uses {query:?}")]
    ModelMismatch { index: String, query: String },
    #[error("Index holds {index}-d vectors but the query embedder produces {query}-d vectors")]
    DimensionMismatch { index: usize, query: usize },
}

impl Serialize for RetrieverError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Reject a query embedder that cannot share the index's embedding space.
pub fn check_compatible<I, E>(index: &I, embedder: &E) -> Result<(), RetrieverError>
where
    I: VectorIndex + ?Sized,
    E: Embedder + ?Sized,
{
    if let Some(tag) = index.model_id() {
        if tag != embedder.model_id() {
            return Err(RetrieverError::ModelMismatch {
                index: tag.to_string(),
                query: embedder.model_id().to_string(),
            });
        }
    }
    if index.dimension() != embedder.dimension() {
        return Err(RetrieverError::DimensionMismatch {
            index: index.dimension(),
            query: embedder.dimension(),
        });
    }
    Ok(())
}

/// Rank chunks against `query`, keeping each hit's position and score.
///
/// Positions the index reports beyond the end of `chunks` are dropped; that
/// only happens if the index and chunk sequence were built from different
/// inputs.
pub fn search_chunks<'a, T, I, E>(
    query: &str,
    index: &I,
    chunks: &'a [T],
    embedder: &E,
    top_k: usize,
) -> Result<Vec<(Neighbor, &'a T)>, RetrieverError>
where
    T: AsRef<str>,
    I: VectorIndex + ?Sized,
    E: Embedder + ?Sized,
{
    if top_k == 0 {
        return Ok(Vec::new());
    }

    check_compatible(index, embedder)?;

    let mut query_vectors = embed_checked(embedder, &[query])?;
    let query_vector = query_vectors.pop().ok_or(EmbeddingError::CountMismatch {
        expected: 1,
        actual: 0,
    })?;

    let neighbors = index.search(&query_vector, top_k)?;
    debug!(top_k, hits = neighbors.len(), "Index search complete");

    let results: Vec<(Neighbor, &T)> = neighbors
        .into_iter()
        .filter_map(|n| match chunks.get(n.position) {
            Some(chunk) => Some((n, chunk)),
            None => {
                warn!(position = n.position, chunks = chunks.len(), "Index position outside chunk sequence");
                None
            }
        })
        .collect();

    Ok(results)
}

/// Return the text of the `top_k` chunks most similar to `query`, best first.
///
/// `top_k == 0` yields an empty result; fewer chunks than `top_k` yields all
/// of them.
pub fn retrieve<T, I, E>(
    query: &str,
    index: &I,
    chunks: &[T],
    embedder: &E,
    top_k: usize,
) -> Result<Vec<String>, RetrieverError>
where
    T: AsRef<str>,
    I: VectorIndex + ?Sized,
    E: Embedder + ?Sized,
{
    Ok(search_chunks(query, index, chunks, embedder, top_k)?
        .into_iter()
        .map(|(_, chunk)| chunk.as_ref().to_string())
        .collect())
}
