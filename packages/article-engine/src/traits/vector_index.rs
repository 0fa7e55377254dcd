//! Vector index gateway for keyword uniqueness checks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A nearest-neighbor match from the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMatch {
    /// Stored vector id (slugified keyword)
    pub id: String,

    /// Similarity score (cosine, higher is closer)
    pub score: f32,
}

/// Gateway to the semantic keyword index.
#[async_trait]
pub trait VectorIndexGateway: Send + Sync {
    /// Query the nearest neighbors of a vector.
    async fn query_nearest(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>>;

    /// Insert or replace a vector under the given id.
    async fn upsert(&self, id: &str, vector: &[f32]) -> Result<()>;
}

/// Truncate an embedding to the index dimensionality and L2-normalize it.
///
/// Returns None for a zero vector (nothing meaningful to index).
pub fn normalize_for_index(embedding: &[f32], dim: usize) -> Option<Vec<f32>> {
    let truncated = &embedding[..embedding.len().min(dim)];
    let norm: f32 = truncated.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || truncated.is_empty() {
        return None;
    }
    Some(truncated.iter().map(|x| x / norm).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_truncates_and_scales() {
        let embedding = vec![3.0, 4.0, 100.0];
        let normalized = normalize_for_index(&embedding, 2).unwrap();
        assert_eq!(normalized.len(), 2);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);

        let unit_norm: f32 = normalized.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((unit_norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_shorter_than_dim() {
        let embedding = vec![1.0, 1.0];
        let normalized = normalize_for_index(&embedding, 8).unwrap();
        assert_eq!(normalized.len(), 2);
    }

    #[test]
    fn test_normalize_zero_vector() {
        assert!(normalize_for_index(&[0.0, 0.0], 2).is_none());
        assert!(normalize_for_index(&[], 2).is_none());
    }
}
