//! Flat nearest-neighbour index over record embeddings.
//!
//! Vectors are added once at construction and searched by linear scan. Row
//! `i` of the index is row `i` of the corpus it was built from.

use crate::config::DistanceMetric;
use crate::error::{AdvisorError, Result};
use serde::Serialize;

/// A search hit: corpus row and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f32,
}

/// Exhaustive-search index.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    metric: DistanceMetric,
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Build an index from vectors that all share one dimension.
    pub fn build(vectors: Vec<Vec<f32>>, metric: DistanceMetric) -> Result<Self> {
        let dimensions = match vectors.first() {
            Some(first) if !first.is_empty() => first.len(),
            Some(_) => {
                return Err(AdvisorError::EmbeddingBackend(
                    "Embedding vectors must not be empty".to_string(),
                ))
            }
            None => return Err(AdvisorError::EmptyCorpus),
        };

        if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
            return Err(AdvisorError::DimensionMismatch {
                expected: dimensions,
                actual: bad.len(),
            });
        }

        Ok(Self {
            metric,
            dimensions,
            vectors,
        })
    }

    /// Return up to `k` nearest rows, closest first.
    ///
    /// Ties keep row order. `k` larger than the index returns every row.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimensions {
            return Err(AdvisorError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(row, vector)| Neighbor {
                row,
                distance: self.distance(query, vector),
            })
            .collect();

        // sort_by is stable, so equal distances stay in row order.
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k.min(self.vectors.len()));

        Ok(neighbors)
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            DistanceMetric::L2 => l2_distance(a, b),
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Dimension shared by all vectors.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Distance metric used for search.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

/// Euclidean distance between two vectors of equal length.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index(metric: DistanceMetric) -> FlatIndex {
        FlatIndex::build(
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.9, 0.1, 0.0],
                vec![0.0, 0.0, 1.0],
            ],
            metric,
        )
        .unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_l2_distance() {
        assert!((l2_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-6);
        assert_eq!(l2_distance(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_search_orders_by_distance() {
        for metric in [DistanceMetric::L2, DistanceMetric::Cosine] {
            let index = sample_index(metric);
            let results = index.search(&[1.0, 0.0, 0.0], 3).unwrap();

            assert_eq!(results.len(), 3);
            assert_eq!(results[0].row, 0);
            assert_eq!(results[1].row, 2);
            assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
            assert!(results.iter().all(|n| n.row < index.len()));
        }
    }

    #[test]
    fn test_k_larger_than_index_returns_everything() {
        let index = sample_index(DistanceMetric::L2);
        let results = index.search(&[0.0, 0.0, 1.0], 50).unwrap();

        let mut rows: Vec<usize> = results.iter().map(|n| n.row).collect();
        rows.sort_unstable();
        assert_eq!(rows, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_k_zero_returns_nothing() {
        let index = sample_index(DistanceMetric::L2);
        assert!(index.search(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_ties_keep_row_order() {
        let index = FlatIndex::build(
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 1.0]],
            DistanceMetric::L2,
        )
        .unwrap();

        let rows: Vec<usize> = index
            .search(&[0.0, 1.0], 4)
            .unwrap()
            .iter()
            .map(|n| n.row)
            .collect();
        assert_eq!(rows, vec![0, 2, 3, 1]);
    }

    #[test]
    fn test_build_rejects_empty_and_ragged_input() {
        assert!(matches!(
            FlatIndex::build(Vec::new(), DistanceMetric::L2),
            Err(AdvisorError::EmptyCorpus)
        ));
        assert!(matches!(
            FlatIndex::build(vec![vec![1.0, 0.0], vec![1.0]], DistanceMetric::L2),
            Err(AdvisorError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = sample_index(DistanceMetric::Cosine);
        assert_eq!(index.dimensions(), 3);
        assert!(matches!(
            index.search(&[1.0, 0.0], 1),
            Err(AdvisorError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }
}
