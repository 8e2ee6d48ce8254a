use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// Exhaustive nearest-neighbour index over squared L2 distance.
///
/// Row `i` holds the vector of chunk `i`. Scores are distances, so lower
/// means closer; a search returns rows in ascending score order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The first vector fixes the dimension for the rest
    pub fn add(&mut self, vector: Vec<f32>) -> Result<usize> {
        if self.vectors.is_empty() && self.dimension == 0 {
            self.dimension = vector.len();
        }
        self.check_dimension(vector.len())?;
        self.vectors.push(vector);
        Ok(self.vectors.len() - 1)
    }

    /// Up to `k` `(row, distance)` pairs, closest first. Ties keep row order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimension(query.len())?;

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(row, vector)| (row, squared_l2(query, vector)))
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }

    /// Consistency check for an index read back from disk
    pub fn verify(&self) -> std::result::Result<(), String> {
        match self.vectors.iter().position(|v| v.len() != self.dimension) {
            Some(row) => Err(format!(
                "row {} has dimension {}, expected {}",
                row,
                self.vectors[row].len(),
                self.dimension
            )),
            None => Ok(()),
        }
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(vectors: Vec<Vec<f32>>) -> FlatIndex {
        let mut index = FlatIndex::new();
        for v in vectors {
            index.add(v).unwrap();
        }
        index
    }

    #[test]
    fn test_search_returns_ascending_distances() {
        let index = index_of(vec![
            vec![0.0, 1.0, 0.0], // far
            vec![1.0, 0.0, 0.0], // identical
            vec![0.5, 0.5, 0.0], // between
        ]);

        let results = index.search(&[1.0, 0.0, 0.0], 3).unwrap();

        assert_eq!(results.iter().map(|r| r.0).collect::<Vec<_>>(), vec![1, 2, 0]);
        assert_eq!(results[0].1, 0.0);
        assert!(results.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn test_search_respects_k() {
        let index = index_of((0..10).map(|i| vec![i as f32, 0.0]).collect());

        let results = index.search(&[0.0, 0.0], 4).unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].0, 0);

        let all = index.search(&[0.0, 0.0], 100).unwrap();
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = index_of(vec![vec![1.0], vec![-1.0], vec![1.0]]);
        let results = index.search(&[0.0], 3).unwrap();
        assert_eq!(results.iter().map(|r| r.0).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_index() {
        let index = FlatIndex::new();
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 2.0], 4).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = index_of(vec![vec![1.0, 0.0]]);

        let err = index.add(vec![1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { expected: 2, actual: 3 }));

        let err = index.search(&[1.0], 1).unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_verify_detects_ragged_rows() {
        let index: FlatIndex =
            serde_json::from_str(r#"{"dimension":2,"vectors":[[1.0,0.0],[1.0]]}"#).unwrap();
        assert!(index.verify().is_err());
        assert!(index_of(vec![vec![1.0, 0.0]]).verify().is_ok());
    }
}
