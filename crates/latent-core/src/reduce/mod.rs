//! Dimensionality reduction for spatial layouts.
//!
//! Both reducers take the whole batch at once, return one row per input row
//! in the same order, and are fully determined by their input and seed:
//!
//! - [`Tsne`]: exact t-SNE into 2D, preserves local neighborhoods
//! - [`Pca`]: principal components into 3D, a linear variance-maximizing view

pub mod pca;
pub mod tsne;

pub use pca::Pca;
pub use tsne::Tsne;

use ndarray::{Array2, ArrayView2};

use crate::error::PipelineError;

/// Contract for dimensionality reduction backends.
pub trait DimensionalityReducer: Send + Sync {
    /// Number of output dimensions.
    fn components(&self) -> usize;

    /// Project `data` (one vector per row) to `components()` columns.
    ///
    /// An empty batch yields an empty `0 × components()` array.
    fn reduce(&self, data: ArrayView2<'_, f32>) -> Result<Array2<f32>, PipelineError>;
}

/// Stack equal-length vectors into a row matrix.
pub fn stack_rows<V: AsRef<[f32]>>(vectors: &[V]) -> Result<Array2<f32>, PipelineError> {
    let dim = vectors.first().map(|v| v.as_ref().len()).unwrap_or(0);
    let mut flat = Vec::with_capacity(vectors.len() * dim);

    for (i, v) in vectors.iter().enumerate() {
        let v = v.as_ref();
        if v.len() != dim {
            return Err(PipelineError::Reduction {
                message: format!("Vector {} has {} dims, expected {}", i, v.len(), dim),
            });
        }
        flat.extend_from_slice(v);
    }

    Array2::from_shape_vec((vectors.len(), dim), flat).map_err(|e| PipelineError::Reduction {
        message: format!("Failed to stack vectors: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_rows_shape() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let m = stack_rows(&rows).unwrap();
        assert_eq!(m.dim(), (3, 2));
        assert_eq!(m[[2, 1]], 6.0);
    }

    #[test]
    fn test_stack_rows_ragged() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        let err = stack_rows(&rows).unwrap_err();
        assert!(matches!(err, PipelineError::Reduction { .. }));
    }

    #[test]
    fn test_stack_rows_empty() {
        let rows: Vec<Vec<f32>> = vec![];
        assert_eq!(stack_rows(&rows).unwrap().dim(), (0, 0));
    }
}
