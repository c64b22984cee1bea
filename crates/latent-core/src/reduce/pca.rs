//! Principal component analysis by power iteration.
//!
//! Components are extracted one at a time from the covariance matrix, each
//! orthogonalized against the ones before it. The starting vector comes from
//! a seeded RNG and every component's sign is fixed so its largest-magnitude
//! loading is positive, which makes the projection repeatable.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ReductionConfig;
use crate::error::PipelineError;

use super::DimensionalityReducer;

const MAX_ITERATIONS: usize = 1000;
const TOLERANCE: f64 = 1e-10;

/// Linear projection onto the top principal components.
#[derive(Debug, Clone)]
pub struct Pca {
    components: usize,
    seed: u64,
}

impl Pca {
    /// Create a PCA reducer with `components` output dimensions.
    pub fn new(components: usize, seed: u64) -> Self {
        Self { components, seed }
    }

    /// The 3D reducer configured for a run.
    pub fn from_config(config: &ReductionConfig) -> Self {
        Self::new(3, config.seed)
    }

    /// Top principal axes as columns of a `dim × components` matrix.
    ///
    /// Axes beyond the rank of the data are left as zero columns.
    fn principal_axes(&self, covariance: &Array2<f64>) -> Array2<f64> {
        let dim = covariance.nrows();
        let mut axes = Array2::<f64>::zeros((dim, self.components));
        let scale = covariance.diag().sum().max(f64::MIN_POSITIVE);
        let mut rng = StdRng::seed_from_u64(self.seed);

        for k in 0..self.components.min(dim) {
            let mut v: Array1<f64> = (0..dim).map(|_| rng.gen::<f64>() - 0.5).collect();
            if !orthonormalize(&mut v, &axes, k) {
                continue;
            }

            let mut converged = false;
            for _ in 0..MAX_ITERATIONS {
                let mut w = covariance.dot(&v);
                // Rank exhausted: nothing left in the orthogonal complement
                if w.dot(&w).sqrt() <= scale * 1e-12 || !orthonormalize(&mut w, &axes, k) {
                    break;
                }
                let delta = 1.0 - w.dot(&v).abs();
                v = w;
                if delta < TOLERANCE {
                    converged = true;
                    break;
                }
            }

            if !converged && covariance.dot(&v).dot(&v) <= scale * 1e-12 {
                continue;
            }

            // Deterministic sign: largest-magnitude loading is positive
            let pivot = v
                .iter()
                .copied()
                .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
            if pivot < 0.0 {
                v.mapv_inplace(|x| -x);
            }

            axes.column_mut(k).assign(&v);
        }

        axes
    }
}

/// Remove the first `k` columns of `axes` from `v` and normalize it.
///
/// Returns `false` when nothing is left.
fn orthonormalize(v: &mut Array1<f64>, axes: &Array2<f64>, k: usize) -> bool {
    for j in 0..k {
        let axis = axes.column(j);
        let projection = axis.dot(&*v);
        v.scaled_add(-projection, &axis);
    }
    let norm = v.dot(&*v).sqrt();
    if !norm.is_finite() || norm < 1e-300 {
        return false;
    }
    v.mapv_inplace(|x| x / norm);
    true
}

impl DimensionalityReducer for Pca {
    fn components(&self) -> usize {
        self.components
    }

    fn reduce(&self, data: ArrayView2<'_, f32>) -> Result<Array2<f32>, PipelineError> {
        let (n, dim) = data.dim();
        if n == 0 {
            return Ok(Array2::zeros((0, self.components)));
        }

        let x = data.mapv(f64::from);
        let mean = x.mean_axis(Axis(0)).ok_or_else(|| PipelineError::Reduction {
            message: "Cannot compute mean of an empty batch".to_string(),
        })?;
        let centered = &x - &mean;

        let denom = (n.saturating_sub(1)).max(1) as f64;
        let covariance = centered.t().dot(&centered) / denom;
        debug_assert_eq!(covariance.dim(), (dim, dim));

        let axes = self.principal_axes(&covariance);
        let projected = centered.dot(&axes);

        tracing::debug!("PCA projected {} x {} onto {} components", n, dim, self.components);
        Ok(projected.mapv(|v| v as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_empty_batch() {
        let data = Array2::<f32>::zeros((0, 8));
        let out = Pca::new(3, 42).reduce(data.view()).unwrap();
        assert_eq!(out.dim(), (0, 3));
    }

    #[test]
    fn test_single_point_maps_to_origin() {
        let data = array![[0.6_f32, 0.8, 0.0]];
        let out = Pca::new(3, 42).reduce(data.view()).unwrap();
        assert_eq!(out.dim(), (1, 3));
        assert!(out.iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_recovers_dominant_axis() {
        // Points spread along x, tiny spread along y
        let data = array![
            [-2.0_f32, 0.1, 0.0],
            [-1.0, -0.1, 0.0],
            [0.0, 0.05, 0.0],
            [1.0, -0.05, 0.0],
            [2.0, 0.0, 0.0],
        ];
        let out = Pca::new(3, 7).reduce(data.view()).unwrap();

        // First component carries the x spread, in input order
        let first: Vec<f32> = out.column(0).to_vec();
        assert!(first.windows(2).all(|w| w[1] > w[0]));
        assert!((first[4] - 2.0).abs() < 1e-3);

        // Third component is beyond the data rank
        assert!(out.column(2).iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_same_seed_same_output() {
        let data = array![
            [0.1_f32, 0.9, 0.3, 0.2],
            [0.8, 0.1, 0.5, 0.0],
            [0.4, 0.4, 0.4, 0.7],
            [0.9, 0.2, 0.1, 0.3],
            [0.2, 0.3, 0.9, 0.6],
        ];
        let a = Pca::new(3, 42).reduce(data.view()).unwrap();
        let b = Pca::new(3, 42).reduce(data.view()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_components_are_uncorrelated() {
        let data = array![
            [0.1_f32, 0.9, 0.3, 0.2],
            [0.8, 0.1, 0.5, 0.0],
            [0.4, 0.4, 0.4, 0.7],
            [0.9, 0.2, 0.1, 0.3],
            [0.2, 0.3, 0.9, 0.6],
            [0.5, 0.5, 0.0, 0.1],
        ];
        let out = Pca::new(2, 1).reduce(data.view()).unwrap();
        let c0 = out.column(0);
        let c1 = out.column(1);
        assert!(c0.dot(&c1).abs() < 1e-3);
    }
}
