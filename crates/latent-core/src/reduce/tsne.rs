//! Exact t-SNE into two dimensions.
//!
//! Pairwise affinities are computed in full (O(n²) per iteration), which is
//! fine for collections in the low thousands. Input affinities use a per-point
//! Gaussian bandwidth found by binary search to match the target perplexity;
//! the layout is optimized with early exaggeration, momentum and per-parameter
//! gains, and re-centered after every step.

use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ReductionConfig;
use crate::error::PipelineError;

use super::DimensionalityReducer;

const OUTPUT_DIMS: usize = 2;

/// Iterations run with early exaggeration and low momentum.
const EXAGGERATION_ITERATIONS: usize = 250;
const INITIAL_MOMENTUM: f64 = 0.5;
const FINAL_MOMENTUM: f64 = 0.8;
const MIN_GAIN: f64 = 0.01;

/// Binary search limits for the per-point bandwidth.
const PERPLEXITY_STEPS: usize = 50;
const PERPLEXITY_TOLERANCE: f64 = 1e-5;

/// Floor on joint probabilities.
const MIN_PROBABILITY: f64 = 1e-12;

/// Standard deviation of the random initial layout.
const INIT_STD: f64 = 1e-4;

/// t-SNE reducer producing 2D coordinates.
#[derive(Debug, Clone)]
pub struct Tsne {
    perplexity: f64,
    iterations: usize,
    learning_rate: f64,
    early_exaggeration: f64,
    seed: u64,
}

impl Tsne {
    /// Create a reducer with explicit optimization parameters.
    pub fn new(
        perplexity: f64,
        iterations: usize,
        learning_rate: f64,
        early_exaggeration: f64,
        seed: u64,
    ) -> Self {
        Self {
            perplexity,
            iterations,
            learning_rate,
            early_exaggeration,
            seed,
        }
    }

    pub fn from_config(config: &ReductionConfig) -> Self {
        Self::new(
            config.perplexity,
            config.iterations,
            config.learning_rate,
            config.early_exaggeration,
            config.seed,
        )
    }

    /// Perplexity actually used for `n` points.
    ///
    /// Small batches cannot support a large neighborhood, so the target is
    /// capped at `(n - 1) / 3` and never goes below 1.
    fn effective_perplexity(&self, n: usize) -> f64 {
        let cap = (n.saturating_sub(1)) as f64 / 3.0;
        self.perplexity.min(cap).max(1.0)
    }

    /// Symmetric joint probabilities `P` for the input points.
    fn joint_probabilities(&self, distances: &Array2<f64>) -> Array2<f64> {
        let n = distances.nrows();
        let target_entropy = self.effective_perplexity(n).ln();
        let mut conditional = Array2::<f64>::zeros((n, n));

        for i in 0..n {
            let row = conditional_row(distances, i, target_entropy);
            for (j, p) in row.into_iter().enumerate() {
                conditional[[i, j]] = p;
            }
        }

        let denom = 2.0 * n as f64;
        let mut joint = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let p = (conditional[[i, j]] + conditional[[j, i]]) / denom;
                    joint[[i, j]] = p.max(MIN_PROBABILITY);
                }
            }
        }
        joint
    }

    /// Small random layout drawn from N(0, INIT_STD²).
    fn initial_layout(&self, n: usize) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut layout = Array2::<f64>::zeros((n, OUTPUT_DIMS));
        for value in layout.iter_mut() {
            *value = gaussian(&mut rng) * INIT_STD;
        }
        layout
    }

    fn optimize(&self, p: &Array2<f64>, mut y: Array2<f64>) -> Array2<f64> {
        let n = y.nrows();
        let mut update = Array2::<f64>::zeros((n, OUTPUT_DIMS));
        let mut gains = Array2::<f64>::ones((n, OUTPUT_DIMS));
        let mut kernel = Array2::<f64>::zeros((n, n));

        for iteration in 0..self.iterations {
            let (exaggeration, momentum) = if iteration < EXAGGERATION_ITERATIONS {
                (self.early_exaggeration, INITIAL_MOMENTUM)
            } else {
                (1.0, FINAL_MOMENTUM)
            };

            // Student-t kernel in the embedding space
            let mut kernel_sum = 0.0;
            for i in 0..n {
                for j in (i + 1)..n {
                    let dx = y[[i, 0]] - y[[j, 0]];
                    let dy = y[[i, 1]] - y[[j, 1]];
                    let q = 1.0 / (1.0 + dx * dx + dy * dy);
                    kernel[[i, j]] = q;
                    kernel[[j, i]] = q;
                    kernel_sum += 2.0 * q;
                }
            }
            let kernel_sum = kernel_sum.max(f64::MIN_POSITIVE);

            for i in 0..n {
                let mut grad = [0.0_f64; OUTPUT_DIMS];
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let q = kernel[[i, j]];
                    let strength = (exaggeration * p[[i, j]] - q / kernel_sum) * q;
                    for (d, g) in grad.iter_mut().enumerate() {
                        *g += 4.0 * strength * (y[[i, d]] - y[[j, d]]);
                    }
                }

                for (d, g) in grad.into_iter().enumerate() {
                    let gain = &mut gains[[i, d]];
                    *gain = if (g > 0.0) != (update[[i, d]] > 0.0) {
                        *gain + 0.2
                    } else {
                        *gain * 0.8
                    };
                    *gain = gain.max(MIN_GAIN);
                    update[[i, d]] = momentum * update[[i, d]] - self.learning_rate * *gain * g;
                }
            }

            y += &update;
            recenter(&mut y);
        }

        y
    }
}

impl DimensionalityReducer for Tsne {
    fn components(&self) -> usize {
        OUTPUT_DIMS
    }

    fn reduce(&self, data: ArrayView2<'_, f32>) -> Result<Array2<f32>, PipelineError> {
        let n = data.nrows();
        if n == 0 {
            return Ok(Array2::zeros((0, OUTPUT_DIMS)));
        }
        if n == 1 {
            return Ok(Array2::zeros((1, OUTPUT_DIMS)));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::Reduction {
                message: "Input contains non-finite values".to_string(),
            });
        }

        let distances = squared_distances(data);
        let p = self.joint_probabilities(&distances);
        let y = self.optimize(&p, self.initial_layout(n));

        if y.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::Reduction {
                message: "t-SNE diverged; try a lower learning rate".to_string(),
            });
        }

        tracing::debug!(
            "t-SNE laid out {} points (perplexity {:.1}, {} iterations)",
            n,
            self.effective_perplexity(n),
            self.iterations
        );
        Ok(y.mapv(|v| v as f32))
    }
}

/// Pairwise squared Euclidean distances.
fn squared_distances(data: ArrayView2<'_, f32>) -> Array2<f64> {
    let x = data.mapv(f64::from);
    let n = x.nrows();
    let mut distances = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let diff = &x.row(i) - &x.row(j);
            let d = diff.dot(&diff);
            distances[[i, j]] = d;
            distances[[j, i]] = d;
        }
    }
    distances
}

/// Conditional probabilities `p(j | i)` whose entropy matches `target_entropy`.
fn conditional_row(distances: &Array2<f64>, i: usize, target_entropy: f64) -> Vec<f64> {
    let n = distances.nrows();

    // Shift by the nearest distance so the closest neighbor has weight 1
    let nearest = (0..n)
        .filter(|&j| j != i)
        .map(|j| distances[[i, j]])
        .fold(f64::INFINITY, f64::min);

    let mut beta = 1.0_f64;
    let mut beta_min: Option<f64> = None;
    let mut beta_max: Option<f64> = None;
    let mut row = vec![0.0; n];

    for _ in 0..PERPLEXITY_STEPS {
        let mut sum = 0.0;
        let mut weighted = 0.0;
        for j in 0..n {
            if j == i {
                row[j] = 0.0;
                continue;
            }
            let d = distances[[i, j]] - nearest;
            let w = (-d * beta).exp();
            row[j] = w;
            sum += w;
            weighted += d * w;
        }

        let entropy = sum.ln() + beta * weighted / sum;
        for p in row.iter_mut() {
            *p /= sum;
        }

        let diff = entropy - target_entropy;
        if diff.abs() < PERPLEXITY_TOLERANCE {
            break;
        }

        if diff > 0.0 {
            // Too flat: sharpen
            beta_min = Some(beta);
            beta = match beta_max {
                Some(max) => (beta + max) / 2.0,
                None => beta * 2.0,
            };
        } else {
            beta_max = Some(beta);
            beta = match beta_min {
                Some(min) => (beta + min) / 2.0,
                None => beta / 2.0,
            };
        }
    }

    row
}

fn recenter(y: &mut Array2<f64>) {
    let n = y.nrows() as f64;
    for d in 0..OUTPUT_DIMS {
        let mut column = y.column_mut(d);
        let mean = column.sum() / n;
        column.mapv_inplace(|v| v - mean);
    }
}

/// Standard normal sample via Box-Muller.
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tsne(iterations: usize, seed: u64) -> Tsne {
        Tsne::new(30.0, iterations, 200.0, 12.0, seed)
    }

    /// Two tight clusters of unit-ish vectors in 4D.
    fn two_clusters() -> Array2<f32> {
        let mut rows = Vec::new();
        for i in 0..6 {
            let eps = i as f32 * 0.01;
            rows.extend_from_slice(&[1.0, eps, 0.0, 0.0]);
        }
        for i in 0..6 {
            let eps = i as f32 * 0.01;
            rows.extend_from_slice(&[0.0, 0.0, 1.0, eps]);
        }
        Array2::from_shape_vec((12, 4), rows).unwrap()
    }

    #[test]
    fn test_empty_batch() {
        let data = Array2::<f32>::zeros((0, 512));
        let out = tsne(100, 42).reduce(data.view()).unwrap();
        assert_eq!(out.dim(), (0, 2));
    }

    #[test]
    fn test_single_point_at_origin() {
        let data = Array2::<f32>::from_elem((1, 4), 0.5);
        let out = tsne(100, 42).reduce(data.view()).unwrap();
        assert_eq!(out.dim(), (1, 2));
        assert_eq!(out[[0, 0]], 0.0);
        assert_eq!(out[[0, 1]], 0.0);
    }

    #[test]
    fn test_shape_and_finiteness() {
        let data = two_clusters();
        let out = tsne(300, 42).reduce(data.view()).unwrap();
        assert_eq!(out.dim(), (12, 2));
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_same_seed_same_layout() {
        let data = two_clusters();
        let a = tsne(300, 7).reduce(data.view()).unwrap();
        let b = tsne(300, 7).reduce(data.view()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seed_different_layout() {
        let data = two_clusters();
        let a = tsne(50, 1).reduce(data.view()).unwrap();
        let b = tsne(50, 2).reduce(data.view()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_clusters_stay_apart() {
        let data = two_clusters();
        let out = tsne(500, 42).reduce(data.view()).unwrap();

        let centroid = |range: std::ops::Range<usize>| {
            let len = range.len() as f32;
            let (sx, sy) = range.fold((0.0, 0.0), |(sx, sy), i| {
                (sx + out[[i, 0]], sy + out[[i, 1]])
            });
            (sx / len, sy / len)
        };
        let spread = |range: std::ops::Range<usize>, c: (f32, f32)| {
            range
                .map(|i| ((out[[i, 0]] - c.0).powi(2) + (out[[i, 1]] - c.1).powi(2)).sqrt())
                .fold(0.0_f32, f32::max)
        };

        let a = centroid(0..6);
        let b = centroid(6..12);
        let between = ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt();
        assert!(between > spread(0..6, a));
        assert!(between > spread(6..12, b));
    }

    #[test]
    fn test_layout_is_centered() {
        let data = two_clusters();
        let out = tsne(100, 3).reduce(data.view()).unwrap();
        let mean_x: f32 = out.column(0).sum() / 12.0;
        let mean_y: f32 = out.column(1).sum() / 12.0;
        assert!(mean_x.abs() < 1e-3);
        assert!(mean_y.abs() < 1e-3);
    }

    #[test]
    fn test_effective_perplexity_small_batch() {
        let t = tsne(10, 0);
        assert_eq!(t.effective_perplexity(2), 1.0);
        assert!((t.effective_perplexity(10) - 3.0).abs() < 1e-12);
        assert_eq!(t.effective_perplexity(1000), 30.0);
    }

    #[test]
    fn test_conditional_row_sums_to_one() {
        let data = two_clusters();
        let distances = squared_distances(data.view());
        let row = conditional_row(&distances, 0, 3.0_f64.ln());
        let sum: f64 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(row[0], 0.0);
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let mut data = two_clusters();
        data[[3, 1]] = f32::NAN;
        let err = tsne(10, 0).reduce(data.view()).unwrap_err();
        assert!(matches!(err, PipelineError::Reduction { .. }));
    }
}
