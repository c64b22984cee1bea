//! Shared vector math.
//!
//! Zero-norm policy: a vector whose Euclidean norm is exactly zero (or that
//! holds a non-finite component) cannot be put on the unit sphere, so
//! normalization rejects it with `None` instead of dividing. Callers decide
//! what a rejection means for them. Norms are accumulated in `f64`, so tiny
//! and very large finite vectors still normalize.

/// Euclidean norm of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    norm_f64(v) as f32
}

fn norm_f64(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// L2-normalize a vector in place so its magnitude is 1.
///
/// Returns `false` and leaves the vector untouched when its norm is zero or
/// not finite.
pub fn l2_normalize_in_place(v: &mut [f32]) -> bool {
    let norm = norm_f64(v);
    if !norm.is_finite() || norm == 0.0 {
        return false;
    }
    for x in v.iter_mut() {
        *x = (f64::from(*x) / norm) as f32;
    }
    true
}

/// L2-normalize a slice, returning a new unit-length vector.
///
/// Returns `None` for a degenerate (zero or non-finite norm) input.
pub fn l2_normalize(v: &[f32]) -> Option<Vec<f32>> {
    let mut result = v.to_vec();
    l2_normalize_in_place(&mut result).then_some(result)
}

/// Dot product of two equal-length vectors.
///
/// For unit vectors this is their cosine similarity.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
