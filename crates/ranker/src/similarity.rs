//! Vector similarity and weighted scoring
//!
//! Pure functions over feature vectors; nothing here calls out.

use tracing::warn;

/// Score given to a candidate whose score could not be computed
pub const MIN_SCORE: f64 = -1.0;

/// Cosine similarity in `[-1, 1]`
///
/// Zero-norm, empty or dimension-mismatched inputs give `0.0`. Non-finite
/// components propagate as NaN so the caller can substitute [`MIN_SCORE`].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Weighted mean similarity of every candidate against the references
///
/// `weights` pairs with `references` and should sum to 1. Non-finite
/// results are replaced by [`MIN_SCORE`].
pub fn score_candidates(
    candidates: &[Vec<f32>],
    references: &[Vec<f32>],
    weights: &[f64],
) -> Vec<f64> {
    debug_assert_eq!(references.len(), weights.len());

    candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            let score: f64 = references
                .iter()
                .zip(weights)
                .map(|(reference, w)| w * cosine_similarity(candidate, reference))
                .sum();

            if score.is_finite() {
                score.clamp(-1.0, 1.0)
            } else {
                warn!(candidate = i, "Non-finite relevance score, using sentinel");
                MIN_SCORE
            }
        })
        .collect()
}
