//! Vector similarity and the display strength derived from it.

/// Why a pair of embeddings cannot be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MalformedEmbedding {
    #[error("embedding is empty")]
    Empty,

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("embedding has zero norm")]
    ZeroNorm,

    #[error("embedding contains non-finite values")]
    NonFinite,
}

/// Cosine similarity between two equal-length vectors.
///
/// Returns an error instead of NaN for empty, mismatched, zero-norm or
/// non-finite input, so callers can drop the pair before it reaches a sort.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, MalformedEmbedding> {
    if a.is_empty() || b.is_empty() {
        return Err(MalformedEmbedding::Empty);
    }
    if a.len() != b.len() {
        return Err(MalformedEmbedding::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if !(dot.is_finite() && norm_a.is_finite() && norm_b.is_finite()) {
        return Err(MalformedEmbedding::NonFinite);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(MalformedEmbedding::ZeroNorm);
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    Ok(similarity.clamp(-1.0, 1.0) as f32)
}

/// Percent shown next to a semantic match: `round(clamp((s + 0.5) * 80, 0, 100))`.
pub fn match_strength(similarity: f32) -> u8 {
    let percent = ((similarity as f64 + 0.5) * 80.0).clamp(0.0, 100.0);
    percent.round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b).unwrap() - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).unwrap().abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d).unwrap() + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_self_similarity_is_one() {
        let a = vec![0.3, -1.7, 2.25, 0.01];
        assert!((cosine_similarity(&a, &a).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_symmetric() {
        let a = vec![0.2, 0.9, -0.4, 1.3];
        let b = vec![-0.6, 0.1, 0.8, 0.05];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_scale_invariant() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![10.0, 20.0, 30.0];
        assert!((cosine_similarity(&a, &b).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_malformed_inputs() {
        assert_eq!(cosine_similarity(&[], &[1.0]), Err(MalformedEmbedding::Empty));
        assert_eq!(
            cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]),
            Err(MalformedEmbedding::DimensionMismatch { expected: 2, got: 3 })
        );
        assert_eq!(
            cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]),
            Err(MalformedEmbedding::ZeroNorm)
        );
        assert_eq!(
            cosine_similarity(&[f32::NAN, 1.0], &[1.0, 0.0]),
            Err(MalformedEmbedding::NonFinite)
        );
    }

    #[test]
    fn test_match_strength() {
        assert_eq!(match_strength(0.55), 84);
        assert_eq!(match_strength(1.0), 100);
        assert_eq!(match_strength(-0.5), 0);
        assert_eq!(match_strength(-1.0), 0);
        assert_eq!(match_strength(0.0), 40);
        assert_eq!(match_strength(0.75), 100);
    }
}
