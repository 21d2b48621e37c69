//! Embedding providers.
//!
//! The search core only needs "text in, vector out". Two implementations ship
//! with the crate: [`OllamaProvider`](super::ollama::OllamaProvider) for a
//! local model server, and [`HtpProvider`], a deterministic training-free
//! projection that works offline.
//!
//! HTP follows "Harmonic Token Projection: A Vocabulary-Free, Training-Free,
//! Deterministic, and Reversible Embedding Methodology"
//! (https://arxiv.org/html/2511.20665).

use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use crate::core::note::Embedding;

/// Errors reported by an embedding backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("embedding backend unreachable: {0}")]
    Unreachable(String),

    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),

    #[error("embedding backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode embedding response: {0}")]
    Decode(String),

    #[error("embedding backend returned an empty vector")]
    EmptyEmbedding,
}

impl ProviderError {
    /// The backend itself is down, so further calls in this search would fail the same way.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout(_))
    }
}

/// Maps text to a fixed-length vector. Must be deterministic for a given model.
pub trait EmbeddingProvider: Send + Sync {
    /// Identifies the model; embeddings are only comparable within one id.
    fn model_id(&self) -> &str;

    fn embed(&self, text: &str) -> Result<Embedding, ProviderError>;
}

impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for Box<P> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        (**self).embed(text)
    }
}

impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<P> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        (**self).embed(text)
    }
}

/// Embedding dimension (2 * number of coprime moduli)
pub const HTP_DIM: usize = 384;

const NUM_MODULI: usize = HTP_DIM / 2;

/// Longest token prefix (in code points) folded into the token integer
const MAX_TOKEN_LENGTH: usize = 64;

/// First NUM_MODULI primes, pairwise coprime by construction
static COPRIME_MODULI: &[u64] = &[
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71,
    73, 79, 83, 89, 97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151,
    157, 163, 167, 173, 179, 181, 191, 193, 197, 199, 211, 223, 227, 229, 233,
    239, 241, 251, 257, 263, 269, 271, 277, 281, 283, 293, 307, 311, 313, 317,
    331, 337, 347, 349, 353, 359, 367, 373, 379, 383, 389, 397, 401, 409, 419,
    421, 431, 433, 439, 443, 449, 457, 461, 463, 467, 479, 487, 491, 499, 503,
    509, 521, 523, 541, 547, 557, 563, 569, 571, 577, 587, 593, 599, 601, 607,
    613, 617, 619, 631, 641, 643, 647, 653, 659, 661, 673, 677, 683, 691, 701,
    709, 719, 727, 733, 739, 743, 751, 757, 761, 769, 773, 787, 797, 809, 811,
    821, 823, 827, 829, 839, 853, 857, 859, 863, 877, 881, 883, 887, 907, 911,
    919, 929, 937, 941, 947, 953, 967, 971, 977, 983, 991, 997, 1009, 1013,
    1019, 1021, 1031, 1033, 1039, 1049, 1051, 1061, 1063, 1069, 1087, 1091,
    1093, 1097, 1103, 1109, 1117, 1123, 1129, 1151, 1153, 1163, 1171, 1181,
];

/// Offline Harmonic Token Projection provider.
pub struct HtpProvider {
    moduli: Vec<u64>,
    model_id: String,
}

impl HtpProvider {
    pub fn new() -> Self {
        Self {
            moduli: COPRIME_MODULI[..NUM_MODULI].to_vec(),
            model_id: format!("htp-{}", HTP_DIM),
        }
    }

    /// Mean of the token projections, L2-normalized.
    ///
    /// Text without any token has no direction, so it yields
    /// [`ProviderError::EmptyEmbedding`] rather than a zero vector.
    fn project(&self, text: &str) -> Result<Embedding, ProviderError> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Err(ProviderError::EmptyEmbedding);
        }

        let mut pooled = vec![0.0f64; HTP_DIM];
        for token in &tokens {
            for (slot, val) in pooled.iter_mut().zip(self.project_token(token)) {
                *slot += val;
            }
        }
        let count = tokens.len() as f64;
        pooled.iter_mut().for_each(|v| *v /= count);

        let norm = pooled.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm == 0.0 {
            return Err(ProviderError::EmptyEmbedding);
        }
        Ok(pooled.iter().map(|x| (x / norm) as f32).collect())
    }

    /// Each modulus m contributes the point (sin, cos) of 2π(N mod m)/m.
    fn project_token(&self, token: &str) -> impl Iterator<Item = f64> + '_ {
        let n = token_to_integer(token);
        self.moduli.iter().flat_map(move |&m| {
            let theta = 2.0 * PI * ((n % m) as f64) / (m as f64);
            [theta.sin(), theta.cos()]
        })
    }
}

impl Default for HtpProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingProvider for HtpProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        self.project(text)
    }
}

/// N = Σ u_j * 2^16^(L-j), wrapping on overflow
fn token_to_integer(token: &str) -> u64 {
    token
        .chars()
        .take(MAX_TOKEN_LENGTH)
        .fold(0u64, |n, c| n.wrapping_mul(65536).wrapping_add(c as u64))
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::similarity::cosine_similarity;

    #[test]
    fn test_htp_deterministic() {
        let a = HtpProvider::new();
        let b = HtpProvider::new();

        let text = "discuss the quarterly roadmap";
        assert_eq!(a.embed(text).unwrap(), b.embed(text).unwrap());
        assert_eq!(a.embed(text).unwrap().len(), HTP_DIM);
    }

    #[test]
    fn test_htp_normalized() {
        let provider = HtpProvider::new();
        let emb = provider.embed("buy milk and eggs").unwrap();
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_htp_shared_tokens_score_higher() {
        let provider = HtpProvider::new();
        let query = provider.embed("roadmap planning").unwrap();
        let related = provider.embed("roadmap review and planning").unwrap();
        let unrelated = provider.embed("banana bread recipe").unwrap();

        let near = cosine_similarity(&query, &related).unwrap();
        let far = cosine_similarity(&query, &unrelated).unwrap();
        assert!(near > far, "near={} far={}", near, far);
    }

    #[test]
    fn test_htp_case_insensitive() {
        let provider = HtpProvider::new();
        assert_eq!(provider.embed("Roadmap").unwrap(), provider.embed("roadmap").unwrap());
    }

    #[test]
    fn test_htp_empty_text() {
        let provider = HtpProvider::new();
        assert!(matches!(provider.embed(""), Err(ProviderError::EmptyEmbedding)));
        assert!(matches!(provider.embed(" ... "), Err(ProviderError::EmptyEmbedding)));
    }

    #[test]
    fn test_unavailable_classification() {
        assert!(ProviderError::Timeout(Duration::from_secs(1)).is_unavailable());
        assert!(ProviderError::Unreachable("refused".into()).is_unavailable());
        assert!(!ProviderError::EmptyEmbedding.is_unavailable());
        assert!(!ProviderError::Status { status: 500, body: String::new() }.is_unavailable());
    }

    #[test]
    fn test_boxed_provider_delegates() {
        let boxed: Box<dyn EmbeddingProvider> = Box::new(HtpProvider::new());
        assert_eq!(boxed.model_id(), "htp-384");
        assert!(boxed.embed("hello").is_ok());
    }
}
