use async_trait::async_trait;
use seahash::hash;
use crate::embedding::EmbeddingProvider;
use crate::error::EmbedError;
use crate::model::Embedding;
use crate::vector::normalize_l2;

pub const HASHING_MODEL: &str = "coursedex-hashing-v1";

/// Local bag-of-words embedder using signed feature hashing.
///
/// Needs no network and no weights. Texts that share vocabulary land closer
/// together, which is all a small catalog demo needs.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self, EmbedError> {
        if dimension == 0 {
            return Err(EmbedError::InvalidInput("dimension must be positive".into()));
        }
        Ok(Self { dimension })
    }

    /// Synchronous core of [`EmbeddingProvider::embed`].
    pub fn embed_text(&self, text: &str) -> Embedding {
        let mut v = vec![0.0f32; self.dimension];
        for token in tokens(text) {
            let h = hash(token.as_bytes());
            let bucket = (h % self.dimension as u64) as usize;
            // Top bit picks the sign so colliding tokens tend to cancel, not pile up
            let sign = if h >> 63 == 1 { -1.0 } else { 1.0 };
            v[bucket] += sign;
        }
        normalize_l2(&mut v);
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn model(&self) -> &str {
        HASHING_MODEL
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
        Ok(self.embed_text(text))
    }
}

/// Lowercased alphanumeric runs with a trailing plural `s` stripped.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| {
            let lower = t.to_lowercase();
            match lower.strip_suffix('s') {
                Some(stem) if stem.chars().count() >= 3 && !stem.ends_with('s') => stem.to_string(),
                _ => lower,
            }
        })
}
