//! Embedding providers: text in, fixed-length vector out.

mod hashing;
mod openai;

pub use hashing::{HashingEmbedder, HASHING_MODEL};
pub use openai::OpenAiEmbedder;

use async_trait::async_trait;
use crate::error::EmbedError;
use crate::model::Embedding;

/// Maps text to a vector of exactly [`dimension`](Self::dimension) floats.
///
/// Implementations hold no mutable state across calls, so one instance can
/// serve many concurrent queries behind an `Arc`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier recorded alongside any index built with this provider.
    fn model(&self) -> &str;

    fn dimension(&self) -> usize;

    /// Embed one string. The empty string is valid input.
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError>;

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbedError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

pub(crate) fn check_dimension(expected: usize, embedding: &[f32]) -> Result<(), EmbedError> {
    if embedding.len() != expected {
        return Err(EmbedError::DimensionMismatch { expected, actual: embedding.len() });
    }
    Ok(())
}
