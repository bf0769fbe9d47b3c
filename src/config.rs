use std::sync::Arc;
use std::time::Duration;
use clap::{Args, ValueEnum};
use tracing_subscriber::EnvFilter;
use crate::embedding::{EmbeddingProvider, HashingEmbedder, OpenAiEmbedder};
use crate::error::{Error, Result};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OPENAI_DIMENSION: usize = 1536;
pub const DEFAULT_HASHING_DIMENSION: usize = 384;
pub const DEFAULT_LOG_FILTER: &str = "info,coursedex=info";

/// Log filter from `RUST_LOG` directives, or the default when unset or unparsable.
pub fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// Local feature-hashing model, no network
    Hashing,
    /// OpenAI-compatible embeddings endpoint
    Openai,
}

/// Embedding provider settings shared by both binaries.
///
/// Credentials come from the environment only.
#[derive(Args, Debug, Clone)]
pub struct EmbedderConfig {
    #[clap(long, value_enum, default_value = "hashing", env = "COURSEDEX_PROVIDER")]
    pub provider: ProviderKind,

    /// Model identifier (defaults per provider)
    #[clap(long, env = "COURSEDEX_MODEL")]
    pub model: Option<String>,

    /// Embedding dimension (defaults per provider)
    #[clap(long, env = "COURSEDEX_DIMENSION")]
    pub dimension: Option<usize>,

    #[clap(long, default_value = DEFAULT_API_BASE, env = "COURSEDEX_API_BASE")]
    pub api_base: String,

    #[clap(long, default_value = "30")]
    pub timeout_secs: u64,

    #[clap(long, default_value = "3")]
    pub max_retries: usize,

    #[clap(skip)]
    pub api_key: Option<String>,
}

impl EmbedderConfig {
    /// `COURSEDEX_API_KEY`, falling back to `OPENAI_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("COURSEDEX_API_KEY").ok())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn build_provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self.provider {
            ProviderKind::Hashing => {
                if let Some(model) = &self.model {
                    if model != crate::embedding::HASHING_MODEL {
                        return Err(Error::InvalidArgument(format!(
                            "hashing provider only serves '{}', not '{}'",
                            crate::embedding::HASHING_MODEL,
                            model
                        )));
                    }
                }
                let dimension = self.dimension.unwrap_or(DEFAULT_HASHING_DIMENSION);
                let embedder = HashingEmbedder::new(dimension).map_err(|e| Error::InvalidArgument(e.to_string()))?;
                Ok(Arc::new(embedder))
            }
            ProviderKind::Openai => {
                let api_key = self.resolve_api_key().ok_or_else(|| {
                    Error::InvalidArgument("set COURSEDEX_API_KEY or OPENAI_API_KEY for the openai provider".into())
                })?;
                let embedder = OpenAiEmbedder::new(
                    &api_key,
                    &self.api_base,
                    self.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL),
                    self.dimension.unwrap_or(DEFAULT_OPENAI_DIMENSION),
                    Duration::from_secs(self.timeout_secs),
                    self.max_retries,
                )?;
                Ok(Arc::new(embedder))
            }
        }
    }
}
