use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard};
use crate::catalog::Catalog;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, QueryError, Result};
use crate::model::{CourseRecord, SearchResult};
use crate::normalizer::{normalize, normalize_query};

/// Builds the catalog from records and answers text queries against it.
///
/// The catalog sits behind one coarse `RwLock`. Queries take the read side
/// only for the search itself, never while waiting on the embedding
/// provider, so concurrent queries do not serialize. A build assembles a
/// fresh catalog off-lock and swaps it in only once every record is indexed.
pub struct RetrievalService {
    provider: Arc<dyn EmbeddingProvider>,
    catalog: RwLock<Catalog>,
}

impl std::fmt::Debug for RetrievalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalService")
        .field("model", &self.provider.model())
        .field("entries", &self.len())
        .finish()
    }
}

impl RetrievalService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let catalog = Catalog::new(provider.model(), provider.dimension());
        Self { provider, catalog: RwLock::new(catalog) }
    }

    /// Restore a persisted catalog. The provider must be the one it was built with.
    pub fn load(provider: Arc<dyn EmbeddingProvider>, dir: &Path) -> Result<Self> {
        let catalog = Catalog::load(dir)?;
        if catalog.dimension() != provider.dimension() {
            return Err(Error::DimensionMismatch {
                expected: catalog.dimension(),
                actual: provider.dimension(),
            });
        }
        if catalog.model() != provider.model() {
            return Err(Error::InconsistentIndexState(format!(
                "index was built with model '{}', provider is '{}'",
                catalog.model(),
                provider.model()
            )));
        }
        Ok(Self { provider, catalog: RwLock::new(catalog) })
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Index every record in input order. Any failure discards the whole
    /// build and leaves the previous catalog in place.
    pub async fn build(&self, records: Vec<CourseRecord>) -> Result<()> {
        let total = records.len();
        tracing::info!(records = total, model = self.provider.model(), dimension = self.provider.dimension(), "building index");

        let mut fresh = Catalog::new(self.provider.model(), self.provider.dimension());
        for record in records {
            let text = normalize(&record);
            let embedding = self.provider.embed(&text).await.map_err(|e| {
                tracing::error!(record = %record.id, "embedding failed, aborting build: {}", e);
                Error::from(e)
            })?;
            let position = fresh.append(record, &embedding)?;
            tracing::debug!(position, "record indexed");
        }

        *self.catalog.write().map_err(|_| poisoned())? = fresh;
        tracing::info!(entries = total, "index built");
        Ok(())
    }

    /// Ranked matches for free text. One failed query never touches the catalog.
    pub async fn query(&self, text: &str, k: usize) -> std::result::Result<Vec<SearchResult>, QueryError> {
        let outcome = self.try_query(text, k).await;
        if let Err(e) = &outcome {
            log_query_failure(e);
        }
        outcome.map_err(QueryError::from)
    }

    /// Like [`query`](Self::query) but returns the matched records themselves.
    pub async fn query_records(
        &self,
        text: &str,
        k: usize,
    ) -> std::result::Result<Vec<(CourseRecord, f32)>, QueryError> {
        let hits = self.query(text, k).await?;
        let catalog = self.read().map_err(QueryError::Failed)?;
        hits.into_iter()
            .map(|hit| {
                catalog
                    .record(&hit.record_id)
                    .cloned()
                    .map(|record| (record, hit.distance))
                    .ok_or_else(|| {
                        QueryError::Failed(Error::InconsistentIndexState(format!(
                            "no stored record for id '{}'",
                            hit.record_id
                        )))
                    })
            })
            .collect()
    }

    async fn try_query(&self, text: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".into()));
        }
        let empty = self.read()?.is_empty();
        if empty {
            return Ok(Vec::new());
        }

        let embedding = self.provider.embed(&normalize_query(text)).await?;
        let results = self.read()?.search(&embedding, k)?;
        tracing::debug!(k, hits = results.len(), "query answered");
        Ok(results)
    }

    /// Stop-the-world snapshot: holds the read lock so no build can swap mid-write.
    pub fn persist(&self, dir: &Path) -> Result<()> {
        self.read()?.persist(dir)
    }

    pub fn record(&self, record_id: &str) -> Option<CourseRecord> {
        self.read().ok()?.record(record_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Catalog>> {
        self.catalog.read().map_err(|_| poisoned())
    }
}

fn poisoned() -> Error {
    Error::InconsistentIndexState("catalog lock poisoned".into())
}

fn log_query_failure(err: &Error) {
    if err.is_retryable() {
        tracing::warn!(rate_limited = err.is_rate_limited(), "query deferred: {}", err);
    } else {
        tracing::error!("query failed: {}", err);
    }
}
