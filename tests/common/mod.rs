#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use async_trait::async_trait;
use coursedex::{EmbedError, Embedding, EmbeddingProvider, HashingEmbedder};

/// Tiny fixed-vocabulary model: one axis per keyword stem.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self { vocabulary: vec!["intro", "llm", "basic", "advanced", "deep", "dive"] }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn model(&self) -> &str {
        "keyword-test"
    }

    fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
        let mut v = vec![0.0f32; self.vocabulary.len()];
        for token in text.split(|c: char| !c.is_alphanumeric()).map(str::to_lowercase) {
            if let Some(axis) = self.vocabulary.iter().position(|w| token.starts_with(w)) {
                v[axis] += 1.0;
            }
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    None,
    RateLimited,
    Down,
    Reject,
}

/// Hashing model that can be told to fail, optionally only after some calls.
pub struct FaultyEmbedder {
    inner: HashingEmbedder,
    fault: Mutex<Fault>,
    fail_after: Option<usize>,
    calls: AtomicUsize,
}

impl FaultyEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            inner: HashingEmbedder::new(dimension).unwrap(),
            fault: Mutex::new(Fault::None),
            fail_after: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_after(dimension: usize, calls: usize, fault: Fault) -> Self {
        Self {
            fault: Mutex::new(fault),
            fail_after: Some(calls),
            ..Self::new(dimension)
        }
    }

    pub fn set_fault(&self, fault: Fault) {
        *self.fault.lock().unwrap() = fault;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FaultyEmbedder {
    fn model(&self) -> &str {
        self.inner.model()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let armed = self.fail_after.map_or(true, |n| call >= n);
        let fault = self.fault.lock().unwrap().clone();
        match fault {
            Fault::RateLimited if armed => Err(EmbedError::RateLimited { retry_after: None }),
            Fault::Down if armed => Err(EmbedError::Unavailable("connection refused".into())),
            Fault::Reject if armed => Err(EmbedError::InvalidInput("rejected".into())),
            _ => Ok(self.inner.embed_text(text)),
        }
    }
}
