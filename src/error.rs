use std::io;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures raised by an embedding provider.
///
/// Callers need to tell a transient outage (retry with backoff) apart from
/// input the model will never accept (abort).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbedError {
    /// The provider throttled the request.
    #[error("embedding provider rate limited the request")]
    RateLimited {
        /// Server-suggested wait, when one was sent.
        retry_after: Option<Duration>,
    },

    /// The provider could not be reached, timed out, or failed internally.
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    /// The provider rejected the input itself.
    #[error("embedding input rejected: {0}")]
    InvalidInput(String),

    /// The provider answered with a vector of the wrong length.
    #[error("embedding has {actual} dimensions, provider declares {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding unavailable: {reason}")]
    EmbeddingUnavailable { reason: String, rate_limited: bool },

    #[error("position {0} is not bound to a record")]
    UnboundPosition(u64),

    #[error("position {position} is already bound to '{existing}'")]
    DuplicateBinding { position: u64, existing: String },

    #[error("binding out of order: next position is {expected}, got {actual}")]
    OutOfOrderBinding { expected: u64, actual: u64 },

    #[error("record id '{0}' appears more than once")]
    DuplicateRecordId(String),

    #[error("inconsistent index state: {0}")]
    InconsistentIndexState(String),

    #[error("snapshot unreadable: {0}")]
    Snapshot(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// True when the caller may retry the same operation later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::EmbeddingUnavailable { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::EmbeddingUnavailable { rate_limited: true, .. })
    }
}

impl From<EmbedError> for Error {
    fn from(err: EmbedError) -> Self {
        match err {
            EmbedError::RateLimited { .. } => Error::EmbeddingUnavailable {
                reason: err.to_string(),
                rate_limited: true,
            },
            EmbedError::Unavailable(reason) => Error::EmbeddingUnavailable {
                reason,
                rate_limited: false,
            },
            EmbedError::InvalidInput(reason) => Error::InvalidInput(reason),
            EmbedError::DimensionMismatch { expected, actual } => {
                Error::DimensionMismatch { expected, actual }
            }
        }
    }
}

/// Outcome of a failed query, split the way a front end presents it.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Rate limit exceeded. Please wait and try again later.")]
    RateLimited,

    #[error("Search is temporarily unavailable ({0}). Please try again later.")]
    Unavailable(String),

    #[error("An error occurred: {0}")]
    Failed(#[source] Error),
}

impl QueryError {
    /// Whether retrying after a pause can succeed.
    pub fn is_try_again_later(&self) -> bool {
        !matches!(self, QueryError::Failed(_))
    }
}

impl From<Error> for QueryError {
    fn from(err: Error) -> Self {
        match err {
            Error::EmbeddingUnavailable { rate_limited: true, .. } => QueryError::RateLimited,
            Error::EmbeddingUnavailable { reason, .. } => QueryError::Unavailable(reason),
            other => QueryError::Failed(other),
        }
    }
}
