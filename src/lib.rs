//! Course catalog retrieval: normalize scraped course records, embed them,
//! index the vectors and answer free-text queries with the nearest courses.

pub mod model;
pub mod error;
pub mod normalizer;
pub mod embedding;
pub mod vector;
pub mod index;
pub mod mapping;
pub mod storage;
pub mod catalog;
pub mod dataset;
pub mod service;
pub mod config;

pub use crate::catalog::Catalog;
pub use crate::embedding::{EmbeddingProvider, HashingEmbedder, OpenAiEmbedder};
pub use crate::error::{EmbedError, Error, QueryError, Result};
pub use crate::index::FlatIndex;
pub use crate::mapping::IdentityMapping;
pub use crate::model::{Chapter, CourseRecord, Embedding, SearchResult};
pub use crate::service::RetrievalService;
