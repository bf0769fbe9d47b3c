use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Fixed-length embedding vector. Length is set by the provider that made it.
pub type Embedding = Vec<f32>;

/// One chapter of a course curriculum, lessons kept in page order.
#[derive(Archive, RkyvDeserialize, RkyvSerialize, Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[archive(check_bytes)]
pub struct Chapter {
    #[serde(alias = "chapter-title", default)]
    pub chapter_title: String,
    #[serde(default)]
    pub lessons: Vec<String>,
}

/// A scraped course. Immutable once ingested.
#[derive(Archive, RkyvDeserialize, RkyvSerialize, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[archive(check_bytes)]
pub struct CourseRecord {
    /// Stable identity, assigned at ingestion
    pub id: String,

    pub title: String,

    pub description: String,

    pub curriculum: Vec<Chapter>,
}

impl CourseRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            curriculum: Vec::new(),
        }
    }

    pub fn with_chapter<I, S>(mut self, chapter_title: impl Into<String>, lessons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.curriculum.push(Chapter {
            chapter_title: chapter_title.into(),
            lessons: lessons.into_iter().map(Into::into).collect(),
        });
        self
    }
}

/// A ranked hit. Lower distance is closer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub record_id: String,
    /// Squared euclidean distance to the query embedding
    pub distance: f32,
}
