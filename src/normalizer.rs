//! Turns a course record into the single text blob that gets embedded.
//!
//! The output is a pure function of the record: rebuilding an index from the
//! same dataset must reproduce the same embeddings.

use crate::model::{Chapter, CourseRecord};

/// Canonical text for a record: `"<title> <description> <curriculum>"`.
pub fn normalize(record: &CourseRecord) -> String {
    let curriculum = flatten_curriculum(&record.curriculum);
    let mut text = String::with_capacity(
        record.title.len() + record.description.len() + curriculum.len() + 2,
    );
    text.push_str(&record.title);
    text.push(' ');
    text.push_str(&record.description);
    text.push(' ');
    text.push_str(&curriculum);
    text
}

/// Query text goes through the same path as indexed text.
pub fn normalize_query(text: &str) -> String {
    text.to_string()
}

/// `"chapter: lesson1, lesson2; chapter2: ..."`, chapters in original order.
pub fn flatten_curriculum(curriculum: &[Chapter]) -> String {
    curriculum
        .iter()
        .map(|chapter| format!("{}: {}", chapter.chapter_title, chapter.lessons.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}
