//! Loads the scraped course table into [`CourseRecord`]s.
//!
//! Accepts either a JSON array or JSON lines. Rows may omit any field;
//! missing text becomes the empty string and a missing id is minted here,
//! once, at ingestion.

use std::fs;
use std::path::Path;
use serde::Deserialize;
use uuid::Uuid;
use crate::error::{Error, Result};
use crate::model::{Chapter, CourseRecord};

#[derive(Debug, Deserialize)]
struct CourseRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    curriculum: Option<Vec<Chapter>>,
}

impl From<CourseRow> for CourseRecord {
    fn from(row: CourseRow) -> Self {
        let id = row
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        CourseRecord {
            id,
            title: row.title.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            curriculum: row.curriculum.unwrap_or_default(),
        }
    }
}

pub fn load_dataset(path: &Path) -> Result<Vec<CourseRecord>> {
    let text = fs::read_to_string(path)?;
    let records = parse_dataset(&text)?;
    tracing::info!(path = %path.display(), rows = records.len(), "dataset loaded");
    Ok(records)
}

pub fn parse_dataset(text: &str) -> Result<Vec<CourseRecord>> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        let rows: Vec<CourseRow> = serde_json::from_str(trimmed)
            .map_err(|e| Error::Dataset(format!("invalid JSON array: {e}")))?;
        return Ok(rows.into_iter().map(CourseRecord::from).collect());
    }

    let mut records = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row: CourseRow = serde_json::from_str(line)
            .map_err(|e| Error::Dataset(format!("line {}: {e}", line_no + 1)))?;
        records.push(row.into());
    }
    Ok(records)
}
