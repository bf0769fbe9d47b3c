use std::collections::HashMap;
use crate::error::{Error, Result};

/// Bijection between index positions and record ids.
///
/// Positions must be bound densely, in the same order the index hands them
/// out. Rebinding a position or reusing an id is refused rather than
/// overwritten.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityMapping {
    ids: Vec<String>,
    positions: HashMap<String, u64>,
}

impl IdentityMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from ids listed in position order.
    pub fn from_ids(ids: Vec<String>) -> Result<Self> {
        let mut mapping = Self::new();
        for (position, id) in ids.into_iter().enumerate() {
            mapping.bind(position as u64, id)?;
        }
        Ok(mapping)
    }

    pub fn bind(&mut self, position: u64, record_id: impl Into<String>) -> Result<()> {
        let record_id = record_id.into();
        let next = self.ids.len() as u64;

        if let Some(existing) = self.ids.get(position as usize) {
            return Err(Error::DuplicateBinding { position, existing: existing.clone() });
        }
        if position != next {
            return Err(Error::OutOfOrderBinding { expected: next, actual: position });
        }
        if self.positions.contains_key(&record_id) {
            return Err(Error::DuplicateRecordId(record_id));
        }

        self.positions.insert(record_id.clone(), position);
        self.ids.push(record_id);
        Ok(())
    }

    pub fn resolve(&self, position: u64) -> Result<&str> {
        self.ids
            .get(position as usize)
            .map(String::as_str)
            .ok_or(Error::UnboundPosition(position))
    }

    /// Reverse lookup.
    pub fn position_of(&self, record_id: &str) -> Option<u64> {
        self.positions.get(record_id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in position order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}
