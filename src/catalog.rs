use std::path::Path;
use crate::error::{Error, Result};
use crate::index::FlatIndex;
use crate::mapping::IdentityMapping;
use crate::model::{CourseRecord, SearchResult};
use crate::storage::{self, Snapshot, FORMAT_VERSION};

/// The vector index and its identity mapping, kept in lockstep.
///
/// Every position in `index` has exactly one id in `mapping` and one record
/// in `records`; the three only grow together through [`Catalog::append`].
#[derive(Debug, Clone)]
pub struct Catalog {
    model: String,
    index: FlatIndex,
    mapping: IdentityMapping,
    records: Vec<CourseRecord>,
}

impl Catalog {
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            model: model.into(),
            index: FlatIndex::new(dimension),
            mapping: IdentityMapping::new(),
            records: Vec::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn mapping(&self) -> &IdentityMapping {
        &self.mapping
    }

    /// Insert the embedding and bind its position to the record.
    pub fn append(&mut self, record: CourseRecord, embedding: &[f32]) -> Result<u64> {
        if record.id.trim().is_empty() {
            return Err(Error::InvalidInput("record id must not be empty".into()));
        }
        // Checked up front so a refused bind never leaves an orphan row
        if self.mapping.position_of(&record.id).is_some() {
            return Err(Error::DuplicateRecordId(record.id));
        }

        let position = self.index.insert(embedding)?;
        self.mapping.bind(position, record.id.clone())?;
        self.records.push(record);
        Ok(position)
    }

    /// Nearest records to an already-embedded query.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let hits = self.index.search(query, k)?;
        hits.into_iter()
            .map(|(position, distance)| {
                let record_id = self.mapping.resolve(position)?.to_string();
                Ok(SearchResult { record_id, distance })
            })
            .collect()
    }

    pub fn record(&self, record_id: &str) -> Option<&CourseRecord> {
        let position = self.mapping.position_of(record_id)?;
        self.records.get(position as usize)
    }

    pub fn records(&self) -> &[CourseRecord] {
        &self.records
    }

    pub fn persist(&self, dir: &Path) -> Result<()> {
        storage::write_snapshot(dir, &self.to_snapshot())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let catalog = Self::from_snapshot(storage::read_snapshot(dir)?)?;
        tracing::info!(
            entries = catalog.len(),
            dimension = catalog.dimension(),
            model = %catalog.model,
            "catalog restored"
        );
        Ok(catalog)
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            format_version: FORMAT_VERSION,
            model: self.model.clone(),
            dimension: self.index.dimension() as u64,
            vectors: self.index.rows().to_vec(),
            record_ids: self.mapping.ids().to_vec(),
            records: self.records.clone(),
        }
    }

    /// Rebuild from a snapshot, refusing anything where index, mapping and
    /// records disagree.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let dimension = usize::try_from(snapshot.dimension)
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| Error::InconsistentIndexState(format!("bad dimension {}", snapshot.dimension)))?;
        let index = FlatIndex::from_rows(dimension, snapshot.vectors)?;

        if index.len() != snapshot.record_ids.len() {
            return Err(Error::InconsistentIndexState(format!(
                "index holds {} entries but mapping binds {}",
                index.len(),
                snapshot.record_ids.len()
            )));
        }
        if snapshot.records.len() != snapshot.record_ids.len() {
            return Err(Error::InconsistentIndexState(format!(
                "mapping binds {} positions but {} records were stored",
                snapshot.record_ids.len(),
                snapshot.records.len()
            )));
        }
        if let Some((position, (id, record))) = snapshot
            .record_ids
            .iter()
            .zip(&snapshot.records)
            .enumerate()
            .find(|(_, (id, record))| **id != record.id)
        {
            return Err(Error::InconsistentIndexState(format!(
                "position {} bound to '{}' but stores record '{}'",
                position, id, record.id
            )));
        }

        let mapping = IdentityMapping::from_ids(snapshot.record_ids)
            .map_err(|e| Error::InconsistentIndexState(e.to_string()))?;

        Ok(Self {
            model: snapshot.model,
            index,
            mapping,
            records: snapshot.records,
        })
    }
}
