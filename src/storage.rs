use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use rkyv::Deserialize;
use crate::error::{Error, Result};
use crate::model::CourseRecord;

pub const SNAPSHOT_FILE: &str = "index.cdx";
pub const FORMAT_VERSION: u32 = 1;

// Footer layout: [payload][magic (8b)][seahash of payload, u64 LE (8b)]
const FOOTER_MAGIC: &[u8; 8] = b"CDXSNAP1";
const FOOTER_LEN: usize = 16;

/// Everything needed to restore a catalog, archived as one unit.
///
/// Index rows and mapping ids travel together so a restore can never pair
/// vectors from one build with ids from another.
#[derive(Archive, RkyvDeserialize, RkyvSerialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub struct Snapshot {
    pub format_version: u32,

    /// Embedding model the vectors came from
    pub model: String,

    pub dimension: u64,

    /// Row-major vectors, row N is position N
    pub vectors: Vec<f32>,

    /// Record id bound to each position
    pub record_ids: Vec<String>,

    /// Source records, in position order
    pub records: Vec<CourseRecord>,
}

pub fn snapshot_path(dir: &Path) -> PathBuf {
    dir.join(SNAPSHOT_FILE)
}

/// Write atomically: temp file, fsync, rename.
pub fn write_snapshot(dir: &Path, snapshot: &Snapshot) -> Result<()> {
    let bytes = rkyv::to_bytes::<_, 4096>(snapshot)
        .map_err(|e| Error::Snapshot(e.to_string()))?;
    let checksum = seahash::hash(&bytes);

    fs::create_dir_all(dir)?;
    let path = snapshot_path(dir);
    let tmp_path = path.with_extension("cdx.tmp");

    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(&bytes)?;
        file.write_all(FOOTER_MAGIC)?;
        file.write_all(&checksum.to_le_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, &path)?;

    tracing::info!(
        path = %path.display(),
        bytes = bytes.len(),
        entries = snapshot.record_ids.len(),
        "snapshot written (checksum {:#018x})",
        checksum
    );
    Ok(())
}

pub fn read_snapshot(dir: &Path) -> Result<Snapshot> {
    let path = snapshot_path(dir);
    let raw = fs::read(&path)?;
    let snapshot = decode(&raw)?;
    tracing::debug!(path = %path.display(), bytes = raw.len(), "snapshot read");
    Ok(snapshot)
}

fn decode(raw: &[u8]) -> Result<Snapshot> {
    if raw.len() < FOOTER_LEN || &raw[raw.len() - FOOTER_LEN..raw.len() - 8] != FOOTER_MAGIC {
        return Err(Error::InconsistentIndexState("snapshot footer missing or truncated".into()));
    }
    let payload = &raw[..raw.len() - FOOTER_LEN];
    let mut stored = [0u8; 8];
    stored.copy_from_slice(&raw[raw.len() - 8..]);
    let stored = u64::from_le_bytes(stored);
    let computed = seahash::hash(payload);
    if stored != computed {
        return Err(Error::InconsistentIndexState(format!(
            "snapshot checksum mismatch: stored {:#018x}, computed {:#018x}",
            stored, computed
        )));
    }

    // Archived data must sit on an aligned buffer
    let mut aligned = rkyv::AlignedVec::with_capacity(payload.len());
    aligned.extend_from_slice(payload);

    let archived = rkyv::check_archived_root::<Snapshot>(&aligned)
        .map_err(|e| Error::Snapshot(e.to_string()))?;
    let snapshot: Snapshot = archived
        .deserialize(&mut rkyv::Infallible)
        .map_err(|_| Error::Snapshot("failed to deserialize archived snapshot".into()))?;

    if snapshot.format_version != FORMAT_VERSION {
        return Err(Error::InconsistentIndexState(format!(
            "unsupported snapshot version {} (expected {})",
            snapshot.format_version, FORMAT_VERSION
        )));
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        Snapshot {
            format_version: FORMAT_VERSION,
            model: "m".into(),
            dimension: 2,
            vectors: vec![0.1, 0.2, 0.3, 0.4],
            record_ids: vec!["a".into(), "b".into()],
            records: vec![
                CourseRecord::new("a", "A", "first").with_chapter("One", ["x", "y"]),
                CourseRecord::new("b", "B", "second"),
            ],
        }
    }

    #[test]
    fn write_then_read_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(dir.path(), &sample()).unwrap();
        assert_eq!(read_snapshot(dir.path()).unwrap(), sample());
        assert!(!dir.path().join("index.cdx.tmp").exists());
    }

    #[test]
    fn flipped_byte_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(dir.path(), &sample()).unwrap();
        let path = snapshot_path(dir.path());
        let mut raw = fs::read(&path).unwrap();
        raw[0] ^= 0xFF;
        fs::write(&path, &raw).unwrap();

        assert!(matches!(read_snapshot(dir.path()), Err(Error::InconsistentIndexState(_))));
    }

    #[test]
    fn truncated_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(dir.path(), &sample()).unwrap();
        let path = snapshot_path(dir.path());
        let raw = fs::read(&path).unwrap();
        fs::write(&path, &raw[..raw.len() / 2]).unwrap();

        assert!(matches!(read_snapshot(dir.path()), Err(Error::InconsistentIndexState(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(read_snapshot(dir.path()), Err(Error::Io(_))));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot { format_version: 99, ..sample() };
        write_snapshot(dir.path(), &snapshot).unwrap();
        assert!(matches!(read_snapshot(dir.path()), Err(Error::InconsistentIndexState(_))));
    }
}
