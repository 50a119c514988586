//! ---
//! drill_section: "03-persistence-replay"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Run record model and artifact storage."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::record::{RunId, RunRecord};
use crate::{PersistenceError, Result};

const ARTIFACT_EXTENSION: &str = "json";
const MAX_COLLISION_SUFFIX: u32 = 1000;

/// Directory of sealed run artifacts, one JSON document per run.
///
/// Artifacts are created with create-new semantics and never rewritten.
#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    /// Use `root` as the artifact directory; it is created lazily on first seal.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Artifact directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `record` under `id`. When the name is already taken a `-N`
    /// suffix is appended; an existing artifact is never overwritten.
    pub fn seal(&self, id: &RunId, record: &RunRecord) -> Result<PathBuf> {
        if !self.root.as_os_str().is_empty() {
            fs::create_dir_all(&self.root)?;
        }
        let body = serde_json::to_vec_pretty(record)?;

        for attempt in 1..=MAX_COLLISION_SUFFIX {
            let name = if attempt == 1 {
                format!("{id}.{ARTIFACT_EXTENSION}")
            } else {
                format!("{id}-{attempt}.{ARTIFACT_EXTENSION}")
            };
            let path = self.root.join(name);
            let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "run artifact name taken, trying next suffix");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let mut writer = BufWriter::new(file);
            writer.write_all(&body)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            info!(path = %path.display(), steps = record.steps.len(), failed = record.is_failed(), "run artifact sealed");
            return Ok(path);
        }
        Err(PersistenceError::IdentityExhausted(id.to_string()))
    }

    /// Load a sealed artifact.
    pub fn load(path: impl AsRef<Path>) -> Result<RunRecord> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Artifacts in the store, ordered by run identity (and therefore by
    /// start time). Collision artifacts `X-N.json` follow their original `X.json`.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut artifacts = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|err| match err.into_io_error() {
                Some(io) => PersistenceError::Io(io),
                None => PersistenceError::Io(std::io::Error::new(
                    ErrorKind::Other,
                    "filesystem loop while listing runs",
                )),
            })?;
            let path = entry.path();
            if entry.file_type().is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(ARTIFACT_EXTENSION)
            {
                artifacts.push(path.to_path_buf());
            }
        }
        let stems: HashSet<String> = artifacts.iter().map(|path| stem_of(path)).collect();
        artifacts.sort_by_cached_key(|path| collision_key(&stem_of(path), &stems));
        Ok(artifacts)
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `(identity, attempt)` for an artifact stem. `X-N` only counts as attempt
/// `N` of `X` when `X` itself was sealed; run identities may end in `-digits`.
fn collision_key(stem: &str, stems: &HashSet<String>) -> (String, u32) {
    if let Some((base, suffix)) = stem.rsplit_once('-') {
        if let Ok(attempt) = suffix.parse::<u32>() {
            if (2..=MAX_COLLISION_SUFFIX).contains(&attempt) && stems.contains(base) {
                return (base.to_owned(), attempt);
            }
        }
    }
    (stem.to_owned(), 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{StepDetail, StepEntry, StepStatus};
    use chrono::Utc;
    use tempfile::tempdir;

    fn record() -> RunRecord {
        let mut record = RunRecord::new("node-loss", "Lose a node", Utc::now(), Some("CHG-1".into()), false);
        let mut detail = StepDetail::new();
        detail.insert("stdout".into(), serde_json::json!("ok\n"));
        record.steps.push(StepEntry {
            step_id: "stop".into(),
            action: "shell".into(),
            status: StepStatus::Success,
            detail,
        });
        record.failed = Some("boom".into());
        record
    }

    #[test]
    fn seal_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path().join("runs"));
        let record = record();
        let id = RunId::new(record.started_at, &record.scenario_id, record.note.as_deref());

        let path = store.seal(&id, &record).unwrap();
        let loaded = RunStore::load(&path).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn colliding_identities_get_distinct_files() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path());
        let record = record();
        let id = RunId::new(record.started_at, &record.scenario_id, None);

        let first = store.seal(&id, &record).unwrap();
        let second = store.seal(&id, &record).unwrap();
        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("-2.json"));
        let third = store.seal(&id, &record).unwrap();
        assert_eq!(store.list().unwrap(), vec![first, second, third]);
    }

    #[test]
    fn listing_orders_by_identity_then_attempt() {
        let dir = tempdir().unwrap();
        for name in [
            "20260314T100000.000Z_db.json",
            "20260314T090000.000Z_s-10.json",
            "20260314T090000.000Z_s-2.json",
            "20260314T090000.000Z_s.json",
            "20260314T080000.000Z_shift-2.json",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let store = RunStore::new(dir.path());
        let names: Vec<_> = store
            .list()
            .unwrap()
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            [
                "20260314T080000.000Z_shift-2.json",
                "20260314T090000.000Z_s.json",
                "20260314T090000.000Z_s-2.json",
                "20260314T090000.000Z_s-10.json",
                "20260314T100000.000Z_db.json",
            ]
        );
    }

    #[test]
    fn listing_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path().join("absent"));
        assert!(store.list().unwrap().is_empty());
    }
}
