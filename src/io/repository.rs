use std::fs;
use std::path::PathBuf;

use super::snapshot::SpaceSnapshot;

/// Error type for persistence operations. Loading never fails (see
/// [`Repository::load`]); only saving surfaces errors.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The persistence contract. One snapshot in, one snapshot out; the
/// repository owns the file format.
pub trait Repository {
    /// Load the persisted snapshot. A missing, unreadable, or malformed
    /// source yields the empty snapshot — load never propagates an error.
    fn load(&mut self) -> SpaceSnapshot;

    /// Persist a snapshot, replacing whatever was stored before.
    fn save(&mut self, snapshot: &SpaceSnapshot) -> Result<(), RepoError>;
}

/// Stores the space as one pretty-printed JSON file.
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileRepository { path: path.into() }
    }
}

impl Repository for JsonFileRepository {
    fn load(&mut self) -> SpaceSnapshot {
        match fs::read_to_string(&self.path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
            Err(_) => SpaceSnapshot::default(),
        }
    }

    fn save(&mut self, snapshot: &SpaceSnapshot) -> Result<(), RepoError> {
        let text = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, text).map_err(|source| RepoError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// In-memory repository for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryRepository {
    pub snapshot: SpaceSnapshot,
    pub saves: usize,
}

impl MemoryRepository {
    pub fn new(snapshot: SpaceSnapshot) -> Self {
        MemoryRepository { snapshot, saves: 0 }
    }
}

impl Repository for MemoryRepository {
    fn load(&mut self) -> SpaceSnapshot {
        self.snapshot.clone()
    }

    fn save(&mut self, snapshot: &SpaceSnapshot) -> Result<(), RepoError> {
        self.snapshot = snapshot.clone();
        self.saves += 1;
        Ok(())
    }
}
