//! On-disk save slot.
//!
//! The save file is a JSON object so other tools can keep their own keys in
//! it; the game state lives under [`SNAPSHOT_KEY`] and is replaced whole on
//! every save.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::state::GameState;

pub const SNAPSHOT_KEY: &str = "leadershipSimulator";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("no saved game in {path:?}")]
    NotFound { path: PathBuf },
    #[error("failed to read save file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write save file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode saved game: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct SaveStore {
    path: PathBuf,
}

impl SaveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, state: &GameState) -> Result<(), SnapshotError> {
        let mut document = self.read_document()?.unwrap_or_default();
        document.insert(SNAPSHOT_KEY.to_string(), serde_json::to_value(state)?);
        self.write_document(&document)?;
        tracing::debug!(
            target: "leadsim::snapshot",
            path = %self.path.display(),
            turn = state.turn,
            "snapshot.saved"
        );
        Ok(())
    }

    pub fn load(&self) -> Result<GameState, SnapshotError> {
        let mut document = self
            .read_document()?
            .ok_or_else(|| self.not_found())?;
        let value = document
            .remove(SNAPSHOT_KEY)
            .ok_or_else(|| self.not_found())?;
        let state: GameState = serde_json::from_value(value)?;
        tracing::debug!(
            target: "leadsim::snapshot",
            path = %self.path.display(),
            turn = state.turn,
            "snapshot.loaded"
        );
        Ok(state)
    }

    /// Remove the game state, keeping any other keys in the file.
    pub fn clear(&self) -> Result<(), SnapshotError> {
        if let Some(mut document) = self.read_document()? {
            if document.remove(SNAPSHOT_KEY).is_some() {
                self.write_document(&document)?;
            }
        }
        Ok(())
    }

    fn not_found(&self) -> SnapshotError {
        SnapshotError::NotFound {
            path: self.path.clone(),
        }
    }

    fn read_document(&self) -> Result<Option<Map<String, Value>>, SnapshotError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SnapshotError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if contents.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn write_document(&self, document: &Map<String, Value>) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(document)?;
        fs::write(&self.path, json).map_err(|source| SnapshotError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::{Archetype, CompanyTemplate};

    #[test]
    fn save_then_load_restores_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path().join("save.json"));

        let mut state = GameState::new(Archetype::Firefighter, CompanyTemplate::Bigco, 77);
        state.turn = 4;
        state.rng.next_uint32();
        state.set_flag("crunched");
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.load(), Err(SnapshotError::NotFound { .. })));
    }

    #[test]
    fn other_keys_are_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        fs::write(&path, r#"{"theme": "dark"}"#).unwrap();
        let store = SaveStore::new(&path);

        assert!(matches!(store.load(), Err(SnapshotError::NotFound { .. })));
        store.save(&GameState::default()).unwrap();
        store.clear().unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert!(raw.get(SNAPSHOT_KEY).is_none());
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        fs::write(&path, "{ not json").unwrap();
        let store = SaveStore::new(&path);
        assert!(matches!(store.load(), Err(SnapshotError::Parse(_))));
    }
}
