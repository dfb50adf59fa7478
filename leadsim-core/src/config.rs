//! Loading the scenario deck and milestone configuration.
//!
//! Both documents ship as built-in JSON. A path given explicitly wins, then
//! the matching environment variable; anything that fails to load is logged
//! and replaced by the built-in document so startup never fails on config.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::milestones::MilestoneConfig;
use crate::scenario::ScenarioDeck;

pub const BUILTIN_DECK: &str = include_str!("data/deck.json");
pub const BUILTIN_MILESTONES: &str = include_str!("data/milestones.json");

pub const DECK_PATH_ENV: &str = "LEADSIM_DECK_PATH";
pub const MILESTONES_PATH_ENV: &str = "LEADSIM_MILESTONES_PATH";
pub const PROVIDER_URL_ENV: &str = "LEADSIM_PROVIDER_URL";
pub const SAVE_PATH_ENV: &str = "LEADSIM_SAVE_PATH";
pub const DEFAULT_SAVE_PATH: &str = "leadsim_save.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn builtin_deck() -> ScenarioDeck {
    parse_str(BUILTIN_DECK).expect("builtin deck should parse")
}

pub fn builtin_milestones() -> MilestoneConfig {
    parse_str(BUILTIN_MILESTONES).expect("builtin milestones should parse")
}

pub fn read_deck(path: &Path) -> Result<ScenarioDeck, ConfigError> {
    read_file(path)
}

pub fn read_milestones(path: &Path) -> Result<MilestoneConfig, ConfigError> {
    read_file(path)
}

/// Deck from `explicit`, else `LEADSIM_DECK_PATH`, else the built-in deck.
pub fn load_deck(explicit: Option<&Path>) -> ScenarioDeck {
    let deck = load_with_fallback(explicit, DECK_PATH_ENV, "deck", read_deck)
        .unwrap_or_else(builtin_deck);
    tracing::info!(target: "leadsim::config", scenarios = deck.len(), "deck.loaded");
    deck
}

/// Milestones from `explicit`, else `LEADSIM_MILESTONES_PATH`, else built-in.
pub fn load_milestones(explicit: Option<&Path>) -> MilestoneConfig {
    load_with_fallback(explicit, MILESTONES_PATH_ENV, "milestones", read_milestones)
        .unwrap_or_else(builtin_milestones)
}

/// A non-empty environment variable read as a path.
pub fn env_path(var: &str) -> Option<PathBuf> {
    env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

fn load_with_fallback<T>(
    explicit: Option<&Path>,
    env_var: &str,
    label: &str,
    read: fn(&Path) -> Result<T, ConfigError>,
) -> Option<T> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| env_path(env_var))?;

    match read(&path) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                target: "leadsim::config",
                path = %path.display(),
                error = %err,
                "{label}.load_failed"
            );
            None
        }
    }
}

fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&contents)
}

fn parse_str<T: DeserializeOwned>(data: &str) -> Result<T, ConfigError> {
    Ok(serde_json::from_str(data)?)
}
