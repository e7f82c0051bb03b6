//! Preference store: durable user-id -> preference mapping.
//!
//! A single JSON document on disk. A missing or unreadable file loads as an
//! empty mapping (logged) so first runs and transient read failures never
//! block the engine; write failures propagate so callers never continue on
//! state they believe was persisted but was not.
//!
//! All I/O is synchronous `std::fs`. Callers on the async runtime hold the
//! document small; a larger store would need `spawn_blocking` at the call
//! sites.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::StoreError;
use crate::prefs::UserPreference;

/// The full persisted mapping. BTreeMap keeps iteration deterministic.
pub type PrefMap = BTreeMap<String, UserPreference>;

/// JSON-file-backed preference store.
#[derive(Debug, Clone)]
pub struct PrefStore {
    path: PathBuf,
}

/// Returns `~/.config/slotcaster[-dev]/` based on SLOTCASTER_ENV.
///
/// Set SLOTCASTER_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("SLOTCASTER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("slotcaster-dev")
    } else {
        base_dir.join("slotcaster")
    };

    std::fs::create_dir_all(&dir).map_err(|e| StoreError::DataDir(e.to_string()))?;
    Ok(dir)
}

impl PrefStore {
    /// Open the store at the default location.
    pub fn open() -> Result<Self, StoreError> {
        Ok(Self {
            path: data_dir()?.join("prefs.json"),
        })
    }

    /// Open the store at an explicit path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the full mapping. A missing backing file is a first run and
    /// yields an empty mapping; read or parse failures are logged and also
    /// yield an empty mapping rather than blocking the caller.
    pub fn load(&self) -> PrefMap {
        if !self.path.exists() {
            return PrefMap::new();
        }
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "preference read failed, treating as empty");
                return PrefMap::new();
            }
        };
        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "preference file malformed, treating as empty");
                PrefMap::new()
            }
        }
    }

    /// Persist the full mapping. Writes to a sibling temp file and renames
    /// so a crash mid-write cannot truncate the previous state.
    pub fn save(&self, prefs: &PrefMap) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(prefs)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|source| StoreError::SaveFailed {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| StoreError::SaveFailed {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefStore::with_path(dir.path().join("prefs.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefStore::with_path(dir.path().join("prefs.json"));

        let mut prefs = PrefMap::new();
        let mut pref = UserPreference::default();
        pref.selected_slots.insert("18:00".to_string());
        pref.paused = true;
        prefs.insert("u1".to_string(), pref);

        store.save(&prefs).unwrap();
        let loaded = store.load();
        assert_eq!(loaded, prefs);
    }

    #[test]
    fn malformed_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = PrefStore::with_path(path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_into_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefStore::with_path(dir.path().join("nope").join("prefs.json"));
        let err = store.save(&PrefMap::new()).unwrap_err();
        assert!(matches!(err, StoreError::SaveFailed { .. }));
    }

    #[test]
    fn save_overwrites_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefStore::with_path(dir.path().join("prefs.json"));

        let mut prefs = PrefMap::new();
        prefs.insert("u1".to_string(), UserPreference::default());
        store.save(&prefs).unwrap();

        prefs.clear();
        store.save(&prefs).unwrap();
        assert!(store.load().is_empty());
    }
}
