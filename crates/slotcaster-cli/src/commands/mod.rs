pub mod engine;
pub mod prefs;
pub mod run;
pub mod slots;

use std::path::PathBuf;

use slotcaster_core::PrefStore;

/// Open the preference store, honoring an explicit `--store` path.
pub fn open_store(path: Option<PathBuf>) -> Result<PrefStore, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(PrefStore::with_path(path)),
        None => Ok(PrefStore::open()?),
    }
}
