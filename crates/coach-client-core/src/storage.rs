//! Key-value persistence for client-side state.
//!
//! Values are opaque strings (JSON in practice) addressed by fixed keys. The
//! file backend keeps one `<key>.json` file per key under a state directory and
//! replaces it atomically on write. The memory backend is used by tests and by
//! callers that want a throwaway session.

use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;

pub const ENV_STATE_DIR: &str = "HEALTH_COACH_STATE_DIR";
const STATE_DIR_NAME: &str = "health-coach";
const HOME_STATE_DIR_NAME: &str = ".health-coach";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("storage write failed for {key}: {message}")]
    Io { key: String, message: String },
    #[error("storage encode failed for {key}: {message}")]
    Encode { key: String, message: String },
}

/// Storage keyed by fixed names. Reads never fail: anything unreadable is
/// reported as absent.
pub trait KeyValueStore: Debug + Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn open_default() -> Self {
        Self::new(resolve_state_dir(None))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_key(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Some(raw),
            Err(error) if error.kind() == ErrorKind::NotFound => None,
            Err(error) => {
                tracing::debug!(error = %error, path = %path.display(), "state read failed; treating as absent");
                None
            }
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let io_error = |error: std::io::Error| StoreError::Io {
            key: key.to_string(),
            message: error.to_string(),
        };
        fs::create_dir_all(&self.root).map_err(io_error)?;
        let path = self.path_for(key);
        // Each writer stages into its own file so concurrent saves of one key
        // settle as last-write-wins.
        let mut staging = NamedTempFile::new_in(&self.root).map_err(io_error)?;
        staging.write_all(value.as_bytes()).map_err(io_error)?;
        staging
            .persist(&path)
            .map(|_| ())
            .map_err(|error| io_error(error.error))
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(StoreError::Io {
                key: key.to_string(),
                message: error.to_string(),
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Option<String> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

/// Picks the state directory: explicit path, then `HEALTH_COACH_STATE_DIR`,
/// then the platform data dir, then `~/.health-coach`.
#[must_use]
pub fn resolve_state_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Some(raw) = std::env::var(ENV_STATE_DIR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    {
        return PathBuf::from(raw);
    }

    if let Some(mut data_dir) = dirs::data_local_dir() {
        data_dir.push(STATE_DIR_NAME);
        return data_dir;
    }

    if let Some(mut home_dir) = dirs::home_dir() {
        home_dir.push(HOME_STATE_DIR_NAME);
        return home_dir;
    }

    PathBuf::from(STATE_DIR_NAME)
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
