//! Durable key-value state, the stand-in for browser local storage.
//!
//! Three keys are used: [`KEY_RAW_API_KEY`] (last saved key, plaintext),
//! [`KEY_API_CONFIG`] (JSON provider settings with an encoded key) and
//! [`KEY_THEME`]. There is no schema versioning; readers fall back to
//! defaults on anything missing or malformed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use crate::error::{Error, Result};
use crate::models::Theme;

pub const KEY_RAW_API_KEY: &str = "gemini_api_key";
pub const KEY_API_CONFIG: &str = "apiConfig";
pub const KEY_THEME: &str = "theme";

pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile storage, for tests and one-shot commands.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|e| Error::Storage(e.to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|e| Error::Storage(e.to_string()))?
            .remove(key);
        Ok(())
    }
}

/// A JSON object on disk. Every write rewrites the whole file.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is empty. Any other read error is returned so that a
    /// write never replaces a file it could not read.
    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        match serde_json::from_str(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "ignoring malformed local storage file"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Storage(format!("failed to create {}: {}", parent.display(), e))
                })?;
            }
        }
        let json =
            serde_json::to_string_pretty(entries).map_err(|e| Error::Storage(e.to_string()))?;
        std::fs::write(&self.path, json)
            .map_err(|e| Error::Storage(format!("failed to write {}: {}", self.path.display(), e)))
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        match self.read_all() {
            Ok(mut entries) => entries.remove(key),
            Err(e) => {
                warn!(error = %e, "local storage unreadable");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// Saved theme preference; anything unrecognised reads as light.
pub fn load_theme(storage: &dyn LocalStorage) -> Theme {
    storage
        .get(KEY_THEME)
        .and_then(|v| Theme::parse(&v))
        .unwrap_or_default()
}

pub fn save_theme(storage: &dyn LocalStorage, theme: Theme) -> Result<()> {
    storage.set(KEY_THEME, theme.as_str())
}
