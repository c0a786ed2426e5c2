use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use tracing::warn;

use crate::error::PipelineError;

/// String-keyed, string-valued persistent storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PipelineError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PipelineError>;
}

/// In-process storage that lives as long as the value does.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PipelineError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PipelineError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A JSON object file mapping keys to string values.
///
/// Every `set` rewrites the whole file. A missing file reads as empty; so does
/// a file that is not a JSON object of strings, including non-UTF-8 bytes.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the per-user data directory.
    pub fn default_location() -> Result<Self, PipelineError> {
        let dir = data_dir(
            std::env::var("XDG_DATA_HOME").ok(),
            std::env::var("HOME").ok(),
        )?;
        Ok(Self::new(dir.join("storage.json")))
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, PipelineError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read(&self.path)?;
        match serde_json::from_slice(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "storage file unreadable, starting empty");
                Ok(BTreeMap::new())
            }
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PipelineError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PipelineError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }
}

/// Resolve the colorchill data directory from `XDG_DATA_HOME` or `HOME`.
fn data_dir(xdg_data_home: Option<String>, home: Option<String>) -> Result<PathBuf, PipelineError> {
    let data_home = match (xdg_data_home.filter(|d| !d.is_empty()), home.filter(|h| !h.is_empty())) {
        (Some(dir), _) => PathBuf::from(dir),
        (None, Some(home)) => PathBuf::from(home).join(".local").join("share"),
        (None, None) => {
            return Err(PipelineError::Storage(
                "neither XDG_DATA_HOME nor HOME is set; pass --history-file".to_string(),
            ))
        }
    };
    Ok(data_home.join("colorchill"))
}
