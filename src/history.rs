use tracing::warn;

use crate::error::PipelineError;
use crate::storage::KeyValueStore;

/// Storage key holding the JSON array of chilled hex colors.
pub const HISTORY_KEY: &str = "color-palette";

/// Append-only record of generated chill colors, oldest first.
///
/// Every append is written through to the store before it returns. With a
/// limit set, the oldest entries are dropped once the limit is exceeded.
#[derive(Debug)]
pub struct PaletteHistory<S> {
    store: S,
    entries: Vec<String>,
    limit: Option<usize>,
}

impl<S: KeyValueStore> PaletteHistory<S> {
    pub fn new(store: S) -> Self {
        Self::with_limit(store, None)
    }

    pub fn with_limit(store: S, limit: Option<usize>) -> Self {
        Self {
            store,
            entries: Vec::new(),
            limit,
        }
    }

    /// Read the persisted history into memory.
    ///
    /// An absent or malformed value resets storage to an empty array.
    pub fn load(&mut self) -> Result<&[String], PipelineError> {
        let raw = self.store.get(HISTORY_KEY)?;
        let parsed = raw
            .as_deref()
            .and_then(|raw| match serde_json::from_str::<Vec<String>>(raw) {
                Ok(entries) => Some(entries),
                Err(e) => {
                    warn!(error = %e, "chill history is corrupt, resetting");
                    None
                }
            });

        match parsed {
            Some(entries) => self.entries = entries,
            None => {
                self.entries.clear();
                self.store.set(HISTORY_KEY, "[]")?;
            }
        }
        Ok(&self.entries)
    }

    /// Append `hex` and persist the whole sequence.
    ///
    /// The in-memory sequence is updated even when the write fails.
    pub fn append(&mut self, hex: &str) -> Result<&[String], PipelineError> {
        self.entries.push(hex.to_string());
        if let Some(limit) = self.limit {
            if self.entries.len() > limit {
                let excess = self.entries.len() - limit;
                self.entries.drain(..excess);
            }
        }
        let encoded = serde_json::to_string(&self.entries)?;
        self.store.set(HISTORY_KEY, &encoded)?;
        Ok(&self.entries)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
