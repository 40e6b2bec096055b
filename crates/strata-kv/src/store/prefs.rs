//! Preference-style backend: one JSON object file, string key → string value.
//!
//! Mirrors a platform preference store: the whole map is loaded once at open
//! and rewritten on every mutation. Suited to small collections; the
//! file-per-key backend scales better for anything else.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use strata_core::Result;

use super::KeyValueStore;

/// Single-file map-backed [`KeyValueStore`].
pub struct PrefsStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl PrefsStore {
    /// Open the store at `path`, loading any existing map.
    ///
    /// A missing file starts empty; an unreadable or malformed file is logged
    /// and also starts empty (quiet read policy).
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(err) => {
                    warn!(path = %path.display(), %err, "preference file malformed, starting empty");
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                warn!(path = %path.display(), %err, "preference file unreadable, starting empty");
                HashMap::new()
            }
        };
        debug!(path = %path.display(), entries = entries.len(), "preference store opened");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Rewrite the whole map to disk. Called under the entries lock so
    /// writers serialize.
    async fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for PrefsStore {
    async fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let _ = entries.insert(key.to_string(), value.to_string());
        self.persist(&entries).await
    }

    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.entries.lock().await.contains_key(key))
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.lock().await;
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
