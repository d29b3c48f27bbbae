//! File-backed autosave store.
//!
//! All slots live in one pretty-printed JSON object keyed by slot name.
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash mid-write leaves the previous contents intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use proctor_core::model::SavedAttempt;
use proctor_core::traits::AttemptStore;

use crate::error::StoreError;

type SlotMap = BTreeMap<String, SavedAttempt>;

/// Autosave slots persisted to a JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_slots(&self) -> Result<SlotMap> {
        if !self.path.exists() {
            return Ok(SlotMap::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read store: {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(SlotMap::new());
        }
        let slots = serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        Ok(slots)
    }

    fn write_slots(&self, slots: &SlotMap) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(slots).context("failed to serialize store")?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write store: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace store: {}", self.path.display()))?;
        Ok(())
    }
}

impl AttemptStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<SavedAttempt>> {
        Ok(self.read_slots()?.remove(key))
    }

    fn save(&self, key: &str, attempt: &SavedAttempt) -> Result<()> {
        let mut slots = match self.read_slots() {
            Ok(slots) => slots,
            Err(e) if e.downcast_ref::<StoreError>().is_some() => {
                tracing::warn!("{e}; starting a fresh store");
                SlotMap::new()
            }
            Err(e) => return Err(e),
        };
        slots.insert(key.to_string(), attempt.clone());
        self.write_slots(&slots)?;
        tracing::debug!(key, path = %self.path.display(), "slot saved");
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        let mut slots = self.read_slots()?;
        if slots.remove(key).is_some() {
            self.write_slots(&slots)?;
            tracing::debug!(key, path = %self.path.display(), "slot cleared");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("attempt.json"));
        assert!(store.load("k").unwrap().is_none());
        store.clear("k").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested/dir/attempt.json"));
        store.save("k", &SavedAttempt::new("<p>one</p>", "html")).unwrap();
        store.save("k", &SavedAttempt::new("<p>two</p>", "html")).unwrap();
        store.save("other", &SavedAttempt::new("body{}", "css")).unwrap();

        let reopened = FileStore::new(store.path());
        let saved = reopened.load("k").unwrap().unwrap();
        assert_eq!(saved.document_text, "<p>two</p>");
        assert_eq!(saved.category_tag, "html");

        reopened.clear("k").unwrap();
        assert!(store.load("k").unwrap().is_none());
        assert!(store.load("other").unwrap().is_some());
    }

    #[test]
    fn corrupt_file_fails_load_but_save_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attempt.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = FileStore::new(&path);

        let err = store.load("k").unwrap_err();
        assert!(err.to_string().contains("corrupt store file"));

        store.save("k", &SavedAttempt::new("x", "html")).unwrap();
        assert_eq!(store.load("k").unwrap().unwrap().document_text, "x");
    }
}
