//! In-memory autosave store for tests and one-shot sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::Result;

use proctor_core::model::SavedAttempt;
use proctor_core::traits::AttemptStore;

use crate::error::StoreError;

/// Autosave slots held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, SavedAttempt>>,
    /// Number of successful saves.
    save_count: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose slot `key` already holds `attempt`.
    pub fn with_slot(key: &str, attempt: SavedAttempt) -> Self {
        let store = Self::default();
        if let Ok(mut slots) = store.slots.lock() {
            slots.insert(key.to_string(), attempt);
        }
        store
    }

    /// Get the number of saves made to this store.
    pub fn save_count(&self) -> u32 {
        self.save_count.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AttemptStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<SavedAttempt>> {
        let slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn save(&self, key: &str, attempt: &SavedAttempt) -> Result<()> {
        let mut slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        slots.insert(key.to_string(), attempt.clone());
        self.save_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        let mut slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        slots.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let store = MemoryStore::new();
        store.save("k", &SavedAttempt::new("a", "html")).unwrap();
        store.save("k", &SavedAttempt::new("b", "html")).unwrap();
        assert_eq!(store.load("k").unwrap().unwrap().document_text, "b");
        assert_eq!(store.save_count(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_missing_key_is_ok() {
        let store = MemoryStore::with_slot("k", SavedAttempt::new("a", "html"));
        store.clear("missing").unwrap();
        store.clear("k").unwrap();
        assert!(store.is_empty());
    }
}
