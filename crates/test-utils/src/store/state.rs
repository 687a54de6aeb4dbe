use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;

/// In-memory key-value store.
#[derive(Default, Clone, Debug)]
pub struct Store {
    store: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn put(&self, key: &str, state: Vec<u8>) -> anyhow::Result<()> {
        self.store.lock().map_err(|_| anyhow!("store poisoned"))?.insert(key.to_string(), state);
        Ok(())
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.store.lock().map_err(|_| anyhow!("store poisoned"))?.get(key).cloned())
    }

    pub fn purge(&self, key: &str) -> anyhow::Result<()> {
        self.store.lock().map_err(|_| anyhow!("store poisoned"))?.remove(key);
        Ok(())
    }

    /// Raw bytes stored under `key`, for assertions.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.store.lock().expect("should lock").get(key).cloned()
    }

    /// Returns `true` when nothing has been stored.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.lock().expect("should lock").is_empty()
    }
}
