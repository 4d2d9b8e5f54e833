//! In-memory storage medium.
//!
//! Holds item text in a process-local map. Nothing survives a restart;
//! use [`SqliteStorage`](crate::sqlite::SqliteStorage) for that.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Result;
use crate::storage::{validate_name, StateStorage};

static SHARED: Lazy<Arc<MemoryStorage>> = Lazy::new(|| Arc::new(MemoryStorage::new()));

/// In-memory implementation of [`StateStorage`].
///
/// Clones share the same items.
#[derive(Clone)]
pub struct MemoryStorage {
    data: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    /// Create a new empty medium.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// The process-wide medium used when persistence options name no
    /// storage of their own.
    pub fn shared() -> Arc<MemoryStorage> {
        SHARED.clone()
    }

    /// Get the number of items.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Clear all items.
    pub fn clear(&self) {
        self.data.write().clear();
    }

    /// Item names in lexicographic order.
    pub fn names(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("items", &self.len())
            .finish()
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    async fn get_item(&self, name: &str) -> Result<Option<String>> {
        validate_name(name)?;
        Ok(self.data.read().get(name).cloned())
    }

    async fn set_item(&self, name: &str, value: String) -> Result<()> {
        validate_name(name)?;
        self.data.write().insert(name.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.data.write().remove(name);
        Ok(())
    }
}
