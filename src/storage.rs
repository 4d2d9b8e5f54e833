//! Storage traits used by the persistence middleware.
//!
//! Two levels:
//! - [`StateStorage`]: raw text medium keyed by item name (`get_item`,
//!   `set_item`, `remove_item`).
//! - [`PersistStorage`]: the same operations on the [`StorageValue`]
//!   envelope. [`JsonStorage`] adapts the first to the second.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::value::{Record, Value};

/// Maximum item name length in bytes.
pub const MAX_NAME_LENGTH: usize = 1024;

/// Validate that an item name is well-formed.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidName("name cannot be empty".to_string()));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(StoreError::InvalidName(format!(
            "name exceeds maximum length of {} bytes",
            MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

/// A text storage medium.
///
/// Implementations may complete immediately or after I/O; callers always
/// await.
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Read an item. Returns `None` if it does not exist.
    async fn get_item(&self, name: &str) -> Result<Option<String>>;

    /// Write an item, replacing any previous value.
    async fn set_item(&self, name: &str, value: String) -> Result<()>;

    /// Remove an item. Removing a missing item is not an error.
    async fn remove_item(&self, name: &str) -> Result<()>;

    /// Check if an item exists.
    async fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.get_item(name).await?.is_some())
    }
}

/// The persisted envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageValue {
    pub state: Value,
    /// Any number is kept as written so a mismatch can be detected.
    pub version: Option<f64>,
}

impl StorageValue {
    pub fn new(state: Value, version: Option<f64>) -> Self {
        Self { state, version }
    }

    /// Read an envelope out of a parsed document.
    ///
    /// A version that is not a number is ignored.
    pub fn from_value(value: &Value) -> Self {
        let state = value.get("state").cloned().unwrap_or_default();
        let version = value.get("version").and_then(Value::as_f64);
        Self { state, version }
    }

    pub fn to_value(&self) -> Value {
        let mut record = Record::new();
        record.insert("state".to_string(), self.state.clone());
        if let Some(version) = self.version {
            record.insert("version".to_string(), Value::from(version));
        }
        Value::from(record)
    }
}

/// Envelope-level storage consumed by the persistence middleware.
#[async_trait]
pub trait PersistStorage: Send + Sync {
    async fn get_item(&self, name: &str) -> Result<Option<StorageValue>>;

    async fn set_item(&self, name: &str, value: StorageValue) -> Result<()>;

    async fn remove_item(&self, name: &str) -> Result<()>;
}

/// Transforms each `(key, value)` pair while serializing.
pub type Replacer = Arc<dyn Fn(&str, Value) -> Value + Send + Sync>;

/// Transforms each `(key, value)` pair while parsing.
pub type Reviver = Arc<dyn Fn(&str, Value) -> Value + Send + Sync>;

/// Serialization hooks for [`JsonStorage`].
#[derive(Clone, Default)]
pub struct JsonStorageOptions {
    pub replacer: Option<Replacer>,
    pub reviver: Option<Reviver>,
}

impl JsonStorageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replacer<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Value) -> Value + Send + Sync + 'static,
    {
        self.replacer = Some(Arc::new(f));
        self
    }

    pub fn reviver<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Value) -> Value + Send + Sync + 'static,
    {
        self.reviver = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for JsonStorageOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonStorageOptions")
            .field("replacer", &self.replacer.is_some())
            .field("reviver", &self.reviver.is_some())
            .finish()
    }
}

/// JSON text adapter over a [`StateStorage`].
pub struct JsonStorage {
    storage: Arc<dyn StateStorage>,
    options: JsonStorageOptions,
}

impl JsonStorage {
    pub fn new(storage: Arc<dyn StateStorage>, options: JsonStorageOptions) -> Self {
        Self { storage, options }
    }

    fn parse(&self, text: &str) -> Result<Value> {
        let parsed: serde_json::Value = serde_json::from_str(text)?;
        let value = Value::from(parsed);
        Ok(match &self.options.reviver {
            Some(reviver) => revive("", value, reviver),
            None => value,
        })
    }

    fn stringify(&self, value: Value) -> Result<String> {
        let value = match &self.options.replacer {
            Some(replacer) => replace("", value, replacer),
            None => value,
        };
        Ok(serde_json::to_string(&value)?)
    }
}

/// Children first, then the holder, like `JSON.parse` with a reviver.
fn revive(key: &str, value: Value, reviver: &Reviver) -> Value {
    let value = match value {
        Value::Record(record) => {
            let revived: Record = record
                .iter()
                .map(|(k, v)| (k.clone(), revive(k, v.clone(), reviver)))
                .collect();
            Value::from(revived)
        }
        Value::Sequence(items) => Value::sequence(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| revive(&i.to_string(), v.clone(), reviver)),
        ),
        other => other,
    };
    reviver(key, value)
}

/// The holder first, then its children, like `JSON.stringify` with a
/// replacer.
fn replace(key: &str, value: Value, replacer: &Replacer) -> Value {
    match replacer(key, value) {
        Value::Record(record) => {
            let replaced: Record = record
                .iter()
                .map(|(k, v)| (k.clone(), replace(k, v.clone(), replacer)))
                .collect();
            Value::from(replaced)
        }
        Value::Sequence(items) => Value::sequence(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| replace(&i.to_string(), v.clone(), replacer)),
        ),
        other => other,
    }
}

#[async_trait]
impl PersistStorage for JsonStorage {
    async fn get_item(&self, name: &str) -> Result<Option<StorageValue>> {
        let Some(text) = self.storage.get_item(name).await? else {
            return Ok(None);
        };
        let parsed = self.parse(&text)?;
        if parsed.is_null() {
            return Ok(None);
        }
        Ok(Some(StorageValue::from_value(&parsed)))
    }

    async fn set_item(&self, name: &str, value: StorageValue) -> Result<()> {
        let text = self.stringify(value.to_value())?;
        self.storage.set_item(name, text).await
    }

    async fn remove_item(&self, name: &str) -> Result<()> {
        self.storage.remove_item(name).await
    }
}

/// Build a [`JsonStorage`] over the medium returned by `get_storage`.
///
/// Returns `None` when the medium cannot be resolved, which puts the
/// persistence middleware in pass-through mode.
pub fn create_json_storage<F>(
    get_storage: F,
    options: JsonStorageOptions,
) -> Option<Arc<dyn PersistStorage>>
where
    F: FnOnce() -> Result<Arc<dyn StateStorage>>,
{
    match get_storage() {
        Ok(storage) => Some(Arc::new(JsonStorage::new(storage, options))),
        Err(e) => {
            debug!("Storage unavailable: {}", e);
            None
        }
    }
}
