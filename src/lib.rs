//! # zustore
//!
//! A small observable state container with composable middleware.
//!
//! A store holds one [`Value`], replaces or shallow-merges it on every
//! update, and notifies subscribers synchronously with `(next, previous)`.
//! Middleware layered at construction adds:
//!
//! - **Selector subscriptions**: listeners that fire only when a derived
//!   slice changes ([`SubscribeWithSelector`])
//! - **Draft updates**: in-place-looking mutation recipes resolved by a
//!   pluggable producer ([`ProduceLayer`])
//! - **Persistence**: versioned save, migration and rehydration through
//!   an async storage medium ([`Persist`])
//!
//! ## Storage media
//!
//! - [`MemoryStorage`]: process-local map (default)
//! - [`SqliteStorage`]: embedded SQLite database, survives restarts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use zustore::{create, Value};
//!
//! let store = create(|_set, _get, _api| Value::record([("count", 0)]));
//!
//! let unsubscribe = store.subscribe(|next, previous| {
//!     println!("{} -> {}", previous, next);
//! });
//!
//! store.update(|state| {
//!     let count = state.get("count").and_then(Value::as_i64).unwrap_or(0);
//!     Value::record([("count", count + 1)])
//! });
//! unsubscribe.unsubscribe();
//! ```
//!
//! ## Persistence
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use zustore::{
//!     create_json_storage, create_with, JsonStorageOptions, Persist, PersistOptions,
//!     SqliteStorage, StateStorage, Value,
//! };
//!
//! #[tokio::main]
//! async fn main() -> zustore::Result<()> {
//!     let medium: Arc<dyn StateStorage> = Arc::new(SqliteStorage::open("state.db").await?);
//!
//!     let store = create_with()
//!         .layer(Persist::new(
//!             PersistOptions::new("todos")
//!                 .storage(create_json_storage(|| Ok(medium), JsonStorageOptions::default()))
//!                 .version(1),
//!         ))
//!         .build(|_set, _get, _api| Value::record([("todos", Value::sequence(Vec::<Value>::new()))]));
//!
//!     if let Some(persist) = store.persist() {
//!         persist.rehydrate().await;
//!     }
//!     store.mutate(|draft| {
//!         if let Some(todos) = draft.get_mut("todos") {
//!             todos.push("write docs");
//!         }
//!     });
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod middleware;
pub mod persist;
pub mod shallow;
pub mod sqlite;
pub mod storage;
pub mod store;
pub mod value;

// Re-export main types
pub use error::{Result, StoreError};
pub use memory::MemoryStorage;
pub use middleware::{
    combine, CopyOnWrite, Produce, ProduceLayer, SelectorOptions, StoreMutator, SubscribeWithSelector,
};
pub use persist::{HydrationStatus, Persist, PersistApi, PersistOptions, PostRehydrate};
pub use shallow::{shallow, use_shallow, ShallowMemo};
pub use sqlite::SqliteStorage;
pub use storage::{
    create_json_storage, JsonStorage, JsonStorageOptions, PersistStorage, StateStorage, StorageValue,
    MAX_NAME_LENGTH,
};
pub use store::{create, create_with, Getter, Listener, Setter, StoreApi, StoreBuilder, Unsubscribe, Update};
pub use value::{Key, Record, Value};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, StoreError};
    pub use crate::middleware::{ProduceLayer, SelectorOptions, SubscribeWithSelector};
    pub use crate::persist::{Persist, PersistOptions};
    pub use crate::shallow::shallow;
    pub use crate::storage::{PersistStorage, StateStorage};
    pub use crate::store::{create, create_with, StoreApi, Update};
    pub use crate::value::Value;
}
