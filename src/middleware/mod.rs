//! Store mutators.
//!
//! A mutator wraps the state constructor of the layer below it. When the
//! store is built, each layer runs from the outermost inwards: it receives
//! the setter handed down by its outer layer, may patch the entry points
//! on the [`StoreApi`], and decides which setter the inner layer sees.
//!
//! ```ignore
//! let store = StoreApi::builder()
//!     .layer(Persist::new(PersistOptions::new("todos")))
//!     .layer(ProduceLayer::default())
//!     .layer(SubscribeWithSelector)
//!     .build(|set, get, api| Value::record([("todos", Value::sequence(Vec::<Value>::new()))]));
//! ```

pub mod combine;
pub mod produce;
pub mod selector;

pub use combine::combine;
pub use produce::{CopyOnWrite, Produce, ProduceLayer, Recipe};
pub use selector::{EqualityFn, Selector, SelectorOptions, SelectorSubscription, SubscribeWithSelector};

use crate::store::{Getter, Setter, StoreApi};
use crate::value::Value;

/// A state constructor: receives the setter, a state reader and the store
/// handle, and returns the initial state.
pub type StateCreator = Box<dyn FnOnce(Setter, Getter, &StoreApi) -> Value>;

/// A middleware layer.
pub trait StoreMutator {
    /// Return the constructor that replaces `inner`.
    fn wrap(self: Box<Self>, inner: StateCreator) -> StateCreator;
}
