//! Selector-scoped subscriptions.
//!
//! The listener only fires when the selected slice changes according to
//! the equality function (reference identity by default), and receives
//! `(next_slice, previous_slice)`.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use crate::middleware::{StateCreator, StoreMutator};
use crate::store::{Getter, Listener, Setter, StoreApi, SubscribeFn, Unsubscribe};
use crate::value::Value;

/// Derives a slice from the full state.
pub type Selector = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Decides whether two slices are equal.
pub type EqualityFn = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// Options of a selector subscription.
#[derive(Clone, Default)]
pub struct SelectorOptions {
    /// Defaults to [`Value::is`].
    pub equality_fn: Option<EqualityFn>,
    /// Invoke the listener once at registration with `(slice, slice)`.
    pub fire_immediately: bool,
}

impl SelectorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equality_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.equality_fn = Some(Arc::new(f));
        self
    }

    pub fn fire_immediately(mut self, fire: bool) -> Self {
        self.fire_immediately = fire;
        self
    }
}

impl fmt::Debug for SelectorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorOptions")
            .field("equality_fn", &self.equality_fn.is_some())
            .field("fire_immediately", &self.fire_immediately)
            .finish()
    }
}

/// A selector subscription request.
pub struct SelectorSubscription {
    pub selector: Selector,
    pub listener: Listener,
    pub options: SelectorOptions,
}

/// Installs [`StoreApi::subscribe_with_selector`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscribeWithSelector;

impl StoreMutator for SubscribeWithSelector {
    fn wrap(self: Box<Self>, inner: StateCreator) -> StateCreator {
        Box::new(move |set: Setter, get: Getter, api: &StoreApi| {
            let subscribe = api.subscriber();
            let state = api.getter();
            api.install_selector(Arc::new(move |request: SelectorSubscription| {
                subscribe_selected(&subscribe, &state, request)
            }));
            inner(set, get, api)
        })
    }
}

fn subscribe_selected(
    subscribe: &SubscribeFn,
    state: &Getter,
    request: SelectorSubscription,
) -> Unsubscribe {
    let SelectorSubscription {
        selector,
        listener,
        options,
    } = request;

    let equality_fn: EqualityFn = match options.equality_fn {
        Some(f) => f,
        None => Arc::new(|a: &Value, b: &Value| a.is(b)),
    };

    let current = selector(&state.get());
    if options.fire_immediately {
        listener(&current, &current);
    }
    let slice = Mutex::new(current);

    subscribe(Arc::new(move |next_state: &Value, _previous: &Value| {
        let next = selector(next_state);
        let previous = {
            let mut slice = slice.lock();
            if equality_fn(&*slice, &next) {
                return;
            }
            std::mem::replace(&mut *slice, next.clone())
        };
        listener(&next, &previous);
    }))
}
