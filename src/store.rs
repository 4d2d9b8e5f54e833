//! The store: one state value, its listeners, and the entry points
//! middleware may patch.
//!
//! - `set_state(update, replace)` computes the next value, merges or
//!   replaces, and notifies every listener synchronously.
//! - `get_state()` returns the current value (an `Arc` clone).
//! - `get_initial_state()` returns the value produced by the initializer.
//! - `subscribe(listener)` registers a `(next, previous)` callback.
//!
//! No lock is held while a listener runs, so a listener may call
//! `set_state` again; the nested notification pass completes before the
//! outer one continues.

use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::middleware::selector::{SelectorOptions, SelectorSubscription};
use crate::middleware::{StateCreator, StoreMutator};
use crate::persist::PersistApi;
use crate::value::Value;

/// Callback invoked with `(next, previous)` after every state change.
pub type Listener = Arc<dyn Fn(&Value, &Value) + Send + Sync>;

/// Native or patched `subscribe` entry point.
pub type SubscribeFn = Arc<dyn Fn(Listener) -> Unsubscribe + Send + Sync>;

/// Selector-aware `subscribe` entry point, installed by
/// [`SubscribeWithSelector`](crate::middleware::SubscribeWithSelector).
pub type SelectFn = Arc<dyn Fn(SelectorSubscription) -> Unsubscribe + Send + Sync>;

/// The argument of `set_state`.
pub enum Update {
    /// A direct next value.
    Value(Value),
    /// A functional updater computing the next value from the current one.
    Apply(Box<dyn FnOnce(&Value) -> Value + Send>),
    /// A draft recipe mutating a copy of the current value.
    Mutate(Box<dyn FnOnce(&mut Value) + Send>),
}

impl Update {
    pub fn apply<F>(f: F) -> Self
    where
        F: FnOnce(&Value) -> Value + Send + 'static,
    {
        Update::Apply(Box::new(f))
    }

    pub fn mutate<F>(f: F) -> Self
    where
        F: FnOnce(&mut Value) + Send + 'static,
    {
        Update::Mutate(Box::new(f))
    }

    /// Compute the next value against `current`.
    ///
    /// Draft recipes run on a copy-on-write clone, so a recipe that
    /// changes nothing yields a value identical to `current`.
    pub fn resolve(self, current: &Value) -> Value {
        match self {
            Update::Value(value) => value,
            Update::Apply(f) => f(current),
            Update::Mutate(recipe) => {
                let mut draft = current.clone();
                recipe(&mut draft);
                draft
            }
        }
    }
}

impl From<Value> for Update {
    fn from(value: Value) -> Self {
        Update::Value(value)
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Update::Apply(_) => f.write_str("Apply(..)"),
            Update::Mutate(_) => f.write_str("Mutate(..)"),
        }
    }
}

/// Cloneable handle over a `set_state` function.
#[derive(Clone)]
pub struct Setter(Arc<dyn Fn(Update, Option<bool>) + Send + Sync>);

impl Setter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Update, Option<bool>) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Apply an update. `replace` of `None` merges object-like values and
    /// replaces everything else.
    pub fn call(&self, update: Update, replace: Option<bool>) {
        (self.0)(update, replace)
    }

    /// Merge (or, for scalars, replace) with a direct value.
    pub fn set(&self, value: impl Into<Value>) {
        self.call(Update::Value(value.into()), None)
    }

    /// Replace the whole state.
    pub fn replace(&self, value: impl Into<Value>) {
        self.call(Update::Value(value.into()), Some(true))
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&Value) -> Value + Send + 'static,
    {
        self.call(Update::apply(f), None)
    }

    pub fn mutate<F>(&self, recipe: F)
    where
        F: FnOnce(&mut Value) + Send + 'static,
    {
        self.call(Update::mutate(recipe), None)
    }
}

impl fmt::Debug for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Setter")
    }
}

/// Cloneable handle over a state reader.
#[derive(Clone)]
pub struct Getter(Arc<dyn Fn() -> Value + Send + Sync>);

impl Getter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn get(&self) -> Value {
        (self.0)()
    }
}

impl fmt::Debug for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Getter")
    }
}

/// Handle returned by every subscription. Calling
/// [`unsubscribe`](Self::unsubscribe) more than once is harmless.
/// Dropping the handle does not unsubscribe.
#[derive(Clone)]
pub struct Unsubscribe(Arc<dyn Fn() + Send + Sync>);

impl Unsubscribe {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn unsubscribe(&self) {
        (self.0)()
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unsubscribe")
    }
}

/// Unique handle of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub(crate) u64);

/// The state cell and its listeners.
pub(crate) struct Core {
    state: RwLock<Value>,
    initial: RwLock<Value>,
    listeners: RwLock<BTreeMap<ListenerId, Listener>>,
    next_id: AtomicU64,
}

impl Core {
    fn new() -> Self {
        Self {
            state: RwLock::new(Value::Null),
            initial: RwLock::new(Value::Null),
            listeners: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn get_state(&self) -> Value {
        self.state.read().clone()
    }

    fn set_state(&self, update: Update, replace: Option<bool>) {
        let next = update.resolve(&self.get_state());

        let (state, previous) = {
            let mut state = self.state.write();
            if next.is(&state) {
                return;
            }
            let replace = replace.unwrap_or(!next.is_object_like());
            let new_state = if replace {
                next
            } else {
                Value::assign(&state, &next)
            };
            let previous = std::mem::replace(&mut *state, new_state.clone());
            (new_state, previous)
        };

        // Snapshot so listeners can subscribe or unsubscribe while notified.
        let listeners: Vec<Listener> = self.listeners.read().values().cloned().collect();
        for listener in listeners {
            listener(&state, &previous);
        }
    }

    fn subscribe(self: &Arc<Self>, listener: Listener) -> Unsubscribe {
        let id = {
            let mut listeners = self.listeners.write();
            match listeners
                .iter()
                .find(|(_, existing)| Arc::ptr_eq(existing, &listener))
            {
                Some((id, _)) => *id,
                None => {
                    let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
                    listeners.insert(id, listener);
                    id
                }
            }
        };

        let core = Arc::downgrade(self);
        Unsubscribe::new(move || {
            if let Some(core) = core.upgrade() {
                core.listeners.write().remove(&id);
            }
        })
    }

    fn install_initial(&self, value: Value) {
        *self.state.write() = value.clone();
        *self.initial.write() = value;
    }
}

/// Entry points exposed through [`StoreApi`]; middleware replaces them
/// while the store is being built.
struct EntryPoints {
    set_state: Setter,
    get_initial_state: Getter,
    subscribe: SubscribeFn,
    select: Option<SelectFn>,
    persist: Option<PersistApi>,
}

/// Handle to a store. Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct StoreApi {
    core: Arc<Core>,
    entry: Arc<RwLock<EntryPoints>>,
    pending: Arc<Mutex<Option<Vec<Box<dyn FnOnce() + Send>>>>>,
}

impl StoreApi {
    fn new() -> Self {
        let core = Arc::new(Core::new());

        let set_core = core.clone();
        let initial_core = core.clone();
        let subscribe_core = core.clone();

        let entry = EntryPoints {
            set_state: Setter::new(move |update, replace| set_core.set_state(update, replace)),
            get_initial_state: Getter::new(move || initial_core.initial.read().clone()),
            subscribe: Arc::new(move |listener: Listener| subscribe_core.subscribe(listener)),
            select: None,
            persist: None,
        };

        Self {
            core,
            entry: Arc::new(RwLock::new(entry)),
            pending: Arc::new(Mutex::new(Some(Vec::new()))),
        }
    }

    /// Start a builder to layer middleware before supplying the initializer.
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Apply an update through the (possibly patched) `set_state`.
    pub fn set_state(&self, update: impl Into<Update>, replace: Option<bool>) {
        self.setter().call(update.into(), replace)
    }

    /// Merge (or, for scalars, replace) with a direct value.
    pub fn set(&self, value: impl Into<Value>) {
        self.setter().set(value)
    }

    /// Replace the whole state.
    pub fn replace(&self, value: impl Into<Value>) {
        self.setter().replace(value)
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&Value) -> Value + Send + 'static,
    {
        self.setter().update(f)
    }

    pub fn mutate<F>(&self, recipe: F)
    where
        F: FnOnce(&mut Value) + Send + 'static,
    {
        self.setter().mutate(recipe)
    }

    pub fn get_state(&self) -> Value {
        self.core.get_state()
    }

    pub fn get_initial_state(&self) -> Value {
        let getter = self.entry.read().get_initial_state.clone();
        getter.get()
    }

    /// Register a listener for every state change.
    pub fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&Value, &Value) + Send + Sync + 'static,
    {
        self.subscribe_listener(Arc::new(listener))
    }

    /// Register a shared listener. Registering the same `Arc` twice keeps
    /// a single registration.
    pub fn subscribe_listener(&self, listener: Listener) -> Unsubscribe {
        let subscribe = self.entry.read().subscribe.clone();
        subscribe(listener)
    }

    /// Register a listener on a derived slice of the state.
    ///
    /// Requires [`SubscribeWithSelector`](crate::middleware::SubscribeWithSelector).
    pub fn subscribe_with_selector<S, L>(
        &self,
        selector: S,
        listener: L,
        options: SelectorOptions,
    ) -> Result<Unsubscribe>
    where
        S: Fn(&Value) -> Value + Send + Sync + 'static,
        L: Fn(&Value, &Value) + Send + Sync + 'static,
    {
        let select = self
            .entry
            .read()
            .select
            .clone()
            .ok_or(StoreError::MiddlewareMissing("subscribe_with_selector"))?;

        Ok(select(SelectorSubscription {
            selector: Arc::new(selector),
            listener: Arc::new(listener),
            options,
        }))
    }

    /// Persistence controls, if the store was built with
    /// [`Persist`](crate::persist::Persist) and a usable storage.
    pub fn persist(&self) -> Option<PersistApi> {
        self.entry.read().persist.clone()
    }

    /// Remove every listener. The state stays readable and writable.
    pub fn destroy(&self) {
        self.core.listeners.write().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.core.listeners.read().len()
    }

    /// The current exposed `set_state`.
    pub fn setter(&self) -> Setter {
        self.entry.read().set_state.clone()
    }

    /// A reader of the current state.
    pub fn getter(&self) -> Getter {
        let core = self.core.clone();
        Getter::new(move || core.get_state())
    }

    /// The current exposed `subscribe`.
    pub fn subscriber(&self) -> SubscribeFn {
        self.entry.read().subscribe.clone()
    }

    fn native_setter(&self) -> Setter {
        let core = self.core.clone();
        Setter::new(move |update, replace| core.set_state(update, replace))
    }

    /// Replace the exposed `set_state`; `patch` receives the current one.
    pub fn patch_set_state(&self, patch: impl FnOnce(Setter) -> Setter) {
        let patched = patch(self.setter());
        self.entry.write().set_state = patched;
    }

    /// Replace the exposed `get_initial_state`.
    pub fn patch_get_initial_state(&self, getter: Getter) {
        self.entry.write().get_initial_state = getter;
    }

    /// Replace the exposed `subscribe`; `patch` receives the current one.
    pub fn patch_subscribe(&self, patch: impl FnOnce(SubscribeFn) -> SubscribeFn) {
        let patched = patch(self.subscriber());
        self.entry.write().subscribe = patched;
    }

    /// Install the selector-aware `subscribe`.
    pub fn install_selector(&self, select: SelectFn) {
        self.entry.write().select = Some(select);
    }

    pub(crate) fn install_persist(&self, persist: PersistApi) {
        self.entry.write().persist = Some(persist);
    }

    /// Queue work to run once the initial state is installed.
    ///
    /// Outside of construction the task runs immediately.
    pub fn after_init<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.pending.lock();
        match pending.as_mut() {
            Some(tasks) => tasks.push(Box::new(task)),
            None => {
                drop(pending);
                task();
            }
        }
    }
}

impl fmt::Debug for StoreApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreApi")
            .field("state", &self.get_state())
            .field("listeners", &self.listener_count())
            .field("persist", &self.persist().is_some())
            .finish()
    }
}

/// Builds a store from an ordered list of middleware layers.
///
/// The first layer added is the outermost: it sees the native `set_state`
/// and wraps everything added after it.
#[derive(Default)]
pub struct StoreBuilder {
    layers: Vec<Box<dyn StoreMutator>>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    pub fn layer(mut self, mutator: impl StoreMutator + 'static) -> Self {
        self.layers.push(Box::new(mutator));
        self
    }

    /// Supply the state logic and construct the store.
    pub fn build<F>(self, initializer: F) -> StoreApi
    where
        F: FnOnce(Setter, Getter, &StoreApi) -> Value + 'static,
    {
        let creator: StateCreator = Box::new(initializer);
        let creator = self
            .layers
            .into_iter()
            .rev()
            .fold(creator, |inner, layer| layer.wrap(inner));

        let api = StoreApi::new();
        let initial = creator(api.native_setter(), api.getter(), &api);
        api.core.install_initial(initial);

        let tasks = api.pending.lock().take().unwrap_or_default();
        for task in tasks {
            task();
        }
        api
    }
}

/// Start a store whose middleware is layered before the initializer is
/// supplied.
pub fn create_with() -> StoreBuilder {
    StoreBuilder::new()
}

/// Create a store without middleware.
pub fn create<F>(initializer: F) -> StoreApi
where
    F: FnOnce(Setter, Getter, &StoreApi) -> Value + 'static,
{
    StoreBuilder::new().build(initializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_store() -> StoreApi {
        create(|_set, _get, _api| Value::record([("count", Value::from(0)), ("other", "a".into())]))
    }

    fn counting_listener(store: &StoreApi) -> (Arc<AtomicUsize>, Unsubscribe) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_c = calls.clone();
        let unsubscribe = store.subscribe(move |_next, _previous| {
            calls_c.fetch_add(1, Ordering::SeqCst);
        });
        (calls, unsubscribe)
    }

    // ========================================================================
    // set_state
    // ========================================================================

    #[test]
    fn test_set_scalar_replaces_state() {
        let store = create(|_set, _get, _api| Value::from(1));
        store.set(5);
        assert!(store.get_state().is(&Value::from(5)));

        store.set("text");
        assert_eq!(store.get_state(), Value::from("text"));

        store.set(Value::Null);
        assert!(store.get_state().is_null());
    }

    #[test]
    fn test_set_record_merges_one_level() {
        let store = create(|_set, _get, _api| {
            Value::record([
                ("a", Value::from(1)),
                ("nested", Value::record([("x", 1), ("y", 2)])),
            ])
        });

        store.set(Value::record([("b", Value::from(2)), ("nested", Value::record([("x", 9)]))]));

        let state = store.get_state();
        assert_eq!(state.get("a"), Some(&Value::from(1)));
        assert_eq!(state.get("b"), Some(&Value::from(2)));
        // Nested records are replaced wholesale.
        assert_eq!(state.get("nested"), Some(&Value::record([("x", 9)])));
    }

    #[test]
    fn test_explicit_replace_drops_missing_keys() {
        let store = counter_store();
        store.replace(Value::record([("count", 7)]));
        assert_eq!(store.get_state(), Value::record([("count", 7)]));

        store.set_state(Value::record([("z", 1)]), Some(false));
        assert_eq!(store.get_state(), Value::record([("count", 7), ("z", 1)]));
    }

    #[test]
    fn test_explicit_merge_of_scalar_yields_copy_of_record() {
        let store = counter_store();
        let before = store.get_state();
        store.set_state(Value::from(3), Some(false));

        let after = store.get_state();
        assert!(!after.is(&before));
        assert_eq!(after, before);
    }

    #[test]
    fn test_identical_value_is_a_no_op() {
        let store = counter_store();
        let (calls, _unsub) = counting_listener(&store);

        store.set(store.get_state());
        store.update(|state| state.clone());
        store.mutate(|_draft| {});

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_functional_update_sees_current_state() {
        let store = counter_store();
        store.update(|state| {
            let count = state.get("count").and_then(Value::as_i64).unwrap_or(0);
            Value::record([("count", count + 1)])
        });
        store.update(|state| {
            let count = state.get("count").and_then(Value::as_i64).unwrap_or(0);
            Value::record([("count", count + 1)])
        });

        assert_eq!(store.get_state().get("count"), Some(&Value::from(2)));
        assert_eq!(store.get_state().get("other"), Some(&Value::from("a")));
    }

    #[test]
    fn test_mutate_applies_recipe_to_draft() {
        let store = counter_store();
        let before = store.get_state();
        store.mutate(|draft| {
            draft.insert("count", 10);
        });

        assert_eq!(store.get_state().get("count"), Some(&Value::from(10)));
        assert_eq!(before.get("count"), Some(&Value::from(0)));
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    #[test]
    fn test_listener_receives_next_and_previous() {
        let store = counter_store();
        let seen = Arc::new(Mutex::new(Vec::<(Value, Value)>::new()));
        let seen_c = seen.clone();
        store.subscribe(move |next, previous| {
            seen_c.lock().push((next.clone(), previous.clone()));
        });

        let before = store.get_state();
        store.set(Value::record([("count", 1)]));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.is(&store.get_state()));
        assert!(seen[0].1.is(&before));
    }

    #[test]
    fn test_every_set_notifies_without_batching() {
        let store = counter_store();
        let (calls, _unsub) = counting_listener(&store);

        for i in 1..=3 {
            store.set(Value::record([("count", i)]));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let store = counter_store();
        let (calls, unsubscribe) = counting_listener(&store);
        let (other_calls, _keep) = counting_listener(&store);

        unsubscribe.unsubscribe();
        unsubscribe.unsubscribe();
        store.set(Value::record([("count", 1)]));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(other_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn test_same_listener_registers_once() {
        let store = counter_store();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_c = calls.clone();
        let listener: Listener = Arc::new(move |_next: &Value, _previous: &Value| {
            calls_c.fetch_add(1, Ordering::SeqCst);
        });

        let first = store.subscribe_listener(listener.clone());
        let _second = store.subscribe_listener(listener);
        store.set(Value::record([("count", 1)]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        first.unsubscribe();
        store.set(Value::record([("count", 2)]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_set_state_reentrantly() {
        let store = counter_store();
        let inner = store.clone();
        store.subscribe(move |next, _previous| {
            let count = next.get("count").and_then(Value::as_i64).unwrap_or(0);
            if count < 3 {
                inner.set(Value::record([("count", count + 1)]));
            }
        });

        store.set(Value::record([("count", 1)]));
        assert_eq!(store.get_state().get("count"), Some(&Value::from(3)));
    }

    #[test]
    fn test_destroy_removes_every_listener() {
        let store = counter_store();
        let (calls, _a) = counting_listener(&store);
        let (_other, _b) = counting_listener(&store);

        store.destroy();
        store.set(Value::record([("count", 1)]));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.listener_count(), 0);
    }

    // ========================================================================
    // Construction
    // ========================================================================

    #[test]
    fn test_initial_state_is_stable() {
        let store = counter_store();
        let initial = store.get_initial_state();

        store.set(Value::record([("count", 5)]));
        assert!(store.get_initial_state().is(&initial));
        assert_eq!(initial.get("count"), Some(&Value::from(0)));
    }

    #[test]
    fn test_initializer_result_wins_over_sets_during_init() {
        let store = create(|set, get, _api| {
            set.set(Value::record([("during", true)]));
            assert_eq!(get.get().get("during"), Some(&Value::from(true)));
            Value::record([("count", 0)])
        });

        assert_eq!(store.get_state(), Value::record([("count", 0)]));
    }

    #[test]
    fn test_initializer_setter_drives_later_updates() {
        let captured = Arc::new(Mutex::new(None::<Setter>));
        let captured_c = captured.clone();
        let store = create(move |set, _get, _api| {
            *captured_c.lock() = Some(set);
            Value::record([("count", 0)])
        });

        let set = captured.lock().clone().unwrap();
        set.set(Value::record([("count", 4)]));
        assert_eq!(store.get_state().get("count"), Some(&Value::from(4)));
    }

    #[test]
    fn test_builder_is_the_curried_form() {
        let make = create_with();
        let store = make.build(|_set, _get, _api| Value::from("ready"));
        assert_eq!(store.get_state(), Value::from("ready"));
    }

    #[test]
    fn test_after_init_runs_once_state_is_installed() {
        let seen = Arc::new(Mutex::new(None::<Value>));
        let seen_c = seen.clone();
        let store = create(move |_set, _get, api| {
            let api_c = api.clone();
            api.after_init(move || {
                *seen_c.lock() = Some(api_c.get_state());
            });
            Value::from(42)
        });

        assert_eq!(*seen.lock(), Some(Value::from(42)));

        // Once built, tasks run immediately.
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_c = ran.clone();
        store.after_init(move || {
            ran_c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_selector_subscription_requires_middleware() {
        let store = counter_store();
        let result = store.subscribe_with_selector(
            |state| state.get("count").cloned().unwrap_or_default(),
            |_next, _previous| {},
            SelectorOptions::default(),
        );
        assert!(matches!(result, Err(StoreError::MiddlewareMissing(_))));
        assert!(store.persist().is_none());
    }

    #[test]
    fn test_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StoreApi>();
        assert_send_sync::<Setter>();
        assert_send_sync::<Unsubscribe>();
    }
}
