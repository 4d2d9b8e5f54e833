//! Draft-based updates.
//!
//! With [`ProduceLayer`] installed, every functional update is handed to
//! a [`Produce`] implementation, which applies it to a draft of the
//! current state and returns the next immutable value. An
//! [`Update::Apply`] updater becomes a recipe that overwrites the draft
//! with its result. Direct values pass through untouched.

use std::sync::Arc;

use crate::middleware::{StateCreator, StoreMutator};
use crate::store::{Getter, Setter, StoreApi, Update};
use crate::value::Value;

/// A draft recipe.
pub type Recipe = Box<dyn FnOnce(&mut Value) + Send>;

/// Turns a base value and a recipe into the next value.
///
/// Sees both [`Update::Mutate`] recipes and [`Update::Apply`] updaters.
///
/// Implementations must leave `base` untouched and should share every
/// child the recipe did not modify.
pub trait Produce: Send + Sync {
    fn produce(&self, base: &Value, recipe: Recipe) -> Value;
}

/// Copy-on-write producer.
///
/// The draft is an `Arc` clone of the base. Only the containers on the
/// path to a modified child are copied, so untouched subtrees stay
/// identical and a recipe that changes nothing returns the base itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyOnWrite;

impl Produce for CopyOnWrite {
    fn produce(&self, base: &Value, recipe: Recipe) -> Value {
        let mut draft = base.clone();
        recipe(&mut draft);
        draft
    }
}

/// Routes functional updates through a producer.
pub struct ProduceLayer<P> {
    producer: Arc<P>,
}

impl<P: Produce> ProduceLayer<P> {
    pub fn new(producer: P) -> Self {
        Self {
            producer: Arc::new(producer),
        }
    }
}

impl Default for ProduceLayer<CopyOnWrite> {
    fn default() -> Self {
        Self::new(CopyOnWrite)
    }
}

/// A [`ProduceLayer`] using [`CopyOnWrite`].
pub fn produce() -> ProduceLayer<CopyOnWrite> {
    ProduceLayer::default()
}

fn producing_setter<P: Produce + 'static>(producer: Arc<P>, set: Setter) -> Setter {
    Setter::new(move |update, replace| {
        let update = match update {
            Update::Mutate(recipe) => {
                let producer = producer.clone();
                Update::apply(move |state: &Value| producer.produce(state, recipe))
            }
            Update::Apply(f) => {
                let producer = producer.clone();
                let recipe: Recipe = Box::new(move |draft: &mut Value| {
                    let next = f(&*draft);
                    *draft = next;
                });
                Update::apply(move |state: &Value| producer.produce(state, recipe))
            }
            other => other,
        };
        set.call(update, replace)
    })
}

impl<P: Produce + 'static> StoreMutator for ProduceLayer<P> {
    fn wrap(self: Box<Self>, inner: StateCreator) -> StateCreator {
        let producer = self.producer;
        Box::new(move |set: Setter, get: Getter, api: &StoreApi| {
            let exposed = producer.clone();
            api.patch_set_state(move |previous| producing_setter(exposed, previous));
            inner(producing_setter(producer, set), get, api)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingProducer {
        calls: Arc<AtomicUsize>,
    }

    impl Produce for CountingProducer {
        fn produce(&self, base: &Value, recipe: Recipe) -> Value {
            self.calls.fetch_add(1, Ordering::SeqCst);
            CopyOnWrite.produce(base, recipe)
        }
    }

    fn todo_state() -> Value {
        Value::record([
            ("todos", Value::sequence([Value::record([("title", Value::from("write")), ("done", false.into())])])),
            ("filter", Value::record([("show", "all")])),
        ])
    }

    #[test]
    fn test_recipe_updates_nested_child() {
        let store = StoreApi::builder().layer(produce()).build(|_set, _get, _api| todo_state());
        let before = store.get_state();

        store.mutate(|draft| {
            if let Some(todos) = draft.get_mut("todos").and_then(Value::as_sequence_mut) {
                if let Some(first) = todos.get_mut(0) {
                    first.insert("done", true);
                }
            }
        });

        let after = store.get_state();
        let done = after
            .get("todos")
            .and_then(Value::as_sequence)
            .and_then(|t| t.first())
            .and_then(|t| t.get("done"))
            .cloned();
        assert_eq!(done, Some(Value::from(true)));

        // The base is untouched and unrelated children are shared.
        assert_eq!(before, todo_state());
        assert!(after.get("filter").unwrap().is(before.get("filter").unwrap()));
    }

    #[test]
    fn test_producer_sees_functional_updates() {
        let producer = CountingProducer::default();
        let calls = producer.calls.clone();
        let store = StoreApi::builder()
            .layer(ProduceLayer::new(producer))
            .build(|_set, _get, _api| Value::record([("count", 0), ("step", 1)]));

        store.set(Value::record([("count", 1)]));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        store.update(|state| {
            let count = state.get("count").and_then(Value::as_i64).unwrap_or(0);
            Value::record([("count", count + 1)])
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_state().get("count"), Some(&Value::from(2)));
        assert_eq!(store.get_state().get("step"), Some(&Value::from(1)));

        store.mutate(|draft| {
            draft.insert("count", 3);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.get_state().get("count"), Some(&Value::from(3)));
    }

    #[test]
    fn test_identity_updater_does_not_notify() {
        let store = StoreApi::builder().layer(produce()).build(|_set, _get, _api| todo_state());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_c = calls.clone();
        store.subscribe(move |_next, _previous| {
            calls_c.fetch_add(1, Ordering::SeqCst);
        });

        store.update(|state| state.clone());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_initializer_setter_produces() {
        let producer = CountingProducer::default();
        let calls = producer.calls.clone();
        let captured = Arc::new(parking_lot::Mutex::new(None::<Setter>));
        let captured_c = captured.clone();
        let store = StoreApi::builder()
            .layer(ProduceLayer::new(producer))
            .build(move |set, _get, _api| {
                *captured_c.lock() = Some(set);
                Value::record([("items", Value::sequence(Vec::<Value>::new()))])
            });

        let set = captured.lock().clone().unwrap();
        set.mutate(|draft| {
            if let Some(items) = draft.get_mut("items") {
                items.push("a");
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.get_state().get("items"),
            Some(&Value::sequence(["a"]))
        );
    }

    #[test]
    fn test_noop_recipe_does_not_notify() {
        let store = StoreApi::builder().layer(produce()).build(|_set, _get, _api| todo_state());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_c = calls.clone();
        store.subscribe(move |_next, _previous| {
            calls_c.fetch_add(1, Ordering::SeqCst);
        });

        store.mutate(|_draft| {});
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_recipe_replacing_scalar_state() {
        let store = StoreApi::builder().layer(produce()).build(|_set, _get, _api| Value::from(1));
        store.mutate(|draft| {
            let next = draft.as_i64().unwrap_or(0) + 1;
            *draft = Value::from(next);
        });
        assert_eq!(store.get_state(), Value::from(2));
    }
}
