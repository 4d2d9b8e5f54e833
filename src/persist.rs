//! Persistence middleware.
//!
//! [`Persist`] saves a projection of the state to a [`PersistStorage`]
//! after every update and restores it once the store is built. A
//! hydration pass:
//!
//! 1. notifies `on_hydrate` listeners and runs `on_rehydrate_storage`
//!    with the pre-hydration state,
//! 2. reads the stored envelope and migrates it when its version differs
//!    from the configured one,
//! 3. merges the loaded state over the current one and replaces the state
//!    with the result, saving it back if a migration ran,
//! 4. calls the post-rehydration callback and notifies
//!    `on_finish_hydration` listeners.
//!
//! Any failure in steps 2 to 4 goes to the post-rehydration callback and
//! does not set [`PersistApi::has_hydrated`]. A success from another pass
//! stays in effect.
//!
//! Saves and hydration run on the ambient Tokio runtime.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tracing::{debug, error, warn};

use crate::error::{Result, StoreError};
use crate::memory::MemoryStorage;
use crate::middleware::{StateCreator, StoreMutator};
use crate::storage::{create_json_storage, JsonStorageOptions, PersistStorage, StateStorage, StorageValue};
use crate::store::{Getter, ListenerId, Setter, StoreApi, Unsubscribe};
use crate::value::Value;

/// A result that may complete later.
pub type Deferred<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// Projects the state onto the part that gets saved.
pub type Partialize = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Upgrades persisted state from an older version.
pub type MigrateFn = Arc<dyn Fn(Value, u32) -> Deferred<Value> + Send + Sync>;

/// Combines `(persisted, current)` into the hydrated state.
pub type MergeFn = Arc<dyn Fn(Option<Value>, Value) -> Result<Value> + Send + Sync>;

/// Called once a hydration pass ends, with the merged state or the error.
pub type PostRehydrate = Box<dyn FnOnce(Option<&Value>, Option<&StoreError>) + Send>;

/// Called when a hydration pass starts; may return a [`PostRehydrate`].
pub type OnRehydrateStorage = Arc<dyn Fn(&Value) -> Option<PostRehydrate> + Send + Sync>;

/// Observer of hydration start or finish.
pub type HydrationListener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Persistence configuration.
#[derive(Clone)]
pub struct PersistOptions {
    /// Item name in the storage medium. Must be unique per store.
    pub name: String,
    /// `None` disables persistence and turns the middleware into a
    /// pass-through that warns on every update.
    pub storage: Option<Arc<dyn PersistStorage>>,
    pub partialize: Partialize,
    pub version: u32,
    pub migrate: Option<MigrateFn>,
    pub merge: MergeFn,
    pub on_rehydrate_storage: Option<OnRehydrateStorage>,
    /// Do not hydrate automatically after construction.
    pub skip_hydration: bool,
}

impl PersistOptions {
    /// Options saving under `name` to the process-wide
    /// [`MemoryStorage`] through a JSON adapter.
    pub fn new(name: impl Into<String>) -> Self {
        let storage = create_json_storage(
            || Ok(MemoryStorage::shared() as Arc<dyn StateStorage>),
            JsonStorageOptions::default(),
        );

        Self {
            name: name.into(),
            storage,
            partialize: Arc::new(|state: &Value| state.clone()),
            version: 0,
            migrate: None,
            merge: Arc::new(|persisted: Option<Value>, current: Value| {
                Ok(Value::assign(&current, &persisted.unwrap_or_default()))
            }),
            on_rehydrate_storage: None,
            skip_hydration: false,
        }
    }

    pub fn storage(mut self, storage: Option<Arc<dyn PersistStorage>>) -> Self {
        self.storage = storage;
        self
    }

    pub fn partialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.partialize = Arc::new(f);
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Synchronous migration hook.
    pub fn migrate<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, u32) -> Result<Value> + Send + Sync + 'static,
    {
        self.migrate = Some(Arc::new(move |state: Value, version: u32| -> Deferred<Value> {
            Box::pin(std::future::ready(f(state, version)))
        }));
        self
    }

    /// Asynchronous migration hook.
    pub fn migrate_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value, u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.migrate = Some(Arc::new(move |state: Value, version: u32| -> Deferred<Value> {
            Box::pin(f(state, version))
        }));
        self
    }

    pub fn merge<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<Value>, Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.merge = Arc::new(f);
        self
    }

    pub fn on_rehydrate_storage<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Option<PostRehydrate> + Send + Sync + 'static,
    {
        self.on_rehydrate_storage = Some(Arc::new(f));
        self
    }

    pub fn skip_hydration(mut self, skip: bool) -> Self {
        self.skip_hydration = skip;
        self
    }
}

impl fmt::Debug for PersistOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistOptions")
            .field("name", &self.name)
            .field("storage", &self.storage.is_some())
            .field("version", &self.version)
            .field("migrate", &self.migrate.is_some())
            .field("on_rehydrate_storage", &self.on_rehydrate_storage.is_some())
            .field("skip_hydration", &self.skip_hydration)
            .finish()
    }
}

/// Progress of the most recent hydration pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationStatus {
    Uninitialized,
    Hydrating,
    Hydrated,
    /// The last pass failed. A later `rehydrate` may still succeed.
    Failed,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Start,
    Finish,
}

/// Everything a hydration pass needs after its synchronous prologue.
struct HydrationPass {
    id: u64,
    name: String,
    storage: Arc<dyn PersistStorage>,
    version: u32,
    migrate: Option<MigrateFn>,
    merge: MergeFn,
    post: Option<PostRehydrate>,
}

struct PersistController {
    options: RwLock<PersistOptions>,
    storage: RwLock<Arc<dyn PersistStorage>>,
    /// The setter handed to this layer; hydration writes through it
    /// without triggering a save.
    set: Setter,
    get: Getter,
    config_result: RwLock<Value>,
    status: RwLock<HydrationStatus>,
    on_start: RwLock<BTreeMap<ListenerId, HydrationListener>>,
    on_finish: RwLock<BTreeMap<ListenerId, HydrationListener>>,
    next_id: AtomicU64,
    /// Id of the most recently started hydration pass.
    passes: AtomicU64,
}

impl PersistController {
    fn new(options: PersistOptions, storage: Arc<dyn PersistStorage>, set: Setter, get: Getter) -> Self {
        Self {
            options: RwLock::new(options),
            storage: RwLock::new(storage),
            set,
            get,
            config_result: RwLock::new(Value::Null),
            status: RwLock::new(HydrationStatus::Uninitialized),
            on_start: RwLock::new(BTreeMap::new()),
            on_finish: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            passes: AtomicU64::new(0),
        }
    }

    fn listeners(&self, phase: Phase) -> &RwLock<BTreeMap<ListenerId, HydrationListener>> {
        match phase {
            Phase::Start => &self.on_start,
            Phase::Finish => &self.on_finish,
        }
    }

    fn add_listener(self: &Arc<Self>, phase: Phase, listener: HydrationListener) -> Unsubscribe {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners(phase).write().insert(id, listener);

        let controller: Weak<Self> = Arc::downgrade(self);
        Unsubscribe::new(move || {
            if let Some(controller) = controller.upgrade() {
                controller.listeners(phase).write().remove(&id);
            }
        })
    }

    fn notify(&self, phase: Phase, state: &Value) {
        let listeners: Vec<HydrationListener> = self.listeners(phase).read().values().cloned().collect();
        for listener in listeners {
            listener(state);
        }
    }

    /// The current state, or the initializer result while the state is
    /// still unset.
    fn current_or_config(&self) -> Value {
        let state = self.get.get();
        if state.is_null() {
            self.config_result.read().clone()
        } else {
            state
        }
    }

    fn name(&self) -> String {
        self.options.read().name.clone()
    }

    /// The envelope for the current state, captured now.
    fn envelope(&self) -> (String, StorageValue) {
        let (name, partialize, version) = {
            let options = self.options.read();
            (options.name.clone(), options.partialize.clone(), options.version)
        };
        let state = partialize(&self.get.get());
        (name, StorageValue::new(state, Some(f64::from(version))))
    }

    async fn save(&self) -> Result<()> {
        let (name, envelope) = self.envelope();
        let storage = self.storage.read().clone();
        storage.set_item(&name, envelope).await
    }

    /// Fire-and-forget save of the current state.
    fn save_in_background(&self) {
        let (name, envelope) = self.envelope();
        let storage = self.storage.read().clone();

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = storage.set_item(&name, envelope).await {
                        warn!("Failed to persist '{}': {}", name, e);
                    }
                });
            }
            Err(_) => error!("{}; '{}' was not saved", StoreError::NoRuntime("persist"), name),
        }
    }

    /// Start a pass: mark it running, notify start listeners, and run the
    /// rehydrate hook.
    fn begin(&self) -> HydrationPass {
        let (name, version, migrate, merge, hook) = {
            let options = self.options.read();
            (
                options.name.clone(),
                options.version,
                options.migrate.clone(),
                options.merge.clone(),
                options.on_rehydrate_storage.clone(),
            )
        };
        let storage = self.storage.read().clone();

        let id = {
            let mut status = self.status.write();
            *status = HydrationStatus::Hydrating;
            self.passes.fetch_add(1, Ordering::SeqCst) + 1
        };
        debug!("Hydrating '{}' (pass {})", name, id);

        let snapshot = self.current_or_config();
        self.notify(Phase::Start, &snapshot);
        let post = hook.and_then(|hook| hook(&snapshot));

        HydrationPass {
            id,
            name,
            storage,
            version,
            migrate,
            merge,
            post,
        }
    }

    async fn finish(&self, pass: HydrationPass) {
        let HydrationPass {
            id,
            name,
            storage,
            version,
            migrate,
            merge,
            post,
        } = pass;

        match self.hydrate(&name, storage, version, migrate, merge).await {
            Ok(merged) => {
                if let Some(post) = post {
                    post(Some(&merged), None);
                }
                let state = self.get.get();
                *self.status.write() = HydrationStatus::Hydrated;
                debug!("Hydrated '{}'", name);
                self.notify(Phase::Finish, &state);
            }
            Err(e) => {
                {
                    // A newer pass or an earlier success owns the status.
                    let mut status = self.status.write();
                    if self.passes.load(Ordering::SeqCst) == id && *status != HydrationStatus::Hydrated {
                        *status = HydrationStatus::Failed;
                    }
                }
                warn!("Failed to hydrate '{}': {}", name, e);
                if let Some(post) = post {
                    post(None, Some(&e));
                }
            }
        }
    }

    async fn hydrate(
        &self,
        name: &str,
        storage: Arc<dyn PersistStorage>,
        version: u32,
        migrate: Option<MigrateFn>,
        merge: MergeFn,
    ) -> Result<Value> {
        let (migrated, loaded) = match storage.get_item(name).await? {
            Some(StorageValue {
                state,
                version: Some(stored),
            }) if stored != f64::from(version) => match (migrate, whole_version(stored)) {
                (Some(migrate), Some(from)) => (true, Some(migrate(state, from).await?)),
                (Some(_), None) => {
                    error!(
                        "State loaded from '{}' has version {} which no migration can start from; discarding it",
                        name, stored
                    );
                    (false, None)
                }
                (None, _) => {
                    error!(
                        "State loaded from '{}' has version {} but no migrate function is set; discarding it",
                        name, stored
                    );
                    (false, None)
                }
            },
            Some(envelope) => (false, Some(envelope.state)),
            None => (false, None),
        };

        let merged = merge(loaded, self.current_or_config())?;
        self.set.replace(merged.clone());

        if migrated {
            self.save().await?;
        }
        Ok(merged)
    }

    async fn rehydrate(&self) {
        let pass = self.begin();
        self.finish(pass).await;
    }

    /// Start a pass now and complete it on the ambient runtime.
    fn spawn_rehydrate(self: &Arc<Self>) {
        match Handle::try_current() {
            Ok(handle) => {
                let pass = self.begin();
                let controller = self.clone();
                handle.spawn(async move { controller.finish(pass).await });
            }
            Err(_) => error!(
                "{}; '{}' was not hydrated",
                StoreError::NoRuntime("hydration"),
                self.name()
            ),
        }
    }
}

/// A persisted version a migration can start from.
fn whole_version(stored: f64) -> Option<u32> {
    if stored.fract() == 0.0 && stored >= 0.0 && stored <= f64::from(u32::MAX) {
        Some(stored as u32)
    } else {
        None
    }
}

/// Persistence controls of a store, from [`StoreApi::persist`].
#[derive(Clone)]
pub struct PersistApi {
    controller: Arc<PersistController>,
}

impl PersistApi {
    /// Update the live options. A new `storage` takes effect for every
    /// later save and hydration; setting it to `None` keeps the current one.
    pub fn set_options(&self, patch: impl FnOnce(&mut PersistOptions)) {
        let mut options = self.controller.options.read().clone();
        patch(&mut options);
        if let Some(storage) = options.storage.clone() {
            *self.controller.storage.write() = storage;
        }
        *self.controller.options.write() = options;
    }

    /// Remove the persisted item.
    pub async fn clear_storage(&self) -> Result<()> {
        let name = self.controller.name();
        let storage = self.controller.storage.read().clone();
        storage.remove_item(&name).await
    }

    pub fn options(&self) -> PersistOptions {
        self.controller.options.read().clone()
    }

    /// Run a hydration pass to completion.
    ///
    /// Errors are reported to the post-rehydration callback, never
    /// returned. Concurrent passes are independent. A failed pass never
    /// clears a success, and only the latest pass may mark hydration
    /// [`HydrationStatus::Failed`].
    pub async fn rehydrate(&self) {
        self.controller.rehydrate().await
    }

    pub fn has_hydrated(&self) -> bool {
        self.hydration_status() == HydrationStatus::Hydrated
    }

    pub fn hydration_status(&self) -> HydrationStatus {
        *self.controller.status.read()
    }

    /// Observe the start of each hydration pass.
    pub fn on_hydrate<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.controller.add_listener(Phase::Start, Arc::new(listener))
    }

    /// Observe each successful hydration pass.
    pub fn on_finish_hydration<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.controller.add_listener(Phase::Finish, Arc::new(listener))
    }
}

impl fmt::Debug for PersistApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistApi")
            .field("name", &self.controller.name())
            .field("status", &self.hydration_status())
            .finish()
    }
}

/// The persistence mutator.
#[derive(Debug, Clone)]
pub struct Persist {
    options: PersistOptions,
}

impl Persist {
    pub fn new(options: PersistOptions) -> Self {
        Self { options }
    }
}

fn saving_setter(set: Setter, controller: Arc<PersistController>) -> Setter {
    Setter::new(move |update, replace| {
        set.call(update, replace);
        controller.save_in_background();
    })
}

fn warning_setter(set: Setter, name: String) -> Setter {
    Setter::new(move |update, replace| {
        warn!("Unable to update item '{}', the given storage is currently unavailable", name);
        set.call(update, replace);
    })
}

impl StoreMutator for Persist {
    fn wrap(self: Box<Self>, inner: StateCreator) -> StateCreator {
        let options = self.options;
        Box::new(move |set: Setter, get: Getter, api: &StoreApi| {
            let Some(storage) = options.storage.clone() else {
                let name = options.name.clone();
                api.patch_set_state(|previous| warning_setter(previous, name.clone()));
                return inner(warning_setter(set, name), get, api);
            };

            let skip_hydration = options.skip_hydration;
            let controller = Arc::new(PersistController::new(options, storage, set.clone(), get.clone()));

            let exposed = controller.clone();
            api.patch_set_state(move |previous| saving_setter(previous, exposed));

            let config_result = inner(saving_setter(set, controller.clone()), get, api);
            *controller.config_result.write() = config_result.clone();

            let initial = controller.clone();
            api.patch_get_initial_state(Getter::new(move || initial.config_result.read().clone()));
            api.install_persist(PersistApi {
                controller: controller.clone(),
            });

            if !skip_hydration {
                api.after_init(move || controller.spawn_rehydrate());
            }

            config_result
        })
    }
}
