//! Shared context store: a process-wide keyed state table with refcounted
//! mounts.
//!
//! A single `Store` serves one provider scope. Containers that declare a
//! context key read and mutate their slice of the store's table instead of
//! owning state privately. The store tracks per-key mount reference counts so
//! only the first mounting container triggers key initialization and
//! `on_mount`, and only the last unmounting container triggers `on_unmount`.
//!
//! The table is never pruned on unmount — a slice outlives temporary 0-mount
//! windows, so remounting under the same key picks up the last committed
//! state.
//!
//! The store's construction and [`Store::dispose`] are the explicit
//! init/teardown boundaries of this process-wide state; the handle is passed
//! down to containers explicitly rather than through hidden globals.

use crate::devtools::{DevtoolsBridge, Inspector, InspectorMessage};
use crate::lifecycle::Callback;
use crate::{ScopeError, ScopeResult, State, Updater};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, trace, warn};

/// Arguments passed to a provider-level `on_mount` hook.
pub struct StoreMountArgs {
    /// Full table snapshot.
    pub state: Value,
    /// Store mutator tagged `"Provider/onMount"`.
    pub set_context_state: StoreMutator,
}

/// Arguments passed to a provider-level `on_update` hook.
pub struct StoreUpdateArgs {
    /// Full table snapshot after the mutation.
    pub state: Value,
    /// Full table snapshot before the mutation.
    pub prev_state: Value,
    /// The context key the mutation targeted.
    pub context: String,
    /// The mutation type tag.
    pub type_tag: Option<String>,
    /// Store mutator tagged `"Provider/onUpdate"`.
    pub set_context_state: StoreMutator,
}

/// Arguments passed to a provider-level `on_unmount` hook.
pub struct StoreUnmountArgs {
    /// Full table snapshot at disposal.
    pub state: Value,
}

pub type OnStoreMount = Arc<dyn Fn(StoreMountArgs) + Send + Sync>;
pub type OnStoreUpdate = Arc<dyn Fn(StoreUpdateArgs) + Send + Sync>;
pub type OnStoreUnmount = Arc<dyn Fn(StoreUnmountArgs) + Send + Sync>;

/// Provider declaration surface for a [`Store`].
#[derive(Default)]
pub struct StoreOptions {
    initial: BTreeMap<String, State>,
    inspector: Option<Arc<dyn Inspector>>,
    on_mount: Option<OnStoreMount>,
    on_update: Option<OnStoreUpdate>,
    on_unmount: Option<OnStoreUnmount>,
}

impl StoreOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed one context slice (builder pattern).
    pub fn initial_context(mut self, key: impl Into<String>, state: State) -> Self {
        self.initial.insert(key.into(), state);
        self
    }

    /// Attach a devtools inspector (builder pattern).
    pub fn inspector(mut self, inspector: Arc<dyn Inspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    /// Set the provider mount hook (builder pattern).
    pub fn on_mount(mut self, hook: impl Fn(StoreMountArgs) + Send + Sync + 'static) -> Self {
        self.on_mount = Some(Arc::new(hook));
        self
    }

    /// Set the provider update hook (builder pattern).
    pub fn on_update(mut self, hook: impl Fn(StoreUpdateArgs) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Arc::new(hook));
        self
    }

    /// Set the provider unmount hook (builder pattern).
    pub fn on_unmount(mut self, hook: impl Fn(StoreUnmountArgs) + Send + Sync + 'static) -> Self {
        self.on_unmount = Some(Arc::new(hook));
        self
    }
}

struct StoreHooks {
    on_mount: Option<OnStoreMount>,
    on_update: Option<OnStoreUpdate>,
    on_unmount: Option<OnStoreUnmount>,
}

struct StoreInner {
    table: BTreeMap<String, State>,
    mounts: HashMap<String, usize>,
    disposed: bool,
}

pub(crate) struct StoreCore {
    inner: Mutex<StoreInner>,
    hooks: StoreHooks,
    bridge: Option<DevtoolsBridge>,
}

/// Result of one committed context mutation.
pub(crate) struct CommitInfo {
    pub(crate) prev_slice: State,
    pub(crate) next_slice: State,
}

fn table_value(table: &BTreeMap<String, State>) -> Value {
    let mut map = Map::new();
    for (key, slice) in table {
        map.insert(key.clone(), slice.to_value());
    }
    Value::Object(map)
}

impl StoreCore {
    fn snapshot(&self) -> Value {
        table_value(&self.inner.lock().unwrap().table)
    }

    pub(crate) fn context_state(&self, key: &str) -> Option<State> {
        self.inner.lock().unwrap().table.get(key).cloned()
    }

    pub(crate) fn slice_or_default(&self, key: &str) -> State {
        self.context_state(key).unwrap_or_default()
    }

    /// Resolve and commit a scoped mutation, then run the store-level
    /// notification and devtools mirror. Returns `None` when the store has
    /// been disposed (the request is silently discarded).
    pub(crate) fn apply(
        core: &Arc<Self>,
        key: &str,
        updater: Updater,
        type_tag: Option<&str>,
    ) -> Option<CommitInfo> {
        let current = {
            let inner = core.inner.lock().unwrap();
            if inner.disposed {
                warn!(context = key, "mutation discarded, store disposed");
                return None;
            }
            inner.table.get(key).cloned().unwrap_or_default()
        };

        let patch = updater.resolve(&current);

        let (prev_slice, next_slice, prev_table, next_table) = {
            let mut inner = core.inner.lock().unwrap();
            let prev_table = table_value(&inner.table);
            let prev_slice = inner.table.get(key).cloned().unwrap_or_default();
            let next_slice = prev_slice.merged(&patch);
            inner.table.insert(key.to_owned(), next_slice.clone());
            let next_table = table_value(&inner.table);
            (prev_slice, next_slice, prev_table, next_table)
        };

        trace!(context = key, tag = ?type_tag, "context state committed");

        if let Some(hook) = &core.hooks.on_update {
            hook(StoreUpdateArgs {
                state: next_table.clone(),
                prev_state: prev_table,
                context: key.to_owned(),
                type_tag: type_tag.map(str::to_owned),
                set_context_state: StoreMutator::new(core, Some("Provider/onUpdate")),
            });
        }

        if let (Some(bridge), Some(tag)) = (&core.bridge, type_tag) {
            let action = if key.is_empty() {
                tag.to_owned()
            } else {
                format!("{key}/{tag}")
            };
            bridge.send(action, next_table);
        }

        Some(CommitInfo {
            prev_slice,
            next_slice,
        })
    }

    fn mount_key(&self, key: &str, on_first_mount: Option<Callback>) {
        let first = {
            let mut inner = self.inner.lock().unwrap();
            let count = inner.mounts.entry(key.to_owned()).or_insert(0);
            let first = *count == 0;
            *count += 1;
            debug!(context = key, count = *count, "container mounted");
            first
        };
        // The 0→1 transition fires after the slice's seed commit for the
        // tick, never inline with the refcount bump.
        if first {
            if let Some(hook) = on_first_mount {
                hook();
            }
        }
    }

    pub(crate) fn mount_container(
        core: &Arc<Self>,
        key: &str,
        on_first_mount: Option<Callback>,
    ) -> MountGuard {
        core.mount_key(key, on_first_mount);
        MountGuard {
            core: Arc::downgrade(core),
            key: key.to_owned(),
            released: false,
        }
    }

    fn unmount_key(&self, key: &str, on_last_unmount: Option<Callback>) {
        let last = {
            let inner = self.inner.lock().unwrap();
            inner.mounts.get(key).copied() == Some(1)
        };
        // The 1→0 hook fires before the decrement is finalized.
        if last {
            if let Some(hook) = on_last_unmount {
                hook();
            }
        }
        let mut inner = self.inner.lock().unwrap();
        if let Some(count) = inner.mounts.get_mut(key) {
            *count = count.saturating_sub(1);
            debug!(context = key, count = *count, "container unmounted");
        }
    }
}

/// Registration handle for one mounted container.
///
/// Dropping the guard decrements the refcount without firing any hook; call
/// [`MountGuard::unmount`] to pass a last-unmount hook.
pub struct MountGuard {
    core: Weak<StoreCore>,
    key: String,
    released: bool,
}

impl MountGuard {
    /// The context key this guard is registered under.
    pub fn context(&self) -> &str {
        &self.key
    }

    /// Release the registration. `on_last_unmount` fires exactly once, for
    /// the guard that takes the refcount from 1 to 0.
    pub fn unmount(mut self, on_last_unmount: Option<Callback>) {
        self.release(on_last_unmount);
    }

    fn release(&mut self, on_last_unmount: Option<Callback>) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(core) = self.core.upgrade() {
            core.unmount_key(&self.key, on_last_unmount);
        }
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        self.release(None);
    }
}

/// A handle on a store, pre-tagged with the mutation type it submits.
///
/// Handed to provider-level hooks; holds the store weakly, so a handle that
/// outlives its store degrades to a silent no-op.
#[derive(Clone)]
pub struct StoreMutator {
    core: Weak<StoreCore>,
    tag: Option<String>,
}

impl StoreMutator {
    fn new(core: &Arc<StoreCore>, tag: Option<&str>) -> Self {
        Self {
            core: Arc::downgrade(core),
            tag: tag.map(str::to_owned),
        }
    }

    /// Submit a mutation against one context key.
    pub fn set(&self, key: &str, updater: impl Into<Updater>) {
        self.set_with(key, updater, None);
    }

    /// Submit a mutation against one context key with a completion callback.
    pub fn set_with(&self, key: &str, updater: impl Into<Updater>, callback: Option<Callback>) {
        match self.core.upgrade() {
            Some(core) => {
                if StoreCore::apply(&core, key, updater.into(), self.tag.as_deref()).is_some() {
                    if let Some(callback) = callback {
                        callback();
                    }
                }
            }
            None => trace!(context = key, "mutation discarded, store dropped"),
        }
    }
}

/// The shared context store for one provider scope.
///
/// Cheap to clone; clones share the same table, refcounts, and hooks.
///
/// # Examples
///
/// ```
/// use scoped_state::{Patch, Store, StoreOptions};
/// use serde_json::json;
///
/// let store = Store::new(StoreOptions::new());
/// store.set_context_state("cart", Patch::new().with_field("items", 2), None, Some("addItem"));
///
/// let cart = store.context_state("cart").unwrap();
/// assert_eq!(cart.get("items"), Some(&json!(2)));
/// ```
#[derive(Clone)]
pub struct Store {
    core: Arc<StoreCore>,
}

impl Store {
    /// Create a store. Registers with the inspector (pushing the initial
    /// table as the baseline) and fires the provider `on_mount` hook.
    pub fn new(options: StoreOptions) -> Self {
        let StoreOptions {
            initial,
            inspector,
            on_mount,
            on_update,
            on_unmount,
        } = options;

        let core = Arc::new(StoreCore {
            inner: Mutex::new(StoreInner {
                table: initial,
                mounts: HashMap::new(),
                disposed: false,
            }),
            hooks: StoreHooks {
                on_mount,
                on_update,
                on_unmount,
            },
            bridge: inspector.map(DevtoolsBridge::new),
        });
        debug!("store created");

        if let Some(bridge) = &core.bridge {
            bridge.init(&core.snapshot());
        }
        if let Some(hook) = &core.hooks.on_mount {
            hook(StoreMountArgs {
                state: core.snapshot(),
                set_context_state: StoreMutator::new(&core, Some("Provider/onMount")),
            });
        }

        Self { core }
    }

    /// Full table snapshot.
    pub fn state(&self) -> Value {
        self.core.snapshot()
    }

    /// Snapshot of one context slice, if present.
    pub fn context_state(&self, key: &str) -> Option<State> {
        self.core.context_state(key)
    }

    /// Submit a scoped mutation against one context key.
    ///
    /// Resolves the updater against the key's slice (defaulting to empty),
    /// merges the patch into that key only, fires the store-level `on_update`
    /// and the devtools mirror, then runs `callback`. Disposed store: silent
    /// no-op.
    pub fn set_context_state(
        &self,
        key: &str,
        updater: impl Into<Updater>,
        callback: Option<Callback>,
        type_tag: Option<&str>,
    ) {
        if StoreCore::apply(&self.core, key, updater.into(), type_tag).is_some() {
            if let Some(callback) = callback {
                callback();
            }
        }
    }

    /// Register a mounting container under a context key.
    ///
    /// `on_first_mount` fires exactly once, for the registration that takes
    /// the refcount from 0 to 1.
    pub fn mount_container(&self, key: &str, on_first_mount: Option<Callback>) -> MountGuard {
        StoreCore::mount_container(&self.core, key, on_first_mount)
    }

    /// Administrative full-table replacement.
    ///
    /// Bypasses update gates, per-key granularity, and all notifications;
    /// used by devtools time-travel. The payload must be an object of
    /// objects.
    pub fn replace_table(&self, table: Value) -> ScopeResult<()> {
        let entries = match table {
            Value::Object(entries) => entries,
            other => return Err(ScopeError::not_an_object(&other)),
        };

        let mut next = BTreeMap::new();
        for (key, slice) in entries {
            next.insert(key, State::from_value(slice)?);
        }

        let mut inner = self.core.inner.lock().unwrap();
        debug!(contexts = next.len(), "table replaced");
        inner.table = next;
        Ok(())
    }

    /// Handle an inbound inspector message.
    ///
    /// Only `DISPATCH` messages carrying a JSON-encoded table are acted on;
    /// everything else is ignored.
    pub fn dispatch(&self, message: &InspectorMessage) -> ScopeResult<()> {
        if message.kind != InspectorMessage::DISPATCH {
            return Ok(());
        }
        let Some(payload) = &message.state else {
            return Ok(());
        };
        let table: Value = serde_json::from_str(payload)?;
        self.replace_table(table)
    }

    /// Tear down the provider scope.
    ///
    /// Fires the provider `on_unmount` hook once with the final table,
    /// disconnects devtools, and discards all further mutations. Only the
    /// first call has any effect.
    pub fn dispose(&self) {
        let state = {
            let mut inner = self.core.inner.lock().unwrap();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            table_value(&inner.table)
        };
        debug!("store disposed");

        if let Some(hook) = &self.core.hooks.on_unmount {
            hook(StoreUnmountArgs { state });
        }
        if let Some(bridge) = &self.core.bridge {
            bridge.disconnect();
        }
    }

    /// Whether the store has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.core.inner.lock().unwrap().disposed
    }

    pub(crate) fn downgrade(&self) -> Weak<StoreCore> {
        Arc::downgrade(&self.core)
    }
}
