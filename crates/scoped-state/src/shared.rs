//! Context-keyed containers backed by the shared store.
//!
//! A `SharedContainer` is declared exactly like a local [`crate::Container`]
//! but with a context key, and reads/mutates its slice of an explicit
//! [`Store`] instead of owning state privately. Mounting is refcounted at the
//! store: the container's `on_mount` hook fires only for the first mount
//! under its key, and `on_unmount` only for the last unmount.

use crate::api::{Api, Bindings};
use crate::container::{ContainerOptions, Stage};
use crate::gate::{Suppression, UpdateGate};
use crate::lifecycle::{Callback, Lifecycle, MountArgs, Mutator, UnmountArgs, UpdateArgs};
use crate::store::{MountGuard, Store, StoreCore};
use crate::{Patch, ScopeError, ScopeResult, State, Updater};
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, trace};

pub(crate) struct SharedCore {
    store: Weak<StoreCore>,
    key: String,
    gate: UpdateGate,
    lifecycle: Lifecycle,
    inner: Mutex<SharedInner>,
}

struct SharedInner {
    suppression: Suppression,
    stage: Stage,
    guard: Option<MountGuard>,
}

impl SharedCore {
    /// Snapshot of this container's slice. A missing entry or a dropped
    /// store reads as empty.
    pub(crate) fn slice(&self) -> State {
        match self.store.upgrade() {
            Some(store) => store.slice_or_default(&self.key),
            None => State::new(),
        }
    }

    /// Mirror of the local container's mutation protocol against the shared
    /// slice: the store commits and notifies first, then this container runs
    /// its gate and fires its own `on_update`, then the callback.
    pub(crate) fn set_state(
        core: &Arc<Self>,
        updater: Updater,
        callback: Option<Callback>,
        type_tag: Option<&str>,
    ) {
        {
            let inner = core.inner.lock().unwrap();
            if inner.stage == Stage::Unmounted {
                trace!(context = %core.key, "mutation discarded, container unmounted");
                return;
            }
        }
        let Some(store) = core.store.upgrade() else {
            trace!(context = %core.key, "mutation discarded, store dropped");
            return;
        };

        let Some(commit) = StoreCore::apply(&store, &core.key, updater, type_tag) else {
            return;
        };

        let gated = core.gate.is_configured();
        let accepted = !gated || core.gate.accepts(&commit.prev_slice, &commit.next_slice);

        let notify = {
            let mut inner = core.inner.lock().unwrap();
            if gated {
                inner.suppression.record(accepted, &commit.next_slice);
            }
            accepted && inner.suppression.should_notify(&commit.next_slice)
        };

        if notify {
            core.lifecycle.notify_update(UpdateArgs {
                state: commit.next_slice,
                prev_state: commit.prev_slice,
                type_tag: type_tag.map(str::to_owned),
                set_state: Mutator::shared(core, Some("onUpdate")),
            });
        }

        if let Some(callback) = callback {
            callback();
        }
    }
}

/// A container whose state slice is shared under a context key.
///
/// # Examples
///
/// ```
/// use scoped_state::{ContainerOptions, Patch, SharedContainer, State, Store, StoreOptions};
/// use serde_json::json;
///
/// let store = Store::new(StoreOptions::new());
/// let container = SharedContainer::new(
///     &store,
///     ContainerOptions::new(State::from_value(json!({"items": 0})).unwrap()).context("cart"),
/// )
/// .unwrap();
/// container.mount();
///
/// container.set_state(Patch::new().with_field("items", 3), None, Some("addItem"));
/// assert_eq!(store.context_state("cart").unwrap().get("items"), Some(&json!(3)));
/// ```
pub struct SharedContainer {
    core: Arc<SharedCore>,
    bindings: Bindings,
}

impl fmt::Debug for SharedContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedContainer")
            .field("context", &self.core.key)
            .finish_non_exhaustive()
    }
}

impl SharedContainer {
    /// Create an unmounted shared container.
    ///
    /// The declaration must carry a context key. If the store has no entry
    /// for that key yet, the entry is seeded from the declaration's
    /// `initial_state`, tagged `"initialState"`, before any other mutation
    /// for the key is accepted. An existing entry is left untouched, so
    /// remounting under a key preserves its last committed state.
    pub fn new(store: &Store, options: ContainerOptions) -> ScopeResult<Self> {
        let ContainerOptions {
            initial_state,
            bindings,
            context,
            should_update,
            lifecycle,
        } = options;
        let key = context.ok_or(ScopeError::MissingContextKey)?;

        if store.context_state(&key).is_none() {
            // Current fields win over the declaration's initial state.
            store.set_context_state(
                &key,
                Updater::compute(move |current: &State| {
                    let mut patch = Patch::from(initial_state);
                    for (field, value) in current.iter() {
                        patch.set(field.clone(), value.clone());
                    }
                    patch
                }),
                None,
                Some("initialState"),
            );
        }

        Ok(Self {
            core: Arc::new(SharedCore {
                store: store.downgrade(),
                key,
                gate: UpdateGate::new(should_update),
                lifecycle,
                inner: Mutex::new(SharedInner {
                    suppression: Suppression::default(),
                    stage: Stage::Idle,
                    guard: None,
                }),
            }),
            bindings,
        })
    }

    /// The context key this container is bound to.
    pub fn context(&self) -> &str {
        &self.core.key
    }

    /// Register with the store's refcount for this key.
    ///
    /// The container's `on_mount` hook is wired to the store's first-mount
    /// slot: it fires only if this registration takes the key's refcount
    /// from 0 to 1. Only the first call has any effect.
    pub fn mount(&self) {
        {
            let mut inner = self.core.inner.lock().unwrap();
            if inner.stage != Stage::Idle {
                return;
            }
            inner.stage = Stage::Mounted;
        }
        let Some(store) = self.core.store.upgrade() else {
            trace!(context = %self.core.key, "mount skipped, store dropped");
            return;
        };
        debug!(context = %self.core.key, "shared container mounting");

        let on_first = self.core.lifecycle.on_mount.clone().map(|hook| {
            let weak = Arc::downgrade(&self.core);
            Box::new(move || {
                if let Some(core) = weak.upgrade() {
                    hook(MountArgs {
                        state: core.slice(),
                        set_state: Mutator::shared(&core, Some("onMount")),
                    });
                }
            }) as Callback
        });

        let guard = StoreCore::mount_container(&store, &self.core.key, on_first);
        self.core.inner.lock().unwrap().guard = Some(guard);
    }

    /// Release the store registration.
    ///
    /// The container's `on_unmount` hook is wired to the store's
    /// last-unmount slot: it fires only if this release takes the key's
    /// refcount from 1 to 0, receiving the final slice and a no-op mutator.
    /// Subsequent mutations through this container are silently discarded.
    pub fn unmount(&self) {
        let guard = {
            let mut inner = self.core.inner.lock().unwrap();
            if inner.stage != Stage::Mounted {
                return;
            }
            inner.stage = Stage::Unmounted;
            inner.guard.take()
        };
        debug!(context = %self.core.key, "shared container unmounting");

        let on_last = self.core.lifecycle.on_unmount.clone().map(|hook| {
            let weak = Arc::downgrade(&self.core);
            Box::new(move || {
                if let Some(core) = weak.upgrade() {
                    hook(UnmountArgs {
                        state: core.slice(),
                        set_state: Mutator::noop(),
                    });
                }
            }) as Callback
        });

        if let Some(guard) = guard {
            guard.unmount(on_last);
        }
    }

    /// Whether the container is currently mounted.
    pub fn is_mounted(&self) -> bool {
        self.core.inner.lock().unwrap().stage == Stage::Mounted
    }

    /// Snapshot of this container's slice of the store.
    pub fn state(&self) -> State {
        self.core.slice()
    }

    /// Submit a mutation request against this container's slice.
    pub fn set_state(
        &self,
        updater: impl Into<Updater>,
        callback: Option<Callback>,
        type_tag: Option<&str>,
    ) {
        SharedCore::set_state(&self.core, updater.into(), callback, type_tag);
    }

    /// A mutator handle scoped to this container.
    pub fn mutator(&self) -> Mutator {
        Mutator::shared(&self.core, None)
    }

    /// Build the callable surface from this container's bindings.
    pub fn api(&self) -> Api {
        let weak = Arc::downgrade(&self.core);
        Api::new(
            self.bindings.clone(),
            Arc::new(move || match weak.upgrade() {
                Some(core) => core.slice(),
                None => State::new(),
            }),
            Mutator::shared(&self.core, None),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreOptions;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn state(v: Value) -> State {
        State::from_value(v).unwrap()
    }

    fn counter_options(key: &str) -> ContainerOptions {
        ContainerOptions::new(state(json!({"count": 0}))).context(key)
    }

    #[test]
    fn test_missing_context_key() {
        let store = Store::new(StoreOptions::new());
        let err = SharedContainer::new(&store, ContainerOptions::new(State::new())).unwrap_err();
        assert!(matches!(err, ScopeError::MissingContextKey));
    }

    #[test]
    fn test_seeding_is_tagged_initial_state() {
        let tags: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let tags_in = Arc::clone(&tags);

        let store = Store::new(StoreOptions::new().on_update(move |args| {
            tags_in.lock().unwrap().push(args.type_tag);
        }));

        let _container = SharedContainer::new(&store, counter_options("counter")).unwrap();
        assert_eq!(
            *tags.lock().unwrap(),
            vec![Some("initialState".to_string())]
        );
        assert_eq!(
            store.context_state("counter").unwrap().get("count"),
            Some(&json!(0))
        );
    }

    #[test]
    fn test_existing_entry_is_not_reseeded() {
        let store = Store::new(StoreOptions::new());
        store.set_context_state("counter", Patch::new().with_field("count", 9), None, None);

        let container = SharedContainer::new(&store, counter_options("counter")).unwrap();
        assert_eq!(container.state().get("count"), Some(&json!(9)));
    }

    #[test]
    fn test_seed_keeps_existing_fields_over_initial() {
        let store = Store::new(StoreOptions::new());
        // A partial entry exists but under a different field.
        store.set_context_state("profile", Patch::new().with_field("name", "ada"), None, None);

        // Table has the key, so no reseed happens at all; the declaration's
        // initial state is ignored.
        let container = SharedContainer::new(
            &store,
            ContainerOptions::new(state(json!({"name": "none", "age": 0}))).context("profile"),
        )
        .unwrap();
        assert_eq!(container.state().get("name"), Some(&json!("ada")));
        assert_eq!(container.state().get("age"), None);
    }

    #[test]
    fn test_gate_suppresses_own_updates_only_once() {
        let updates = Arc::new(AtomicUsize::new(0));
        let updates_in = Arc::clone(&updates);

        let store = Store::new(StoreOptions::new());
        let container = SharedContainer::new(
            &store,
            counter_options("counter")
                .should_update(|args| {
                    args.next_state.get("count").and_then(Value::as_i64) != Some(2)
                })
                .on_update(move |_| {
                    updates_in.fetch_add(1, Ordering::SeqCst);
                }),
        )
        .unwrap();
        container.mount();

        container.set_state(Patch::new().with_field("count", 2), None, Some("set"));
        // The raw slice still committed.
        assert_eq!(container.state().get("count"), Some(&json!(2)));
        assert_eq!(updates.load(Ordering::SeqCst), 0);

        container.set_state(Patch::new().with_field("count", 3), None, Some("set"));
        assert_eq!(updates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unmounted_container_discards_mutations() {
        let store = Store::new(StoreOptions::new());
        let container = SharedContainer::new(&store, counter_options("counter")).unwrap();
        container.mount();
        container.unmount();

        container.set_state(Patch::new().with_field("count", 5), None, None);
        assert_eq!(
            store.context_state("counter").unwrap().get("count"),
            Some(&json!(0))
        );
    }

    #[test]
    fn test_container_survives_dropped_store() {
        let store = Store::new(StoreOptions::new());
        let container = SharedContainer::new(&store, counter_options("counter")).unwrap();
        container.mount();
        drop(store);

        // Missing collaborator: silent no-op, never a crash.
        container.set_state(Patch::new().with_field("count", 5), None, None);
        assert!(container.state().is_empty());
    }
}
