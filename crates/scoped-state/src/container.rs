//! Local state container: privately owned state with gating and lifecycle.
//!
//! A `Container` owns one state value for a single consumer. It applies
//! updater resolution, runs the update gate, and fires lifecycle
//! notifications. Consumers that want to share a slice across several
//! containers use [`crate::SharedContainer`] with a [`crate::Store`] instead.

use crate::api::{Api, Bindings};
use crate::gate::{GateArgs, ShouldUpdate, Suppression, UpdateGate};
use crate::lifecycle::{Callback, Lifecycle, MountArgs, Mutator, UnmountArgs, UpdateArgs};
use crate::{State, Updater};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Container lifecycle stage.
///
/// A container is created idle, mounts at most once, and stays unmounted once
/// unmounted. Mutations against an unmounted container are silently
/// discarded, never an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stage {
    Idle,
    Mounted,
    Unmounted,
}

/// Declaration bundle for a container.
///
/// Mirrors the consumer surface: initial state, the action/selector/effect
/// map, an optional context key, the update gate predicate, and lifecycle
/// hooks.
pub struct ContainerOptions {
    pub(crate) initial_state: State,
    pub(crate) bindings: Bindings,
    pub(crate) context: Option<String>,
    pub(crate) should_update: Option<ShouldUpdate>,
    pub(crate) lifecycle: Lifecycle,
}

impl ContainerOptions {
    /// Create options with the given initial state.
    pub fn new(initial_state: State) -> Self {
        Self {
            initial_state,
            bindings: Bindings::new(),
            context: None,
            should_update: None,
            lifecycle: Lifecycle::default(),
        }
    }

    /// Set the action/selector/effect map (builder pattern).
    pub fn bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Request a shared context key (builder pattern).
    ///
    /// Only consumed by [`crate::SharedContainer::new`]; a plain
    /// [`Container`] ignores it.
    pub fn context(mut self, key: impl Into<String>) -> Self {
        self.context = Some(key.into());
        self
    }

    /// Set the update gate predicate (builder pattern).
    pub fn should_update(
        mut self,
        predicate: impl Fn(GateArgs<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_update = Some(Arc::new(predicate));
        self
    }

    /// Set the mount hook (builder pattern).
    pub fn on_mount(mut self, hook: impl Fn(MountArgs) + Send + Sync + 'static) -> Self {
        self.lifecycle.on_mount = Some(Arc::new(hook));
        self
    }

    /// Set the update hook (builder pattern).
    pub fn on_update(mut self, hook: impl Fn(UpdateArgs) + Send + Sync + 'static) -> Self {
        self.lifecycle.on_update = Some(Arc::new(hook));
        self
    }

    /// Set the unmount hook (builder pattern).
    pub fn on_unmount(mut self, hook: impl Fn(UnmountArgs) + Send + Sync + 'static) -> Self {
        self.lifecycle.on_unmount = Some(Arc::new(hook));
        self
    }
}

pub(crate) struct ContainerCore {
    inner: Mutex<ContainerInner>,
    gate: UpdateGate,
    lifecycle: Lifecycle,
}

struct ContainerInner {
    state: State,
    suppression: Suppression,
    stage: Stage,
}

impl ContainerCore {
    pub(crate) fn snapshot(&self) -> State {
        self.inner.lock().unwrap().state.clone()
    }

    /// Apply a mutation request: resolve, commit, gate, notify, callback.
    ///
    /// User functions (updater, predicate, hooks, callback) always run with
    /// the internal lock released, so a panic in one of them propagates
    /// without corrupting committed state.
    pub(crate) fn set_state(
        core: &Arc<Self>,
        updater: Updater,
        callback: Option<Callback>,
        type_tag: Option<&str>,
    ) {
        let current = {
            let inner = core.inner.lock().unwrap();
            if inner.stage == Stage::Unmounted {
                trace!(tag = ?type_tag, "mutation discarded, container unmounted");
                return;
            }
            inner.state.clone()
        };

        let patch = updater.resolve(&current);

        let (prev_state, next_state) = {
            let mut inner = core.inner.lock().unwrap();
            let prev = inner.state.clone();
            inner.state = prev.merged(&patch);
            (prev, inner.state.clone())
        };

        let gated = core.gate.is_configured();
        let accepted = !gated || core.gate.accepts(&prev_state, &next_state);

        let notify = {
            let mut inner = core.inner.lock().unwrap();
            if gated {
                inner.suppression.record(accepted, &next_state);
            }
            accepted && inner.suppression.should_notify(&next_state)
        };

        trace!(tag = ?type_tag, accepted, notify, "state committed");

        if notify {
            core.lifecycle.notify_update(UpdateArgs {
                state: next_state,
                prev_state,
                type_tag: type_tag.map(str::to_owned),
                set_state: Mutator::local(core, Some("onUpdate")),
            });
        }

        if let Some(callback) = callback {
            callback();
        }
    }
}

/// A reactive state container owned by a single consumer.
///
/// # Examples
///
/// ```
/// use scoped_state::{Container, ContainerOptions, Patch, State};
/// use serde_json::json;
///
/// let container = Container::new(ContainerOptions::new(
///     State::from_value(json!({"on": false})).unwrap(),
/// ));
/// container.mount();
///
/// container.set_state(Patch::new().with_field("on", true), None, Some("toggle"));
/// assert_eq!(container.state().get("on"), Some(&json!(true)));
/// ```
pub struct Container {
    core: Arc<ContainerCore>,
    bindings: Bindings,
}

impl Container {
    /// Create an unmounted container from its declaration.
    pub fn new(options: ContainerOptions) -> Self {
        let ContainerOptions {
            initial_state,
            bindings,
            context: _,
            should_update,
            lifecycle,
        } = options;

        Self {
            core: Arc::new(ContainerCore {
                inner: Mutex::new(ContainerInner {
                    state: initial_state,
                    suppression: Suppression::default(),
                    stage: Stage::Idle,
                }),
                gate: UpdateGate::new(should_update),
                lifecycle,
            }),
            bindings,
        }
    }

    /// Transition to mounted, invoking `on_mount` once.
    ///
    /// Only the first call has any effect.
    pub fn mount(&self) {
        {
            let mut inner = self.core.inner.lock().unwrap();
            if inner.stage != Stage::Idle {
                return;
            }
            inner.stage = Stage::Mounted;
        }
        debug!("container mounted");
        self.core.lifecycle.notify_mount(MountArgs {
            state: self.core.snapshot(),
            set_state: Mutator::local(&self.core, Some("onMount")),
        });
    }

    /// Transition to unmounted, invoking `on_unmount` once with a no-op
    /// mutator. Subsequent mutations are silently discarded.
    pub fn unmount(&self) {
        {
            let mut inner = self.core.inner.lock().unwrap();
            if inner.stage != Stage::Mounted {
                return;
            }
            inner.stage = Stage::Unmounted;
        }
        debug!("container unmounted");
        self.core.lifecycle.notify_unmount(UnmountArgs {
            state: self.core.snapshot(),
            set_state: Mutator::noop(),
        });
    }

    /// Whether the container is currently mounted.
    pub fn is_mounted(&self) -> bool {
        self.core.inner.lock().unwrap().stage == Stage::Mounted
    }

    /// Snapshot of the current committed state.
    pub fn state(&self) -> State {
        self.core.snapshot()
    }

    /// Submit a mutation request.
    ///
    /// `callback` runs after commit regardless of gate outcome; `type_tag`
    /// labels the mutation in `on_update` notifications.
    pub fn set_state(
        &self,
        updater: impl Into<Updater>,
        callback: Option<Callback>,
        type_tag: Option<&str>,
    ) {
        ContainerCore::set_state(&self.core, updater.into(), callback, type_tag);
    }

    /// A mutator handle scoped to this container.
    pub fn mutator(&self) -> Mutator {
        Mutator::local(&self.core, None)
    }

    /// Build the callable surface from this container's bindings.
    pub fn api(&self) -> Api {
        let weak = Arc::downgrade(&self.core);
        Api::new(
            self.bindings.clone(),
            Arc::new(move || match weak.upgrade() {
                Some(core) => core.snapshot(),
                None => State::new(),
            }),
            Mutator::local(&self.core, None),
        )
    }
}
