//! Lifecycle hooks and the scoped mutator handed into them.
//!
//! Hooks fire in the sequence `on_mount` → (n × `on_update`) → `on_unmount`,
//! each receiving a read-only state snapshot and a [`Mutator`] scoped to the
//! owning container. Mutations issued from a hook carry the hook's event name
//! as their type tag.

use crate::container::ContainerCore;
use crate::shared::SharedCore;
use crate::{State, Updater};
use std::sync::{Arc, Weak};
use tracing::trace;

/// Callback run after a mutation request completes, regardless of gate outcome.
pub type Callback = Box<dyn FnOnce() + Send>;

/// Arguments passed to an `on_mount` hook.
pub struct MountArgs {
    /// State snapshot at mount time.
    pub state: State,
    /// Mutator scoped to the mounting container, tagged `"onMount"`.
    pub set_state: Mutator,
}

/// Arguments passed to an `on_update` hook.
pub struct UpdateArgs {
    /// The committed state after the transition.
    pub state: State,
    /// The committed state before the transition.
    pub prev_state: State,
    /// The mutation type tag: an action/effect name, an event name, or the
    /// tag given explicitly to `set_state`.
    pub type_tag: Option<String>,
    /// Mutator scoped to the owning container, tagged `"onUpdate"`.
    pub set_state: Mutator,
}

/// Arguments passed to an `on_unmount` hook.
pub struct UnmountArgs {
    /// State snapshot at unmount time.
    pub state: State,
    /// A no-op mutator; mutations after unmount are silently discarded.
    pub set_state: Mutator,
}

pub type OnMount = Arc<dyn Fn(MountArgs) + Send + Sync>;
pub type OnUpdate = Arc<dyn Fn(UpdateArgs) + Send + Sync>;
pub type OnUnmount = Arc<dyn Fn(UnmountArgs) + Send + Sync>;

/// The lifecycle hook set configured for one container.
#[derive(Clone, Default)]
pub(crate) struct Lifecycle {
    pub(crate) on_mount: Option<OnMount>,
    pub(crate) on_update: Option<OnUpdate>,
    pub(crate) on_unmount: Option<OnUnmount>,
}

impl Lifecycle {
    pub(crate) fn notify_mount(&self, args: MountArgs) {
        if let Some(hook) = &self.on_mount {
            hook(args);
        }
    }

    pub(crate) fn notify_update(&self, args: UpdateArgs) {
        if let Some(hook) = &self.on_update {
            hook(args);
        }
    }

    pub(crate) fn notify_unmount(&self, args: UnmountArgs) {
        if let Some(hook) = &self.on_unmount {
            hook(args);
        }
    }
}

#[derive(Clone)]
enum MutatorTarget {
    /// Discards every mutation. Handed to `on_unmount` hooks.
    Noop,
    Local(Weak<ContainerCore>),
    Shared(Weak<SharedCore>),
}

/// A handle that submits mutation requests to one container.
///
/// The handle holds a weak reference to its target: a mutator that outlives
/// its container (or whose store has been dropped) degrades to a silent
/// no-op instead of an error, since a consumer may legitimately be unmounted
/// mid-flight.
#[derive(Clone)]
pub struct Mutator {
    target: MutatorTarget,
    tag: Option<String>,
}

impl Mutator {
    /// A mutator that discards every request.
    pub fn noop() -> Self {
        Self {
            target: MutatorTarget::Noop,
            tag: None,
        }
    }

    pub(crate) fn local(core: &Arc<ContainerCore>, tag: Option<&str>) -> Self {
        Self {
            target: MutatorTarget::Local(Arc::downgrade(core)),
            tag: tag.map(str::to_owned),
        }
    }

    pub(crate) fn shared(core: &Arc<SharedCore>, tag: Option<&str>) -> Self {
        Self {
            target: MutatorTarget::Shared(Arc::downgrade(core)),
            tag: tag.map(str::to_owned),
        }
    }

    /// Re-tag this mutator. Mutations it submits carry the new tag.
    pub(crate) fn with_tag(&self, tag: &str) -> Self {
        Self {
            target: self.target.clone(),
            tag: Some(tag.to_owned()),
        }
    }

    /// Submit a mutation request.
    pub fn set(&self, updater: impl Into<Updater>) {
        self.set_with(updater, None);
    }

    /// Submit a mutation request with a completion callback.
    ///
    /// The callback runs after commit regardless of gate outcome; it does not
    /// run for discarded requests (dead target or unmounted container).
    pub fn set_with(&self, updater: impl Into<Updater>, callback: Option<Callback>) {
        let updater = updater.into();
        match &self.target {
            MutatorTarget::Noop => {
                trace!(tag = ?self.tag, "mutation discarded by no-op mutator");
            }
            MutatorTarget::Local(core) => match core.upgrade() {
                Some(core) => {
                    ContainerCore::set_state(&core, updater, callback, self.tag.as_deref())
                }
                None => trace!(tag = ?self.tag, "mutation discarded, container dropped"),
            },
            MutatorTarget::Shared(core) => match core.upgrade() {
                Some(core) => SharedCore::set_state(&core, updater, callback, self.tag.as_deref()),
                None => trace!(tag = ?self.tag, "mutation discarded, container dropped"),
            },
        }
    }
}
