//! Reactive scoped state containers for host-agnostic UI state.
//!
//! `scoped-state` lets independent pieces of UI-agnostic state (counters,
//! forms, toggles, caches) be declared once as `{initial_state, actions,
//! selectors, effects}` bundles and then either owned privately by a single
//! consumer or shared across many consumers under a named context key, with
//! automatic lifecycle notification and conditional re-computation.
//!
//! # Core Concepts
//!
//! - **State / Patch**: flat, string-keyed values; every mutation produces a
//!   new value via shallow merge
//! - **Updater**: a mutation request, either a concrete patch or a pure
//!   function of current state
//! - **Bindings / Api**: the named action/selector/effect map and the
//!   callable surface built from it
//! - **Container**: privately owned state with gating and lifecycle hooks
//! - **Store / SharedContainer**: a process-wide keyed state table with
//!   refcounted mount tracking
//! - **Inspector**: the optional devtools seam mirroring accepted mutations
//!
//! # Quick Start
//!
//! ```
//! use scoped_state::{Bindings, Container, ContainerOptions, Patch, State, Updater};
//! use serde_json::{json, Value};
//!
//! let bindings = Bindings::new().action("increment", |args: &[Value]| {
//!     let n = args.first().and_then(Value::as_i64).unwrap_or(1);
//!     Updater::compute(move |state: &State| {
//!         let count = state.get("count").and_then(Value::as_i64).unwrap_or(0);
//!         Patch::new().with_field("count", count + n)
//!     })
//! });
//!
//! let container = Container::new(
//!     ContainerOptions::new(State::from_value(json!({"count": 0})).unwrap()).bindings(bindings),
//! );
//! container.mount();
//!
//! let api = container.api();
//! api.invoke("increment", &[]).unwrap();
//! api.invoke("increment", &[json!(3)]).unwrap();
//!
//! assert_eq!(container.state().get("count"), Some(&json!(4)));
//! ```
//!
//! # Shared Contexts
//!
//! A [`Store`] owns one state table per provider scope. Containers declared
//! with a context key share the slice stored under that key:
//!
//! ```
//! use scoped_state::{ContainerOptions, Patch, SharedContainer, State, Store, StoreOptions};
//! use serde_json::json;
//!
//! let store = Store::new(StoreOptions::new());
//! let initial = State::from_value(json!({"items": 0})).unwrap();
//!
//! let a = SharedContainer::new(&store, ContainerOptions::new(initial.clone()).context("cart"))
//!     .unwrap();
//! let b = SharedContainer::new(&store, ContainerOptions::new(initial).context("cart")).unwrap();
//! a.mount();
//! b.mount();
//!
//! a.set_state(Patch::new().with_field("items", 2), None, Some("addItem"));
//! assert_eq!(b.state().get("items"), Some(&json!(2)));
//! ```
//!
//! # Concurrency Model
//!
//! The core is single-threaded and cooperative: every mutation is synchronous
//! up to state commit, driven by the host's own scheduling. User functions
//! always run with no internal lock held, and an effect's result is returned
//! to the caller without being awaited or sequenced.

mod api;
mod container;
mod devtools;
mod error;
mod gate;
mod lifecycle;
mod shared;
mod state;
mod store;
mod updater;

// Core types
pub use error::{value_type_name, ScopeError, ScopeResult};
pub use state::{Patch, State};
pub use updater::Updater;

// Transform pipeline
pub use api::{
    ActionFn, Api, Binding, Bindings, EffectFn, EffectProps, EffectThunk, SelectorFn,
    SelectorThunk,
};

// Containers and lifecycle
pub use container::{Container, ContainerOptions};
pub use gate::{GateArgs, ShouldUpdate, Suppression, UpdateGate};
pub use lifecycle::{
    Callback, MountArgs, Mutator, OnMount, OnUnmount, OnUpdate, UnmountArgs, UpdateArgs,
};
pub use shared::SharedContainer;

// Shared context store
pub use store::{
    MountGuard, OnStoreMount, OnStoreUnmount, OnStoreUpdate, Store, StoreMountArgs, StoreMutator,
    StoreOptions, StoreUnmountArgs, StoreUpdateArgs,
};

// Devtools bridge
pub use devtools::{Inspector, InspectorEvent, InspectorMessage, INSPECTOR_NAME};

// Re-export serde_json::Value for convenience
pub use serde_json::Value;
