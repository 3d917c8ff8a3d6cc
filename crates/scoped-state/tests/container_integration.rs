//! End-to-end container scenarios exercised through the public `Api` surface.

use scoped_state::{
    Bindings, Container, ContainerOptions, EffectProps, Patch, State, Updater, Value,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn state(v: Value) -> State {
    State::from_value(v).unwrap()
}

fn counter_bindings() -> Bindings {
    Bindings::new()
        .action("increment", |args: &[Value]| {
            let n = args.first().and_then(Value::as_i64).unwrap_or(1);
            Updater::compute(move |state: &State| {
                let count = state.get("count").and_then(Value::as_i64).unwrap_or(0);
                Patch::new().with_field("count", count + n)
            })
        })
        .selector("parity", |_args: &[Value]| {
            |state: &State| {
                let count = state.get("count").and_then(Value::as_i64).unwrap_or(0);
                json!(if count % 2 == 0 { "even" } else { "odd" })
            }
        })
}

#[test]
fn counter_actions_accumulate_through_api() {
    let prev_counts: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let prev_in = Arc::clone(&prev_counts);

    let container = Container::new(
        ContainerOptions::new(state(json!({"count": 0})))
            .bindings(counter_bindings())
            .on_update(move |args| {
                assert_eq!(args.type_tag.as_deref(), Some("increment"));
                prev_in
                    .lock()
                    .unwrap()
                    .push(args.prev_state.get("count").cloned().unwrap());
            }),
    );
    container.mount();

    let api = container.api();
    assert_eq!(api.invoke("increment", &[]).unwrap(), Value::Null);
    api.invoke("increment", &[json!(3)]).unwrap();

    assert_eq!(container.state().get("count"), Some(&json!(4)));
    assert_eq!(*prev_counts.lock().unwrap(), vec![json!(0), json!(1)]);
}

#[test]
fn selectors_read_the_current_committed_state() {
    let container = Container::new(
        ContainerOptions::new(state(json!({"count": 0}))).bindings(counter_bindings()),
    );
    container.mount();
    let api = container.api();

    assert_eq!(api.invoke("parity", &[]).unwrap(), json!("even"));
    api.invoke("increment", &[]).unwrap();
    // Re-evaluated, never cached.
    assert_eq!(api.invoke("parity", &[]).unwrap(), json!("odd"));
}

#[test]
fn effects_get_state_and_a_mutator_tagged_with_their_name() {
    let tags: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let tags_in = Arc::clone(&tags);

    let bindings = Bindings::new().effect("load", |_args: &[Value]| {
        |props: EffectProps| {
            let pending = props.state.get("pending").cloned().unwrap();
            props.set_state.set(Patch::new().with_field("pending", true));
            pending
        }
    });

    let container = Container::new(
        ContainerOptions::new(state(json!({"pending": false})))
            .bindings(bindings)
            .on_update(move |args| {
                tags_in.lock().unwrap().push(args.type_tag);
            }),
    );
    container.mount();

    let before = container.api().invoke("load", &[]).unwrap();
    assert_eq!(before, json!(false));
    assert_eq!(container.state().get("pending"), Some(&json!(true)));
    assert_eq!(*tags.lock().unwrap(), vec![Some("load".to_string())]);
}

#[test]
fn api_surface_unions_state_fields_and_callables() {
    let container = Container::new(
        ContainerOptions::new(state(json!({"count": 7}))).bindings(counter_bindings()),
    );
    container.mount();
    let api = container.api();

    assert_eq!(api.field("count"), Some(json!(7)));
    assert!(api.has("increment"));
    assert!(api.has("parity"));
    assert!(!api.has("count"));
}

#[test]
fn gate_suppression_is_per_transition_and_callback_still_runs() {
    let updates = Arc::new(AtomicUsize::new(0));
    let callbacks = Arc::new(AtomicUsize::new(0));
    let updates_in = Arc::clone(&updates);

    let container = Container::new(
        ContainerOptions::new(state(json!({"count": 0})))
            .should_update(|args| {
                // Reject odd counts.
                args.next_state.get("count").and_then(Value::as_i64).unwrap_or(0) % 2 == 0
            })
            .on_update(move |_| {
                updates_in.fetch_add(1, Ordering::SeqCst);
            }),
    );
    container.mount();

    for n in 1..=4 {
        let callbacks_in = Arc::clone(&callbacks);
        container.set_state(
            Patch::new().with_field("count", n),
            Some(Box::new(move || {
                callbacks_in.fetch_add(1, Ordering::SeqCst);
            })),
            None,
        );
    }

    // Every transition committed; only the even ones notified.
    assert_eq!(container.state().get("count"), Some(&json!(4)));
    assert_eq!(updates.load(Ordering::SeqCst), 2);
    assert_eq!(callbacks.load(Ordering::SeqCst), 4);
}

#[test]
fn api_outliving_its_container_degrades_to_empty_state() {
    let container = Container::new(
        ContainerOptions::new(state(json!({"count": 1}))).bindings(counter_bindings()),
    );
    container.mount();
    let api = container.api();
    drop(container);

    assert!(api.state().is_empty());
    // Actions against the dead container are silently discarded.
    api.invoke("increment", &[]).unwrap();
    assert_eq!(api.invoke("parity", &[]).unwrap(), json!("even"));
}
