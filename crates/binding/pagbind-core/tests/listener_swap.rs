use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pagbind_core::{AnimationBinding, AnimationState, BindingConfig, CallbackListener};
use pagbind_test_fixtures::{compositions, PortCall, RecordingListener, SimulatedPlayer};

fn attached() -> AnimationBinding<SimulatedPlayer> {
    let mut binding = AnimationBinding::new(BindingConfig::default());
    binding.attach(SimulatedPlayer::new);
    binding.sync(&AnimationState::new().with_source(compositions::named("short_4").unwrap()));
    binding
}

#[test]
fn at_most_one_listener_is_ever_registered() {
    let mut binding = attached();
    for _ in 0..5 {
        binding.set_listener(Some(RecordingListener::new().as_listener()));
    }
    binding.set_listener(None);
    binding.set_listener(Some(RecordingListener::new().as_listener()));

    let port = binding.port().unwrap();
    assert_eq!(port.listener_count(), 1);
    assert_eq!(port.max_listener_count(), 1);
}

#[test]
fn swapped_listener_receives_later_events_only() {
    let first = RecordingListener::new();
    let second = RecordingListener::new();
    let mut binding = attached();
    let mut state = AnimationState::new().with_source(compositions::named("short_4").unwrap());

    binding.set_listener(Some(first.as_listener()));
    state.is_playing = true;
    binding.sync(&state);

    binding.set_listener(Some(second.as_listener()));
    state.is_playing = false;
    binding.sync(&state);

    assert_eq!(first.names(), vec!["start"]);
    assert_eq!(second.names(), vec!["cancel"]);
}

#[test]
fn swap_removes_before_adding() {
    let mut binding = attached();
    let log = binding.port().unwrap().log().clone();
    log.clear();
    binding.set_listener(Some(RecordingListener::new().as_listener()));
    assert_eq!(log.calls(), vec![PortCall::RemoveListener, PortCall::AddListener]);
}

#[test]
fn same_listener_is_not_re_registered() {
    let listener = RecordingListener::new().as_listener();
    let mut binding = attached();
    assert!(binding.set_listener(Some(listener.clone())));
    let log = binding.port().unwrap().log().clone();
    log.clear();
    assert!(!binding.set_listener(Some(listener)));
    assert!(log.calls().is_empty());
}

#[test]
fn listener_set_before_attach_is_used_on_attach() {
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = hits.clone();
    let listener = CallbackListener::new()
        .on_start(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .into_ref();

    let mut binding = AnimationBinding::new(BindingConfig::default());
    assert!(binding.set_listener(Some(listener.clone())));
    binding.attach(SimulatedPlayer::new);
    let mut state = AnimationState::new().with_source(compositions::named("short_4").unwrap());
    state.is_playing = true;
    binding.sync(&state);

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(binding.port().unwrap().listener_count(), 1);
}

#[test]
fn events_queue_without_a_caller_listener() {
    let mut binding = attached();
    let mut state = AnimationState::new().with_source(compositions::named("short_4").unwrap());
    state.is_playing = true;
    binding.sync(&state);
    let events = binding.drain_events();
    assert_eq!(events.first().map(|e| e.name()), Some("start"));
}
