use std::cell::Cell;

use pagbind_core::{
    AnimationBinding, AnimationEvent, AnimationState, BindingConfig, BindingError, HandleState,
    StateBinding,
};
use pagbind_test_fixtures::{compositions, CallLog, PortCall, RecordingListener, SimulatedPlayer};

fn playing_state() -> AnimationState {
    let mut state = AnimationState::new().with_source(compositions::named("short_4").unwrap());
    state.is_playing = true;
    state
}

#[test]
fn attach_creates_the_player_once() {
    let created = Cell::new(0);
    let mut binding = AnimationBinding::new(BindingConfig::default());
    for _ in 0..3 {
        binding.attach(|| {
            created.set(created.get() + 1);
            SimulatedPlayer::new()
        });
    }
    assert_eq!(created.get(), 1);
    assert!(binding.listener_registered());
    assert_eq!(binding.port().unwrap().listener_count(), 1);
}

#[test]
fn dispose_is_idempotent_and_ordered() {
    let log = CallLog::new();
    let mut binding = AnimationBinding::new(BindingConfig::default());
    let player_log = log.clone();
    binding.attach(move || SimulatedPlayer::with_log(player_log));
    binding.sync(&playing_state());

    assert!(binding.dispose());
    assert!(!binding.dispose());
    assert_eq!(binding.handle_state(), HandleState::Released);

    let calls = log.calls();
    assert_eq!(log.count(|c| *c == PortCall::Release), 1);
    let n = calls.len();
    assert_eq!(&calls[n - 2..], &[PortCall::RemoveListener, PortCall::Release]);
    assert!(log.after_release().is_empty());
}

#[test]
fn listener_is_detached_before_release() {
    let mut binding = AnimationBinding::new(BindingConfig::default());
    binding.attach(SimulatedPlayer::new);
    binding.sync(&playing_state());
    // the port is moved out on release, so observe it through the log instead
    let log = binding.port().unwrap().log().clone();
    binding.dispose();
    let calls = log.calls();
    let removed = calls.iter().position(|c| *c == PortCall::RemoveListener).unwrap();
    let released = calls.iter().position(|c| *c == PortCall::Release).unwrap();
    assert!(removed < released);
}

#[test]
fn dispose_without_attach_is_safe() {
    let mut binding = AnimationBinding::<SimulatedPlayer>::new(BindingConfig::default());
    assert!(binding.dispose());
    assert!(!binding.attach(|| panic!("released bindings never create a player")));
    assert_eq!(binding.handle_state(), HandleState::Released);
}

#[test]
fn nothing_reaches_the_player_after_dispose() {
    let log = CallLog::new();
    let mut binding = AnimationBinding::new(BindingConfig::default());
    let player_log = log.clone();
    binding.attach(move || SimulatedPlayer::with_log(player_log));
    let mut state = playing_state();
    binding.sync(&state);
    binding.dispose();

    state.progress = 0.5;
    state.is_playing = false;
    let report = binding.sync(&state);
    assert_eq!(
        report.errors,
        vec![BindingError::use_after_release("sync")]
    );
    assert!(!report.errors[0].is_recoverable());
    assert!(report.commands.is_empty());

    binding.suspend();
    binding.resume();
    binding.resize();
    assert!(!binding.set_listener(Some(RecordingListener::new().as_listener())));
    assert!(log.after_release().is_empty());
}

#[test]
fn no_state_writes_after_dispose() {
    let mut binding = AnimationBinding::new(BindingConfig::default());
    binding.attach(SimulatedPlayer::new);
    let mut state = playing_state();
    binding.sync(&state);
    binding.port_mut().unwrap().advance(10.0);
    assert!(binding.pending_events() > 0);

    binding.dispose();
    let before = state.clone();
    assert!(binding.apply_events(&mut state).is_empty());
    assert_eq!(binding.tick(1.0, &mut state).progress(), None);
    assert_eq!(state, before);
}

#[test]
fn dropping_the_binding_releases_the_player() {
    let log = CallLog::new();
    {
        let mut binding = AnimationBinding::new(BindingConfig::default());
        let player_log = log.clone();
        binding.attach(move || SimulatedPlayer::with_log(player_log));
        binding.sync(&playing_state());
    }
    assert_eq!(log.count(|c| *c == PortCall::Release), 1);
    assert_eq!(log.count(|c| *c == PortCall::RemoveListener), 1);
}

#[test]
fn queued_events_are_cleared_on_dispose() {
    let listener = RecordingListener::new();
    let mut binding = AnimationBinding::new(BindingConfig::default());
    binding.set_listener(Some(listener.as_listener()));
    binding.attach(SimulatedPlayer::new);
    binding.sync(&playing_state());
    binding.port().unwrap().emit(AnimationEvent::Repeat);
    assert_eq!(listener.count("repeat"), 1);

    binding.dispose();
    assert_eq!(binding.pending_events(), 0);
}

fn drive<B: StateBinding<Port = SimulatedPlayer>>(binding: &mut B) -> HandleState {
    binding.attach(SimulatedPlayer::new);
    binding.sync(&playing_state());
    let attached = binding.handle_state();
    binding.dispose();
    assert_eq!(binding.handle_state(), HandleState::Released);
    attached
}

#[test]
fn trait_surface_drives_the_same_lifecycle() {
    let mut binding = <AnimationBinding<SimulatedPlayer> as StateBinding>::with_config(BindingConfig::default());
    assert_eq!(
        drive(&mut binding),
        HandleState::Attached {
            has_composition: true
        }
    );
}
