use bevy::prelude::*;
use bevy_pagbind::{
    FixedDt, PagAnimation, PagAnimationEvent, PagBindingError, PagBindingPlugin, PagBindings,
    PagHostLifecycle, PagListener, PagSnapshot,
};
use pagbind_core::{
    AnimationBinding, AnimationState, BindingConfig, HandleState, ProgressDriver, SnapshotBinding,
};
use pagbind_test_fixtures::{compositions, CallLog, PortCall, RecordingListener, SimulatedPlayer};

type Live = AnimationBinding<SimulatedPlayer>;

fn live_app(config: BindingConfig, log: &CallLog) -> App {
    let player_log = log.clone();
    let mut app = App::new();
    app.add_plugins(MinimalPlugins).add_plugins(
        PagBindingPlugin::<Live>::new(move || SimulatedPlayer::with_log(player_log.clone()))
            .with_config(config),
    );
    app
}

fn playing(name: &str) -> PagAnimation {
    let mut state = AnimationState::new().with_source(compositions::named(name).unwrap());
    state.is_playing = true;
    PagAnimation::new(state)
}

fn drain<E: Event + Clone>(app: &mut App) -> Vec<E> {
    app.world_mut()
        .resource_mut::<Events<E>>()
        .drain()
        .collect()
}

#[test]
fn plugin_inserts_resources() {
    let log = CallLog::new();
    let app = live_app(BindingConfig::default(), &log);
    assert!(app.world().get_resource::<PagBindings<Live>>().is_some());
    assert_eq!(app.world().resource::<FixedDt>().0, 1.0 / 60.0);
}

#[test]
fn spawned_entity_gets_a_playing_player() {
    let log = CallLog::new();
    let mut app = live_app(BindingConfig::default(), &log);
    let entity = app.world_mut().spawn(playing("loop_174")).id();
    app.update();

    let bindings = app.world().resource::<PagBindings<Live>>();
    let binding = bindings.get(entity).unwrap();
    assert_eq!(
        binding.handle_state(),
        HandleState::Attached {
            has_composition: true
        }
    );
    assert!(binding.port().unwrap().is_playing());

    let events = drain::<PagAnimationEvent>(&mut app);
    assert!(events.iter().any(|e| e.entity == entity && e.event.name() == "start"));
}

#[test]
fn state_changes_are_pushed() {
    let log = CallLog::new();
    let mut app = live_app(BindingConfig::default(), &log);
    let entity = app.world_mut().spawn(playing("loop_174")).id();
    app.update();

    app.world_mut().get_mut::<PagAnimation>(entity).unwrap().0.is_playing = false;
    app.update();
    let bindings = app.world().resource::<PagBindings<Live>>();
    assert!(!bindings.get(entity).unwrap().port().unwrap().is_playing());
}

#[test]
fn despawn_releases_the_player() {
    let log = CallLog::new();
    let mut app = live_app(BindingConfig::default(), &log);
    let entity = app.world_mut().spawn(playing("short_4")).id();
    app.update();

    app.world_mut().despawn(entity);
    app.update();
    assert!(app.world().resource::<PagBindings<Live>>().is_empty());
    assert_eq!(log.count(|c| *c == PortCall::Release), 1);
    assert!(log.after_release().is_empty());
}

#[test]
fn listener_component_is_registered_and_swapped() {
    let log = CallLog::new();
    let mut app = live_app(BindingConfig::default(), &log);
    let first = RecordingListener::new();
    let entity = app
        .world_mut()
        .spawn((playing("short_4"), PagListener(first.as_listener())))
        .id();
    app.update();
    assert_eq!(first.count("start"), 1);

    let second = RecordingListener::new();
    app.world_mut()
        .entity_mut(entity)
        .insert(PagListener(second.as_listener()));
    app.update();
    app.world_mut().get_mut::<PagAnimation>(entity).unwrap().0.is_playing = false;
    app.update();

    assert_eq!(first.count("cancel"), 0);
    assert_eq!(second.count("cancel"), 1);
    let bindings = app.world().resource::<PagBindings<Live>>();
    assert_eq!(bindings.get(entity).unwrap().port().unwrap().max_listener_count(), 1);
}

#[test]
fn decode_errors_surface_as_events() {
    let log = CallLog::new();
    let mut app = live_app(BindingConfig::default(), &log);
    let entity = app
        .world_mut()
        .spawn(PagAnimation::new(
            AnimationState::new().with_source(compositions::malformed()),
        ))
        .id();
    app.update();
    let errors = drain::<PagBindingError>(&mut app);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].entity, entity);
    assert_eq!(errors[0].error.category(), "decode");

    let payload = serde_json::to_value(&errors[0].error).unwrap();
    assert_eq!(payload["Decode"]["reason"], "truncated composition");
    assert_eq!(
        payload["Decode"]["len"],
        compositions::malformed().len() as u64
    );
}

#[test]
fn reinserted_animation_gets_a_fresh_player() {
    let log = CallLog::new();
    let mut app = live_app(BindingConfig::default(), &log);
    let entity = app.world_mut().spawn(playing("short_4")).id();
    app.update();

    app.world_mut()
        .entity_mut(entity)
        .remove::<PagAnimation>()
        .insert(playing("loop_174"));
    app.update();

    assert_eq!(log.count(|c| *c == PortCall::Release), 1);
    let bindings = app.world().resource::<PagBindings<Live>>();
    let binding = bindings.get(entity).expect("binding recreated");
    assert!(binding.handle_state().has_composition());
    let port = binding.port().unwrap();
    assert!(port.is_playing());
    assert_eq!(port.composition().map(|c| c.frames), Some(174));

    app.update();
    assert!(app.world().resource::<PagBindings<Live>>().get(entity).is_some());
}

#[test]
fn clock_driver_advances_in_fixed_update() {
    let log = CallLog::new();
    let mut app = live_app(BindingConfig::default().with_driver(ProgressDriver::Clock), &log);
    let entity = app.world_mut().spawn(playing("loop_174")).id();
    app.update();

    for _ in 0..3 {
        app.world_mut().run_schedule(FixedUpdate);
    }
    let state = &app.world().get::<PagAnimation>(entity).unwrap().0;
    assert!((state.progress - 3.0 / 174.0).abs() < 1e-9);

    app.update();
    let bindings = app.world().resource::<PagBindings<Live>>();
    let port_progress = bindings.get(entity).unwrap().port().unwrap().progress();
    assert!(port_progress > 0.0);
}

#[test]
fn suspend_and_resume_reach_every_binding() {
    let log = CallLog::new();
    let mut app = live_app(BindingConfig::default(), &log);
    let a = app.world_mut().spawn(playing("short_4")).id();
    let b = app.world_mut().spawn(playing("loop_174")).id();
    app.update();

    app.world_mut().send_event(PagHostLifecycle::Suspend);
    app.update();
    {
        let bindings = app.world().resource::<PagBindings<Live>>();
        for e in [a, b] {
            assert!(!bindings.get(e).unwrap().port().unwrap().is_playing());
        }
    }

    app.world_mut().send_event(PagHostLifecycle::Resume);
    app.update();
    let bindings = app.world().resource::<PagBindings<Live>>();
    for e in [a, b] {
        assert!(bindings.get(e).unwrap().port().unwrap().is_playing());
    }
}

#[test]
fn snapshot_binding_fills_the_component() {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(PagBindingPlugin::<SnapshotBinding<SimulatedPlayer>>::new(SimulatedPlayer::new));
    let mut state = AnimationState::new().with_source(compositions::named("banner_30").unwrap());
    state.progress = 0.5;
    let entity = app
        .world_mut()
        .spawn((PagAnimation::new(state), PagSnapshot::default()))
        .id();
    app.update();

    let snap = &app.world().get::<PagSnapshot>(entity).unwrap().frame;
    assert_eq!((snap.width, snap.height), (32, 16));
    assert_eq!(snap.generation, 1);
    assert_eq!(snap.pixels[0], 15);
}
