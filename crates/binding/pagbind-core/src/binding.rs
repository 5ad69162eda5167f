//! Binding: keep one native player consistent with the latest [`AnimationState`].
//!
//! Each `sync` diffs the state against the last committed snapshot, issues the
//! port calls for the changed fields and commits the new snapshot. Native
//! events travel the other way through [`AnimationBinding::apply_events`].
//!
//! Order of port calls inside one sync: composition, configuration, seek +
//! flush, play/pause. Listener swaps happen in [`AnimationBinding::set_listener`]
//! and are complete before it returns. With the clock driver the native player
//! is only ever seeked; play/pause stay with the binding's clock.

use std::sync::Arc;

use log::{debug, trace, warn};
use serde::Serialize;

use crate::clock::{ClockTick, ProgressClock};
use crate::config::{BindingConfig, ProgressDriver};
use crate::error::BindingError;
use crate::events::{AnimationEvent, EventQueue, ListenerRef};
use crate::frame::frame_index;
use crate::lifecycle::{HandleState, PlayerSlot};
use crate::listener::ListenerSlot;
use crate::port::{NativePlayerPort, SeekGranularity};
use crate::snapshot::Snapshot;
use crate::state::{AnimationState, ScaleMode, StateDiff};

/// One call issued to the port during a sync.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum PortCommand {
    LoadComposition(usize),
    DetachComposition,
    SetRepeatCount(i32),
    SetScaleMode(ScaleMode),
    SetRenderScale(f32),
    SetCacheAllFramesInMemory(bool),
    SetProgress(f64),
    SetFrame(u64),
    Flush,
    Play,
    Pause,
}

/// What a sync observed and did.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub diff: StateDiff,
    pub commands: Vec<PortCommand>,
    pub errors: Vec<BindingError>,
}

impl SyncReport {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.errors.is_empty()
    }

    /// A new composition was decoded and attached.
    pub fn loaded_composition(&self) -> bool {
        self.commands
            .iter()
            .any(|c| matches!(c, PortCommand::LoadComposition(_)))
    }

    pub fn seeked(&self) -> bool {
        self.commands
            .iter()
            .any(|c| matches!(c, PortCommand::SetProgress(_) | PortCommand::SetFrame(_)))
    }

    pub fn decode_error(&self) -> Option<&BindingError> {
        self.errors
            .iter()
            .find(|e| matches!(e, BindingError::Decode(_)))
    }
}

/// Host-facing surface shared by live and snapshot bindings, so adapters can
/// drive either one.
pub trait StateBinding {
    type Port: NativePlayerPort;

    fn with_config(config: BindingConfig) -> Self
    where
        Self: Sized;
    fn attach(&mut self, create: impl FnOnce() -> Self::Port) -> bool;
    fn set_listener(&mut self, listener: Option<ListenerRef>) -> bool;
    fn sync(&mut self, state: &AnimationState) -> SyncReport;
    fn apply_events(&mut self, state: &mut AnimationState) -> Vec<AnimationEvent>;
    fn tick(&mut self, dt: f32, state: &mut AnimationState) -> ClockTick;
    fn suspend(&mut self);
    fn resume(&mut self);
    fn dispose(&mut self) -> bool;
    fn handle_state(&self) -> HandleState;

    /// Latest captured frame for headless bindings.
    fn snapshot(&self) -> Option<&Snapshot> {
        None
    }
}

/// Live binding: the native player renders into its own surface.
#[derive(Debug)]
pub struct AnimationBinding<P: NativePlayerPort> {
    config: BindingConfig,
    slot: PlayerSlot<P>,
    queue: Arc<EventQueue>,
    listeners: ListenerSlot,
    committed: Option<AnimationState>,
    clock: ProgressClock,
    suspended: bool,
}

impl<P: NativePlayerPort> AnimationBinding<P> {
    pub fn new(config: BindingConfig) -> Self {
        let queue = Arc::new(EventQueue::new());
        Self {
            clock: ProgressClock::new(0, &config),
            config,
            slot: PlayerSlot::new(),
            listeners: ListenerSlot::new(queue.clone()),
            queue,
            committed: None,
            suspended: false,
        }
    }

    #[inline]
    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// Create the native handle on first use and register the listener bridge.
    /// Returns true only for the call that created the handle.
    pub fn attach(&mut self, create: impl FnOnce() -> P) -> bool {
        if self.slot.is_released() {
            debug!("attach ignored: player already released");
            return false;
        }
        let creating = self.slot.state() == HandleState::Unattached;
        let Some(port) = self.slot.acquire(create) else {
            return false;
        };
        if creating {
            self.listeners.attach(port);
            debug!("native player attached");
        }
        creating
    }

    /// Replace the caller's listener. Detaching the old registration and adding
    /// the new one happen inside this call.
    pub fn set_listener(&mut self, listener: Option<ListenerRef>) -> bool {
        if self.slot.is_released() {
            debug!("set_listener ignored: player already released");
            return false;
        }
        self.listeners.replace(self.slot.get_mut(), listener)
    }

    /// Push every field that changed since the last committed state.
    pub fn sync(&mut self, state: &AnimationState) -> SyncReport {
        let mut report = SyncReport::default();
        if self.slot.is_released() {
            debug!("sync ignored: player already released");
            report.errors.push(BindingError::use_after_release("sync"));
            return report;
        }
        let suspended = self.suspended;
        let native_clock = self.drives_native_clock();
        let Some(port) = self.slot.get_mut() else {
            // nothing to drive yet; the first sync after attach pushes everything
            return report;
        };

        report.diff = state.diff(self.committed.as_ref());
        let composition = push_changes(
            port,
            state,
            report.diff,
            suspended || !native_clock,
            &mut report,
        );
        let total_frames = port.total_frames();

        if let Some(has_composition) = composition {
            self.slot.set_has_composition(has_composition);
            self.clock.set_total_frames(if has_composition { total_frames } else { 0 });
            self.clock.restart();
        }
        if !native_clock && report.diff.is_playing {
            self.clock_play_state(state.is_playing);
        }
        if !report.commands.is_empty() {
            debug!("sync issued {:?}", report.commands);
        }
        self.committed = Some(state.clone());
        report
    }

    /// With the clock driver the native player never runs its own clock; the
    /// binding reports start and cancel itself.
    fn clock_play_state(&mut self, playing: bool) {
        let was_playing = self.committed.as_ref().is_some_and(|s| s.is_playing);
        if playing {
            self.clock.restart();
            self.listeners.emit(AnimationEvent::Start);
        } else if was_playing && !self.clock.is_finished() {
            self.listeners.emit(AnimationEvent::Cancel);
        }
    }

    #[inline]
    fn drives_native_clock(&self) -> bool {
        self.config.progress_driver != ProgressDriver::Clock
    }

    /// Drain queued native events and fold them into `state`: start clears
    /// `is_completed`, end sets it, and with the native progress driver update
    /// events overwrite `progress` without triggering a seek on the next sync.
    pub fn apply_events(&mut self, state: &mut AnimationState) -> Vec<AnimationEvent> {
        if self.slot.is_released() {
            self.queue.clear();
            return Vec::new();
        }
        let events = self.queue.drain();
        let follow_native = self.config.progress_driver == ProgressDriver::Native;
        for event in &events {
            match *event {
                AnimationEvent::Start => state.is_completed = false,
                AnimationEvent::End => state.is_completed = true,
                AnimationEvent::Update { progress } if follow_native => {
                    state.progress = progress;
                    if let Some(committed) = self.committed.as_mut() {
                        committed.progress = progress;
                    }
                }
                _ => {}
            }
        }
        events
    }

    /// Queued events without applying them.
    pub fn drain_events(&mut self) -> Vec<AnimationEvent> {
        self.queue.drain()
    }

    /// Advance the progress clock. Only active with [`ProgressDriver::Clock`]
    /// while playing, attached and not suspended. A wraparound is reported to
    /// the listener as a repeat; the end of the last play sets `is_completed`
    /// and reports an end.
    pub fn tick(&mut self, dt: f32, state: &mut AnimationState) -> ClockTick {
        if self.config.progress_driver != ProgressDriver::Clock
            || !state.is_playing
            || self.suspended
            || !self.slot.state().is_attached()
        {
            return ClockTick::Idle;
        }
        let tick = self.clock.advance(dt, state.progress, state.repeat_count);
        if let Some(progress) = tick.progress() {
            trace!("clock tick -> {progress}");
            state.progress = progress;
        }
        if tick.wrapped() {
            self.listeners.emit(AnimationEvent::Repeat);
        }
        if tick.ended() {
            state.is_completed = true;
            self.listeners.emit(AnimationEvent::End);
        }
        tick
    }

    /// Host went to background: stop the native clock, keep the state.
    pub fn suspend(&mut self) {
        if self.suspended || self.slot.is_released() {
            return;
        }
        self.suspended = true;
        let playing = self.drives_native_clock()
            && self.committed.as_ref().is_some_and(|s| s.is_playing);
        if let Some(port) = self.slot.get_mut() {
            if playing {
                port.pause();
            }
        }
    }

    /// Host came back: restart the native clock if the state says playing.
    pub fn resume(&mut self) {
        if !self.suspended || self.slot.is_released() {
            return;
        }
        self.suspended = false;
        self.clock.reset();
        let playing = self.drives_native_clock()
            && self.committed.as_ref().is_some_and(|s| s.is_playing);
        if let Some(port) = self.slot.get_mut() {
            if playing {
                port.play();
            }
        }
    }

    /// Forward a host size change.
    pub fn resize(&mut self) {
        if let Some(port) = self.slot.get_mut() {
            port.update_size();
        }
    }

    /// Tear down: cancel the clock, detach the listener, run `before_release`
    /// (offscreen surfaces), then release the player. Only the first call does
    /// anything; it returns whether this call tore down.
    pub fn dispose_with(&mut self, before_release: impl FnOnce(&mut P)) -> bool {
        if self.slot.is_released() {
            return false;
        }
        self.clock.cancel();
        match self.slot.get_mut() {
            Some(port) => {
                self.listeners.detach(port);
                before_release(port);
            }
            None => self.listeners.forget(),
        }
        let released_player = self.slot.release();
        self.queue.clear();
        debug!("binding disposed (player released: {released_player})");
        true
    }

    pub fn dispose(&mut self) -> bool {
        self.dispose_with(|_| {})
    }

    #[inline]
    pub fn handle_state(&self) -> HandleState {
        self.slot.state()
    }

    #[inline]
    pub fn port(&self) -> Option<&P> {
        self.slot.get()
    }

    #[inline]
    pub fn port_mut(&mut self) -> Option<&mut P> {
        self.slot.get_mut()
    }

    /// Last state pushed to the player.
    #[inline]
    pub fn committed(&self) -> Option<&AnimationState> {
        self.committed.as_ref()
    }

    #[inline]
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    #[inline]
    pub fn listener_registered(&self) -> bool {
        self.listeners.is_registered()
    }

    #[inline]
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }
}

/// Issue the port calls for `diff`. Returns `Some(has_composition)` when the
/// composition was replaced or detached. With `hold_play` the play state is
/// committed but not forwarded.
fn push_changes<P: NativePlayerPort>(
    port: &mut P,
    state: &AnimationState,
    diff: StateDiff,
    hold_play: bool,
    report: &mut SyncReport,
) -> Option<bool> {
    let caps = port.capabilities();
    let mut composition = None;

    if diff.source {
        match &state.source {
            None => {
                port.set_composition(None);
                report.commands.push(PortCommand::DetachComposition);
                composition = Some(false);
            }
            Some(source) => match port.load(source.as_bytes()) {
                Ok(decoded) => {
                    port.set_composition(Some(decoded));
                    report.commands.push(PortCommand::LoadComposition(source.len()));
                    composition = Some(true);
                }
                Err(err) => {
                    warn!("keeping previous composition: {err}");
                    report.errors.push(err.into());
                }
            },
        }
    }

    if diff.repeat_count {
        port.set_repeat_count(state.repeat_count);
        report.commands.push(PortCommand::SetRepeatCount(state.repeat_count));
    }
    if diff.scale_mode && caps.scale_mode {
        port.set_scale_mode(state.scale_mode);
        report.commands.push(PortCommand::SetScaleMode(state.scale_mode));
    }
    if diff.render_scale && caps.render_scale {
        port.set_render_scale(state.render_scale);
        report.commands.push(PortCommand::SetRenderScale(state.render_scale));
    }
    if diff.cache_all_frames_in_memory && caps.cache_all_frames {
        port.set_cache_all_frames_in_memory(state.cache_all_frames_in_memory);
        report
            .commands
            .push(PortCommand::SetCacheAllFramesInMemory(state.cache_all_frames_in_memory));
    }

    if diff.progress {
        match caps.seek {
            SeekGranularity::Progress => {
                port.set_progress(state.progress);
                report.commands.push(PortCommand::SetProgress(state.progress));
            }
            SeekGranularity::Frame => {
                let frame = frame_index(state.progress, port.total_frames());
                port.set_frame(frame);
                report.commands.push(PortCommand::SetFrame(frame));
            }
        }
        port.flush();
        report.commands.push(PortCommand::Flush);
    }

    if diff.is_playing {
        if hold_play {
            debug!("play state change not forwarded (suspended or clock driven)");
        } else if state.is_playing {
            port.play();
            report.commands.push(PortCommand::Play);
        } else {
            port.pause();
            report.commands.push(PortCommand::Pause);
        }
    }

    composition
}

impl<P: NativePlayerPort> Drop for AnimationBinding<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<P: NativePlayerPort> StateBinding for AnimationBinding<P> {
    type Port = P;

    fn with_config(config: BindingConfig) -> Self {
        Self::new(config)
    }
    fn attach(&mut self, create: impl FnOnce() -> P) -> bool {
        AnimationBinding::attach(self, create)
    }
    fn set_listener(&mut self, listener: Option<ListenerRef>) -> bool {
        AnimationBinding::set_listener(self, listener)
    }
    fn sync(&mut self, state: &AnimationState) -> SyncReport {
        AnimationBinding::sync(self, state)
    }
    fn apply_events(&mut self, state: &mut AnimationState) -> Vec<AnimationEvent> {
        AnimationBinding::apply_events(self, state)
    }
    fn tick(&mut self, dt: f32, state: &mut AnimationState) -> ClockTick {
        AnimationBinding::tick(self, dt, state)
    }
    fn suspend(&mut self) {
        AnimationBinding::suspend(self)
    }
    fn resume(&mut self) {
        AnimationBinding::resume(self)
    }
    fn dispose(&mut self) -> bool {
        AnimationBinding::dispose(self)
    }
    fn handle_state(&self) -> HandleState {
        AnimationBinding::handle_state(self)
    }
}
