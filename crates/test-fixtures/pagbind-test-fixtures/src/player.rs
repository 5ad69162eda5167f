//! In-process stand-in for a native PAG player.

use std::fmt;
use std::sync::{Arc, Mutex};

use pagbind_core::{
    dispatch, frame_index, same_listener, AnimationEvent, BindingError, DecodeError,
    ListenerRef, NativePlayerPort, PortCapabilities, ScaleMode, SnapshotPort, REPEAT_INFINITE,
};

use crate::compositions::{ENCODED_LEN, MAGIC, VERSION};

/// Frame rate of the simulated native clock.
pub const FIXTURE_FPS: f32 = 60.0;

/// A decoded fixture composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimComposition {
    pub frames: u32,
    pub width: u32,
    pub height: u32,
    pub color: [u8; 4],
}

impl SimComposition {
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < ENCODED_LEN {
            return Err(DecodeError::new("truncated composition", bytes.len()));
        }
        if &bytes[..4] != MAGIC {
            return Err(DecodeError::new("bad magic", bytes.len()));
        }
        if bytes[4] != VERSION {
            return Err(DecodeError::new(
                format!("unsupported version {}", bytes[4]),
                bytes.len(),
            ));
        }
        let word = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let frames = word(5);
        if frames == 0 {
            return Err(DecodeError::new("composition has no frames", bytes.len()));
        }
        Ok(Self {
            frames,
            width: word(9),
            height: word(13),
            color: [bytes[17], bytes[18], bytes[19], bytes[20]],
        })
    }
}

/// One call received by the player, in arrival order.
#[derive(Clone, Debug, PartialEq)]
pub enum PortCall {
    Load(usize),
    SetComposition(bool),
    Play,
    Pause,
    SetProgress(f64),
    SetFrame(u64),
    Flush,
    SetRepeatCount(i32),
    SetScaleMode(ScaleMode),
    SetRenderScale(f32),
    SetCacheAllFrames(bool),
    AddListener,
    RemoveListener,
    UpdateSize,
    MakeOffscreen(u32, u32),
    ReleaseSurface,
    CopyPixels,
    Release,
}

/// Shared call log. Outlives the player so tests can inspect it after release.
#[derive(Clone, Debug, Default)]
pub struct CallLog(Arc<Mutex<Vec<PortCall>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: PortCall) {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }

    pub fn calls(&self) -> Vec<PortCall> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self, pred: impl Fn(&PortCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn clear(&self) {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Calls recorded after the first `Release`.
    pub fn after_release(&self) -> Vec<PortCall> {
        let calls = self.calls();
        match calls.iter().position(|c| *c == PortCall::Release) {
            Some(at) => calls[at + 1..].to_vec(),
            None => Vec::new(),
        }
    }
}

/// Deterministic native player. Time only moves through [`SimulatedPlayer::advance`].
pub struct SimulatedPlayer {
    log: CallLog,
    capabilities: PortCapabilities,
    composition: Option<SimComposition>,
    listeners: Vec<ListenerRef>,
    max_listeners: usize,
    listeners_at_release: Option<usize>,
    playing: bool,
    progress: f64,
    repeat_count: i32,
    plays_done: i32,
    scale_mode: ScaleMode,
    render_scale: f32,
    cache_all_frames: bool,
    accumulator: f32,
    surface: Option<(u32, u32)>,
    flushed_frame: Option<u64>,
    fail_surfaces: bool,
    released: bool,
}

impl fmt::Debug for SimulatedPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedPlayer")
            .field("composition", &self.composition)
            .field("listeners", &self.listeners.len())
            .field("playing", &self.playing)
            .field("progress", &self.progress)
            .field("surface", &self.surface)
            .field("released", &self.released)
            .finish()
    }
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            capabilities: PortCapabilities::default(),
            composition: None,
            listeners: Vec::new(),
            max_listeners: 0,
            listeners_at_release: None,
            playing: false,
            progress: 0.0,
            repeat_count: REPEAT_INFINITE,
            plays_done: 0,
            scale_mode: ScaleMode::LetterBox,
            render_scale: 1.0,
            cache_all_frames: false,
            accumulator: 0.0,
            surface: None,
            flushed_frame: None,
            fail_surfaces: false,
            released: false,
        }
    }

    pub fn with_capabilities(mut self, capabilities: PortCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Every `make_offscreen` call fails.
    pub fn failing_surfaces(mut self) -> Self {
        self.fail_surfaces = true;
        self
    }

    pub fn set_failing_surfaces(&mut self, fail: bool) {
        self.fail_surfaces = fail;
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Run the native clock for `dt` seconds, firing listener callbacks.
    pub fn advance(&mut self, dt: f32) {
        let Some(comp) = self.composition else {
            return;
        };
        if self.released || !self.playing || !(dt > 0.0) {
            return;
        }
        let period = 1.0 / FIXTURE_FPS;
        let step = 1.0 / f64::from(comp.frames);
        self.accumulator += dt;
        while self.playing && self.accumulator >= period {
            self.accumulator -= period;
            self.progress += step;
            if self.progress >= 1.0 - 1e-9 {
                self.plays_done += 1;
                let infinite = self.repeat_count <= 0;
                if infinite || self.plays_done < self.repeat_count {
                    self.progress = 0.0;
                    self.notify(AnimationEvent::Repeat);
                    self.notify(AnimationEvent::Update { progress: 0.0 });
                } else {
                    self.progress = 1.0;
                    self.playing = false;
                    self.accumulator = 0.0;
                    self.notify(AnimationEvent::Update { progress: 1.0 });
                    self.notify(AnimationEvent::End);
                }
            } else {
                self.notify(AnimationEvent::Update {
                    progress: self.progress,
                });
            }
        }
    }

    /// Fire a callback as if the native side produced it.
    pub fn emit(&self, event: AnimationEvent) {
        self.notify(event);
    }

    fn notify(&self, event: AnimationEvent) {
        let listeners = self.listeners.clone();
        for listener in &listeners {
            dispatch(listener.as_ref(), event);
        }
    }

    pub fn composition(&self) -> Option<SimComposition> {
        self.composition
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn current_frame(&self) -> u64 {
        frame_index(self.progress, self.total_frames())
    }

    pub fn repeat_count(&self) -> i32 {
        self.repeat_count
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.scale_mode
    }

    pub fn render_scale(&self) -> f32 {
        self.render_scale
    }

    pub fn cache_all_frames(&self) -> bool {
        self.cache_all_frames
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Highest number of listeners ever registered at once.
    pub fn max_listener_count(&self) -> usize {
        self.max_listeners
    }

    pub fn listeners_at_release(&self) -> Option<usize> {
        self.listeners_at_release
    }

    pub fn surface(&self) -> Option<(u32, u32)> {
        self.surface
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl NativePlayerPort for SimulatedPlayer {
    type Composition = SimComposition;

    fn load(&mut self, bytes: &[u8]) -> Result<SimComposition, DecodeError> {
        self.log.push(PortCall::Load(bytes.len()));
        SimComposition::decode(bytes)
    }

    fn set_composition(&mut self, composition: Option<SimComposition>) {
        self.log.push(PortCall::SetComposition(composition.is_some()));
        self.composition = composition;
        self.progress = 0.0;
        self.plays_done = 0;
        self.accumulator = 0.0;
        self.flushed_frame = None;
    }

    fn total_frames(&self) -> u64 {
        self.composition.map_or(0, |c| u64::from(c.frames))
    }

    fn capabilities(&self) -> PortCapabilities {
        self.capabilities
    }

    fn play(&mut self) {
        self.log.push(PortCall::Play);
        if self.playing {
            return;
        }
        self.playing = true;
        if self.progress >= 1.0 {
            self.progress = 0.0;
            self.plays_done = 0;
        }
        if self.composition.is_some() {
            self.notify(AnimationEvent::Start);
        }
    }

    fn pause(&mut self) {
        self.log.push(PortCall::Pause);
        if !self.playing {
            return;
        }
        self.playing = false;
        self.accumulator = 0.0;
        self.notify(AnimationEvent::Cancel);
    }

    fn set_progress(&mut self, progress: f64) {
        self.log.push(PortCall::SetProgress(progress));
        self.progress = if progress.is_finite() { progress.clamp(0.0, 1.0) } else { 0.0 };
    }

    fn set_frame(&mut self, frame: u64) {
        self.log.push(PortCall::SetFrame(frame));
        let total = self.total_frames();
        self.progress = if total == 0 {
            0.0
        } else {
            (frame.min(total) as f64 / total as f64).clamp(0.0, 1.0)
        };
    }

    fn flush(&mut self) {
        self.log.push(PortCall::Flush);
        if self.composition.is_some() {
            self.flushed_frame = Some(self.current_frame());
        }
    }

    fn set_repeat_count(&mut self, count: i32) {
        self.log.push(PortCall::SetRepeatCount(count));
        self.repeat_count = count;
    }

    fn set_scale_mode(&mut self, mode: ScaleMode) {
        self.log.push(PortCall::SetScaleMode(mode));
        self.scale_mode = mode;
    }

    fn set_render_scale(&mut self, scale: f32) {
        self.log.push(PortCall::SetRenderScale(scale));
        self.render_scale = scale;
    }

    fn set_cache_all_frames_in_memory(&mut self, enabled: bool) {
        self.log.push(PortCall::SetCacheAllFrames(enabled));
        self.cache_all_frames = enabled;
    }

    fn add_listener(&mut self, listener: ListenerRef) {
        self.log.push(PortCall::AddListener);
        self.listeners.push(listener);
        self.max_listeners = self.max_listeners.max(self.listeners.len());
    }

    fn remove_listener(&mut self, listener: &ListenerRef) {
        self.log.push(PortCall::RemoveListener);
        self.listeners.retain(|l| !same_listener(l, listener));
    }

    fn update_size(&mut self) {
        self.log.push(PortCall::UpdateSize);
    }

    fn release(&mut self) {
        self.log.push(PortCall::Release);
        self.listeners_at_release = Some(self.listeners.len());
        self.released = true;
        self.playing = false;
        self.composition = None;
        self.listeners.clear();
    }
}

impl SnapshotPort for SimulatedPlayer {
    fn composition_size(&self) -> Option<(u32, u32)> {
        self.composition.map(|c| (c.width, c.height))
    }

    fn make_offscreen(&mut self, width: u32, height: u32) -> Result<(), BindingError> {
        self.log.push(PortCall::MakeOffscreen(width, height));
        if self.fail_surfaces {
            return Err(BindingError::attachment(width, height, "offscreen surface unavailable"));
        }
        self.surface = Some((width, height));
        Ok(())
    }

    fn release_surface(&mut self) {
        self.log.push(PortCall::ReleaseSurface);
        self.surface = None;
    }

    /// Fills every pixel with `[frame, g, b, a]` of the composition colour.
    fn copy_pixels(&mut self, dst: &mut [u8], row_bytes: usize) -> bool {
        self.log.push(PortCall::CopyPixels);
        let (Some((width, height)), Some(comp), Some(frame)) =
            (self.surface, self.composition, self.flushed_frame)
        else {
            return false;
        };
        let (width, height) = (width as usize, height as usize);
        if row_bytes < width * 4 || dst.len() < row_bytes * height {
            return false;
        }
        let pixel = [frame as u8, comp.color[1], comp.color[2], comp.color[3]];
        for row in dst.chunks_exact_mut(row_bytes).take(height) {
            for px in row[..width * 4].chunks_exact_mut(4) {
                px.copy_from_slice(&pixel);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compositions, RecordingListener};

    #[test]
    fn decodes_fixture_bytes() {
        let comp = SimComposition::decode(&compositions::bytes(174, 64, 32)).unwrap();
        assert_eq!((comp.frames, comp.width, comp.height), (174, 64, 32));
    }

    #[test]
    fn malformed_fixtures_fail_to_decode() {
        for key in compositions::malformed_keys() {
            let bytes = compositions::malformed_named(&key).unwrap();
            assert!(SimComposition::decode(&bytes).is_err(), "{key} decoded");
        }
        assert!(SimComposition::decode(&compositions::malformed()).is_err());
    }

    #[test]
    fn finite_repeat_ends() {
        let mut player = SimulatedPlayer::new();
        let rec = RecordingListener::new();
        player.add_listener(rec.as_listener());
        let comp = player.load(&compositions::bytes(2, 1, 1)).unwrap();
        player.set_composition(Some(comp));
        player.set_repeat_count(2);
        player.play();
        player.advance(1.0);
        assert!(!player.is_playing());
        assert_eq!(rec.count("start"), 1);
        assert_eq!(rec.count("repeat"), 1);
        assert_eq!(rec.count("end"), 1);
    }
}
