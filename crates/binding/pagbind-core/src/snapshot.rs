//! Headless snapshot binding.
//!
//! The player renders into an offscreen surface; every progress change is a
//! seek + flush + pixel copy into a reused buffer, published as an immutable
//! [`Snapshot`] for the host's image primitive. Slower than a live view, for
//! hosts that cannot embed a foreign surface in their draw tree.

use std::sync::Arc;

use log::{debug, warn};

use crate::binding::{AnimationBinding, StateBinding, SyncReport};
use crate::clock::ClockTick;
use crate::config::{BindingConfig, ProgressDriver};
use crate::error::BindingError;
use crate::events::{AnimationEvent, ListenerRef};
use crate::frame::frame_index;
use crate::lifecycle::HandleState;
use crate::port::{SeekGranularity, SnapshotPort};
use crate::state::AnimationState;

const BYTES_PER_PIXEL: usize = 4;

/// A copied frame: premultiplied RGBA8, tightly packed rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
    /// Incremented for every captured frame; 0 for the placeholder.
    pub generation: u64,
}

impl Snapshot {
    /// 1x1 transparent placeholder shown before the first frame.
    pub fn empty() -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: Arc::from(vec![0u8; BYTES_PER_PIXEL]),
            generation: 0,
        }
    }

    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Default)]
struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    fn resize(&mut self, width: u32, height: u32) {
        if self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data
            .resize(width as usize * height as usize * BYTES_PER_PIXEL, 0);
    }

    #[inline]
    fn row_bytes(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }
}

/// Snapshot binding over a [`SnapshotPort`].
#[derive(Debug)]
pub struct SnapshotBinding<P: SnapshotPort> {
    inner: AnimationBinding<P>,
    buffer: PixelBuffer,
    surface: Option<(u32, u32)>,
    snapshot: Snapshot,
}

impl<P: SnapshotPort> SnapshotBinding<P> {
    /// `ProgressDriver::Native` has no meaning offscreen and is treated as `Caller`.
    pub fn new(mut config: BindingConfig) -> Self {
        if config.progress_driver == ProgressDriver::Native {
            config.progress_driver = ProgressDriver::Caller;
        }
        Self {
            inner: AnimationBinding::new(config),
            buffer: PixelBuffer::default(),
            surface: None,
            snapshot: Snapshot::empty(),
        }
    }

    pub fn attach(&mut self, create: impl FnOnce() -> P) -> bool {
        self.inner.attach(create)
    }

    pub fn set_listener(&mut self, listener: Option<ListenerRef>) -> bool {
        self.inner.set_listener(listener)
    }

    /// Push changes, rebuild the surface after a new composition and capture a
    /// frame when the progress or the surface changed.
    pub fn sync(&mut self, state: &AnimationState) -> SyncReport {
        let mut report = self.inner.sync(state);
        if self.inner.port().is_none() {
            return report;
        }

        let mut rebuilt = false;
        if report.loaded_composition() {
            rebuilt = self.rebuild_surface(&mut report);
        } else if self.surface.is_none()
            && self.inner.handle_state().has_composition()
            && !report.diff.is_empty()
        {
            // an earlier surface failure is retried on the next state change
            rebuilt = self.rebuild_surface(&mut report);
        }

        if self.surface.is_some() && (rebuilt || report.seeked()) {
            self.capture(state.progress, rebuilt);
        }
        report
    }

    fn rebuild_surface(&mut self, report: &mut SyncReport) -> bool {
        let config = self.inner.config().clone();
        let had_surface = self.surface.take().is_some();
        let Some(port) = self.inner.port_mut() else {
            return false;
        };
        if had_surface {
            port.release_surface();
        }
        let (natural_w, natural_h) = port.composition_size().unwrap_or((0, 0));
        let width = if config.snapshot_width > 0 { config.snapshot_width } else { natural_w };
        let height = if config.snapshot_height > 0 { config.snapshot_height } else { natural_h };
        if width == 0 || height == 0 {
            let err = BindingError::attachment(width, height, "zero-sized surface");
            warn!("{err}");
            report.errors.push(err);
            return false;
        }
        match port.make_offscreen(width, height) {
            Ok(()) => {
                debug!("offscreen surface {width}x{height}");
                self.surface = Some((width, height));
                self.buffer.resize(width, height);
                true
            }
            Err(err) => {
                warn!("{err}");
                report.errors.push(err);
                false
            }
        }
    }

    fn capture(&mut self, progress: f64, seek: bool) {
        let Some(port) = self.inner.port_mut() else {
            return;
        };
        if seek {
            match port.capabilities().seek {
                SeekGranularity::Progress => port.set_progress(progress),
                SeekGranularity::Frame => {
                    let frame = frame_index(progress, port.total_frames());
                    port.set_frame(frame);
                }
            }
            port.flush();
        }
        let row_bytes = self.buffer.row_bytes();
        if port.copy_pixels(&mut self.buffer.data, row_bytes) {
            self.snapshot = Snapshot {
                width: self.buffer.width,
                height: self.buffer.height,
                pixels: Arc::from(self.buffer.data.as_slice()),
                generation: self.snapshot.generation + 1,
            };
        }
    }

    pub fn apply_events(&mut self, state: &mut AnimationState) -> Vec<AnimationEvent> {
        self.inner.apply_events(state)
    }

    /// Advance the progress clock; call [`Self::sync`] afterwards to capture.
    pub fn tick(&mut self, dt: f32, state: &mut AnimationState) -> ClockTick {
        self.inner.tick(dt, state)
    }

    /// Latest captured frame, or the placeholder.
    #[inline]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    #[inline]
    pub fn surface_size(&self) -> Option<(u32, u32)> {
        self.surface
    }

    /// Release the listener, then the surface, then the player.
    pub fn dispose(&mut self) -> bool {
        let had_surface = self.surface.take().is_some();
        let disposed = self.inner.dispose_with(|port| {
            if had_surface {
                port.release_surface();
            }
        });
        if disposed {
            self.buffer = PixelBuffer::default();
        }
        disposed
    }

    #[inline]
    pub fn handle_state(&self) -> HandleState {
        self.inner.handle_state()
    }

    #[inline]
    pub fn binding(&self) -> &AnimationBinding<P> {
        &self.inner
    }

    #[inline]
    pub fn port(&self) -> Option<&P> {
        self.inner.port()
    }

    #[inline]
    pub fn port_mut(&mut self) -> Option<&mut P> {
        self.inner.port_mut()
    }

    /// Forward a host size change to the player. The surface keeps its size
    /// until the next composition change.
    pub fn resize(&mut self) {
        self.inner.resize()
    }
}

impl<P: SnapshotPort> Drop for SnapshotBinding<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<P: SnapshotPort> StateBinding for SnapshotBinding<P> {
    type Port = P;

    fn with_config(config: BindingConfig) -> Self {
        Self::new(config)
    }
    fn attach(&mut self, create: impl FnOnce() -> P) -> bool {
        SnapshotBinding::attach(self, create)
    }
    fn set_listener(&mut self, listener: Option<ListenerRef>) -> bool {
        SnapshotBinding::set_listener(self, listener)
    }
    fn sync(&mut self, state: &AnimationState) -> SyncReport {
        SnapshotBinding::sync(self, state)
    }
    fn apply_events(&mut self, state: &mut AnimationState) -> Vec<AnimationEvent> {
        SnapshotBinding::apply_events(self, state)
    }
    fn tick(&mut self, dt: f32, state: &mut AnimationState) -> ClockTick {
        SnapshotBinding::tick(self, dt, state)
    }
    fn suspend(&mut self) {
        self.inner.suspend()
    }
    fn resume(&mut self) {
        self.inner.resume()
    }
    fn dispose(&mut self) -> bool {
        SnapshotBinding::dispose(self)
    }
    fn handle_state(&self) -> HandleState {
        SnapshotBinding::handle_state(self)
    }
    fn snapshot(&self) -> Option<&Snapshot> {
        Some(&self.snapshot)
    }
}
