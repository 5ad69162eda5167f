//! Native player port traits.
//!
//! One adapter per platform implements [`NativePlayerPort`]; the binding in
//! [`crate::binding`] only ever talks to the trait. Commands are fire-and-forget
//! and must be called from the thread that owns the UI element.

use crate::error::{BindingError, DecodeError};
use crate::events::ListenerRef;
use crate::frame::progress_for_frame;
use crate::state::ScaleMode;

/// How a player accepts seeks.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SeekGranularity {
    /// `set_progress` with a normalized position.
    #[default]
    Progress,
    /// `set_frame` with an absolute frame index in `[0, total_frames]`.
    Frame,
}

/// Which optional settings a player honours. Unsupported settings are skipped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PortCapabilities {
    pub seek: SeekGranularity,
    pub scale_mode: bool,
    pub render_scale: bool,
    pub cache_all_frames: bool,
}

impl Default for PortCapabilities {
    fn default() -> Self {
        Self {
            seek: SeekGranularity::Progress,
            scale_mode: true,
            render_scale: true,
            cache_all_frames: true,
        }
    }
}

impl PortCapabilities {
    /// A view that renders through the platform view tree (repeat + scale mode).
    pub fn view() -> Self {
        Self {
            seek: SeekGranularity::Progress,
            scale_mode: true,
            render_scale: false,
            cache_all_frames: false,
        }
    }

    /// A frame-cached image view (repeat, render scale, frame cache; frame seeks).
    pub fn image_view() -> Self {
        Self {
            seek: SeekGranularity::Frame,
            scale_mode: false,
            render_scale: true,
            cache_all_frames: true,
        }
    }
}

/// Narrow call surface of a native animation player.
pub trait NativePlayerPort {
    /// Decoded animation owned by the native library.
    type Composition;

    /// Decode bytes. Either a usable composition or an error, never a partial result.
    fn load(&mut self, bytes: &[u8]) -> Result<Self::Composition, DecodeError>;

    /// Replace the current composition; `None` detaches it.
    fn set_composition(&mut self, composition: Option<Self::Composition>);

    /// Frame count of the current composition, 0 when none is attached.
    fn total_frames(&self) -> u64;

    fn capabilities(&self) -> PortCapabilities {
        PortCapabilities::default()
    }

    fn play(&mut self);
    fn pause(&mut self);

    fn set_progress(&mut self, progress: f64);

    fn set_frame(&mut self, frame: u64) {
        let total = self.total_frames();
        self.set_progress(progress_for_frame(frame, total));
    }

    /// Synchronous redraw of the current position.
    fn flush(&mut self);

    fn set_repeat_count(&mut self, count: i32);

    fn set_scale_mode(&mut self, _mode: ScaleMode) {}

    fn set_render_scale(&mut self, _scale: f32) {}

    fn set_cache_all_frames_in_memory(&mut self, _enabled: bool) {}

    fn add_listener(&mut self, listener: ListenerRef);

    /// Remove by identity; unknown listeners are ignored.
    fn remove_listener(&mut self, listener: &ListenerRef);

    /// The hosting surface changed size.
    fn update_size(&mut self) {}

    /// Free native resources. Called once; no other method follows it.
    fn release(&mut self);
}

/// A player that renders into an offscreen surface whose pixels can be copied out.
pub trait SnapshotPort: NativePlayerPort {
    /// Intrinsic size of the current composition.
    fn composition_size(&self) -> Option<(u32, u32)>;

    /// Create an offscreen surface and attach it to the player.
    fn make_offscreen(&mut self, width: u32, height: u32) -> Result<(), BindingError>;

    /// Release the current offscreen surface, if any.
    fn release_surface(&mut self);

    /// Copy the last flushed frame as premultiplied RGBA8 rows into `dst`.
    /// Returns false when no frame could be copied.
    fn copy_pixels(&mut self, dst: &mut [u8], row_bytes: usize) -> bool;
}
