//! pagbind core (host-agnostic)
//!
//! Keeps a native PAG animation player in step with a mutable
//! [`AnimationState`]. Hosts (Bevy, the web) own the state and call into a
//! binding on their update loop; platform adapters implement
//! [`NativePlayerPort`] so the binding never sees a concrete player type.
//!
//! - [`AnimationBinding`]: live mode, the player renders into its own surface.
//! - [`SnapshotBinding`]: headless mode, frames are copied into a [`Snapshot`].

pub mod binding;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod lifecycle;
pub mod listener;
pub mod port;
pub mod snapshot;
pub mod state;

// Re-exports for adapters
pub use binding::{AnimationBinding, PortCommand, StateBinding, SyncReport};
pub use clock::{ClockTick, ProgressClock};
pub use config::{BindingConfig, ProgressDriver, DEFAULT_TICK_HZ, MAX_TICK_HZ, MIN_TICK_HZ};
pub use error::{BindingError, DecodeError};
pub use events::{
    dispatch, same_listener, AnimationEvent, AnimationListener, CallbackListener, EventQueue,
    ListenerRef,
};
pub use frame::{clamp_progress, frame_index, progress_for_frame, wrap_progress};
pub use lifecycle::{HandleState, PlayerSlot};
pub use listener::ListenerSlot;
pub use port::{NativePlayerPort, PortCapabilities, SeekGranularity, SnapshotPort};
pub use snapshot::{Snapshot, SnapshotBinding};
pub use state::{AnimationState, ScaleMode, Source, StateDiff, REPEAT_INFINITE};

pub type Result<T> = core::result::Result<T, BindingError>;
