//! The observable animation state owned by the UI call site.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Repeat count meaning "loop forever".
pub const REPEAT_INFINITE: i32 = -1;

/// How a composition is fitted into its render target.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScaleMode {
    None,
    Stretch,
    #[default]
    LetterBox,
    Zoom,
}

impl ScaleMode {
    /// Numeric value used by the native libraries (None = 0 .. Zoom = 3).
    #[inline]
    pub fn as_index(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Stretch => 1,
            Self::LetterBox => 2,
            Self::Zoom => 3,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::None),
            1 => Some(Self::Stretch),
            2 => Some(Self::LetterBox),
            3 => Some(Self::Zoom),
            _ => None,
        }
    }
}

/// Encoded animation bytes. Cloning shares the buffer.
#[derive(Clone)]
pub struct Source(Arc<[u8]>);

impl Source {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Same buffer, or same contents.
impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0[..] == other.0[..]
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Source({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl From<&[u8]> for Source {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

/// Mutable animation state. A binding observes it and pushes changed fields
/// to the native player; native events write `is_completed` and `progress` back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationState {
    /// Encoded animation; `None` means nothing is loaded.
    #[serde(skip)]
    pub source: Option<Source>,
    pub is_playing: bool,
    /// Set on the end event, cleared on the start event.
    pub is_completed: bool,
    /// Normalized playhead position in [0, 1].
    pub progress: f64,
    /// Number of plays; [`REPEAT_INFINITE`] loops forever.
    pub repeat_count: i32,
    pub render_scale: f32,
    pub scale_mode: ScaleMode,
    /// Keeps every decoded frame in memory. Memory heavy.
    pub cache_all_frames_in_memory: bool,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            source: None,
            is_playing: false,
            is_completed: false,
            progress: 0.0,
            repeat_count: REPEAT_INFINITE,
            render_scale: 1.0,
            scale_mode: ScaleMode::LetterBox,
            cache_all_frames_in_memory: false,
        }
    }
}

impl AnimationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl Into<Source>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn set_source(&mut self, source: impl Into<Source>) {
        self.source = Some(source.into());
    }

    pub fn clear_source(&mut self) {
        self.source = None;
    }

    /// Fields that differ from `previous`. With no previous snapshot every
    /// pushed field counts as changed.
    pub fn diff(&self, previous: Option<&AnimationState>) -> StateDiff {
        let Some(prev) = previous else {
            return StateDiff::all();
        };
        StateDiff {
            source: self.source != prev.source,
            is_playing: self.is_playing != prev.is_playing,
            progress: float_changed(self.progress, prev.progress),
            repeat_count: self.repeat_count != prev.repeat_count,
            render_scale: float_changed(f64::from(self.render_scale), f64::from(prev.render_scale)),
            scale_mode: self.scale_mode != prev.scale_mode,
            cache_all_frames_in_memory: self.cache_all_frames_in_memory
                != prev.cache_all_frames_in_memory,
        }
    }
}

fn float_changed(a: f64, b: f64) -> bool {
    !(a == b || (a.is_nan() && b.is_nan()))
}

/// Per-field change flags between two states. `is_completed` is never pushed
/// to the player, so it has no flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StateDiff {
    pub source: bool,
    pub is_playing: bool,
    pub progress: bool,
    pub repeat_count: bool,
    pub render_scale: bool,
    pub scale_mode: bool,
    pub cache_all_frames_in_memory: bool,
}

impl StateDiff {
    pub fn all() -> Self {
        Self {
            source: true,
            is_playing: true,
            progress: true,
            repeat_count: true,
            render_scale: true,
            scale_mode: true,
            cache_all_frames_in_memory: true,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[inline]
    pub fn touches_config(&self) -> bool {
        self.repeat_count || self.render_scale || self.scale_mode || self.cache_all_frames_in_memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_player_defaults() {
        let s = AnimationState::default();
        assert_eq!(s.repeat_count, REPEAT_INFINITE);
        assert_eq!(s.render_scale, 1.0);
        assert_eq!(s.scale_mode, ScaleMode::LetterBox);
        assert!(s.source.is_none());
    }

    #[test]
    fn first_diff_marks_everything() {
        let s = AnimationState::default();
        assert_eq!(s.diff(None), StateDiff::all());
    }

    #[test]
    fn diff_only_flags_changed_fields() {
        let a = AnimationState::default();
        let mut b = a.clone();
        b.progress = 0.5;
        b.is_completed = true;
        let d = b.diff(Some(&a));
        assert!(d.progress);
        assert!(!d.is_playing && !d.source && !d.touches_config());
    }

    #[test]
    fn sources_compare_by_content() {
        let a = AnimationState::default().with_source(vec![1u8, 2, 3]);
        let b = AnimationState::default().with_source(vec![1u8, 2, 3]);
        assert!(!b.diff(Some(&a)).source);
        let c = AnimationState::default().with_source(vec![1u8, 2]);
        assert!(c.diff(Some(&a)).source);
    }

    #[test]
    fn nan_progress_is_stable() {
        let mut a = AnimationState::default();
        a.progress = f64::NAN;
        let b = a.clone();
        assert!(!b.diff(Some(&a)).progress);
    }

    #[test]
    fn scale_mode_indices_round_trip() {
        for mode in [ScaleMode::None, ScaleMode::Stretch, ScaleMode::LetterBox, ScaleMode::Zoom] {
            assert_eq!(ScaleMode::from_index(mode.as_index()), Some(mode));
        }
        assert_eq!(ScaleMode::from_index(9), None);
    }
}
