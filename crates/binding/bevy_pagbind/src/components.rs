use bevy::prelude::*;
use pagbind_core::{AnimationState, ListenerRef, Snapshot};

/// Animation state driven by the plugin. Mutating it schedules a sync; the
/// plugin writes native progress and completion back into it.
#[derive(Component, Clone, Debug, Default)]
pub struct PagAnimation(pub AnimationState);

impl PagAnimation {
    pub fn new(state: AnimationState) -> Self {
        Self(state)
    }
}

/// Caller listener for the entity's player. Replacing the component swaps
/// the registration; removing it detaches the listener.
#[derive(Component, Clone)]
pub struct PagListener(pub ListenerRef);

/// Receives frames from headless bindings. When `image` is set and an
/// `Assets<Image>` store exists, each new frame also replaces that image.
#[derive(Component, Clone, Debug, Default)]
pub struct PagSnapshot {
    pub frame: Snapshot,
    pub image: Option<Handle<Image>>,
}

impl PagSnapshot {
    pub fn with_image(image: Handle<Image>) -> Self {
        Self {
            frame: Snapshot::empty(),
            image: Some(image),
        }
    }
}
