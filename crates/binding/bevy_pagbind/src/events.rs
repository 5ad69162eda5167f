use bevy::prelude::*;
use pagbind_core::{AnimationEvent, BindingError};

/// A native playback event, after it was folded into the entity's state.
#[derive(Event, Clone, Debug, PartialEq)]
pub struct PagAnimationEvent {
    pub entity: Entity,
    pub event: AnimationEvent,
}

/// A sync that reported an error (decode failure, surface failure).
#[derive(Event, Clone, Debug, PartialEq)]
pub struct PagBindingError {
    pub entity: Entity,
    pub error: BindingError,
}

/// Host lifecycle forwarded to every binding. Apps map their platform
/// lifecycle (backgrounding, occlusion) onto these.
#[derive(Event, Copy, Clone, Debug, PartialEq, Eq)]
pub enum PagHostLifecycle {
    Suspend,
    Resume,
}
