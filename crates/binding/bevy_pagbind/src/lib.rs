//! Bevy adapter for pagbind.
//!
//! Add [`PagBindingPlugin`] with the binding type and a factory for the
//! platform player, then spawn entities with a [`PagAnimation`]. Each entity
//! gets its own binding; despawning it (or removing the component) releases
//! the native player.

use std::marker::PhantomData;
use std::sync::Arc;

use bevy::prelude::*;
use pagbind_core::{BindingConfig, StateBinding};

pub mod components;
pub mod events;
pub mod resources;
pub mod systems;

pub use components::{PagAnimation, PagListener, PagSnapshot};
pub use events::{PagAnimationEvent, PagBindingError, PagHostLifecycle};
pub use resources::{FixedDt, PagBindingSettings, PagBindings, PortFactory};

/// System sets, in execution order within `Update`. Teardown runs first so a
/// `PagAnimation` removed and re-inserted since the last frame gets a fresh
/// binding instead of losing its live one.
#[derive(SystemSet, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PagSet {
    Teardown,
    Attach,
    Sync,
    Events,
}

pub struct PagBindingPlugin<B: StateBinding + Send + Sync + 'static> {
    config: BindingConfig,
    factory: PortFactory<B::Port>,
    _binding: PhantomData<fn() -> B>,
}

impl<B: StateBinding + Send + Sync + 'static> PagBindingPlugin<B> {
    pub fn new(factory: impl Fn() -> B::Port + Send + Sync + 'static) -> Self {
        Self {
            config: BindingConfig::default(),
            factory: Arc::new(factory),
            _binding: PhantomData,
        }
    }

    pub fn with_config(mut self, config: BindingConfig) -> Self {
        self.config = config;
        self
    }
}

impl<B: StateBinding + Send + Sync + 'static> Plugin for PagBindingPlugin<B> {
    fn build(&self, app: &mut App) {
        app.insert_resource(PagBindingSettings::<B> {
            config: self.config.clone(),
            factory: self.factory.clone(),
        })
        .insert_resource(PagBindings::<B>::default())
        .insert_resource(FixedDt(self.config.tick_period()))
        .add_event::<PagAnimationEvent>()
        .add_event::<PagBindingError>()
        .add_event::<PagHostLifecycle>()
        .configure_sets(
            Update,
            (PagSet::Teardown, PagSet::Attach, PagSet::Sync, PagSet::Events).chain(),
        )
        .add_systems(
            Update,
            (
                (systems::attach_system::<B>, systems::listener_system::<B>)
                    .chain()
                    .in_set(PagSet::Attach),
                (systems::host_lifecycle_system::<B>, systems::sync_system::<B>)
                    .chain()
                    .in_set(PagSet::Sync),
                (systems::apply_events_system::<B>, systems::snapshot_system::<B>)
                    .chain()
                    .in_set(PagSet::Events),
                systems::dispose_system::<B>.in_set(PagSet::Teardown),
            ),
        )
        .add_systems(FixedUpdate, systems::clock_system::<B>);
    }
}
