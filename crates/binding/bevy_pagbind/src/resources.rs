use std::collections::HashMap;
use std::sync::Arc;

use bevy::prelude::*;
use pagbind_core::{BindingConfig, StateBinding};

/// One binding per entity carrying a [`crate::PagAnimation`].
#[derive(Resource)]
pub struct PagBindings<B: StateBinding + Send + Sync + 'static> {
    pub map: HashMap<Entity, B>,
}

impl<B: StateBinding + Send + Sync + 'static> Default for PagBindings<B> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
        }
    }
}

impl<B: StateBinding + Send + Sync + 'static> PagBindings<B> {
    #[inline]
    pub fn get(&self, entity: Entity) -> Option<&B> {
        self.map.get(&entity)
    }

    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut B> {
        self.map.get_mut(&entity)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Creates the native player on first attachment.
pub type PortFactory<P> = Arc<dyn Fn() -> P + Send + Sync>;

/// Factory and config used for every new binding.
#[derive(Resource)]
pub struct PagBindingSettings<B: StateBinding + Send + Sync + 'static> {
    pub config: BindingConfig,
    pub factory: PortFactory<B::Port>,
}

/// Fixed timestep for the progress clock (seconds per tick).
#[derive(Resource)]
pub struct FixedDt(pub f32);

impl Default for FixedDt {
    fn default() -> Self {
        Self(1.0 / 60.0)
    }
}
