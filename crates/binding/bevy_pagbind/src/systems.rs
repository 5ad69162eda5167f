use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use pagbind_core::{Snapshot, StateBinding};

use crate::components::{PagAnimation, PagListener, PagSnapshot};
use crate::events::{PagAnimationEvent, PagBindingError, PagHostLifecycle};
use crate::resources::{FixedDt, PagBindingSettings, PagBindings};

/// Creates a binding and its native player for every new `PagAnimation`.
pub fn attach_system<B: StateBinding + Send + Sync + 'static>(
    added: Query<Entity, Added<PagAnimation>>,
    settings: Res<PagBindingSettings<B>>,
    mut bindings: ResMut<PagBindings<B>>,
) {
    for entity in added.iter() {
        let binding = bindings
            .map
            .entry(entity)
            .or_insert_with(|| B::with_config(settings.config.clone()));
        if binding.attach(|| (settings.factory)()) {
            debug!("pag player attached to {entity:?}");
        }
    }
}

/// Swaps listeners on changed `PagListener`s and detaches removed ones.
pub fn listener_system<B: StateBinding + Send + Sync + 'static>(
    changed: Query<(Entity, &PagListener), Changed<PagListener>>,
    mut removed: RemovedComponents<PagListener>,
    mut bindings: ResMut<PagBindings<B>>,
) {
    for entity in removed.read() {
        if let Some(binding) = bindings.get_mut(entity) {
            binding.set_listener(None);
        }
    }
    for (entity, listener) in changed.iter() {
        if let Some(binding) = bindings.get_mut(entity) {
            binding.set_listener(Some(listener.0.clone()));
        }
    }
}

/// Fixed-rate progress clock. Only bindings configured with the clock
/// driver advance; others report idle and leave the state untouched.
pub fn clock_system<B: StateBinding + Send + Sync + 'static>(
    dt: Res<FixedDt>,
    mut bindings: ResMut<PagBindings<B>>,
    mut query: Query<(Entity, &mut PagAnimation)>,
) {
    for (entity, mut anim) in query.iter_mut() {
        let Some(binding) = bindings.get_mut(entity) else {
            continue;
        };
        let tick = binding.tick(dt.0, &mut anim.bypass_change_detection().0);
        if tick.progress().is_some() {
            anim.set_changed();
        }
    }
}

/// Pushes changed states to their players.
pub fn sync_system<B: StateBinding + Send + Sync + 'static>(
    mut bindings: ResMut<PagBindings<B>>,
    query: Query<(Entity, &PagAnimation), Changed<PagAnimation>>,
    mut errors: EventWriter<PagBindingError>,
) {
    for (entity, anim) in query.iter() {
        let Some(binding) = bindings.get_mut(entity) else {
            continue;
        };
        let report = binding.sync(&anim.0);
        for error in report.errors {
            warn!("pag sync on {entity:?}: {error}");
            errors.send(PagBindingError { entity, error });
        }
    }
}

/// Folds native events into the state and re-emits them as ECS events.
pub fn apply_events_system<B: StateBinding + Send + Sync + 'static>(
    mut bindings: ResMut<PagBindings<B>>,
    mut query: Query<(Entity, &mut PagAnimation)>,
    mut out: EventWriter<PagAnimationEvent>,
) {
    for (entity, mut anim) in query.iter_mut() {
        let Some(binding) = bindings.get_mut(entity) else {
            continue;
        };
        let events = binding.apply_events(&mut anim.bypass_change_detection().0);
        if events.is_empty() {
            continue;
        }
        anim.set_changed();
        out.send_batch(events.into_iter().map(|event| PagAnimationEvent { entity, event }));
    }
}

/// Copies new headless frames into `PagSnapshot` and, when available, its image.
pub fn snapshot_system<B: StateBinding + Send + Sync + 'static>(
    bindings: Res<PagBindings<B>>,
    mut query: Query<(Entity, &mut PagSnapshot)>,
    mut images: Option<ResMut<Assets<Image>>>,
) {
    for (entity, mut target) in query.iter_mut() {
        let Some(frame) = bindings.get(entity).and_then(|b| b.snapshot()) else {
            continue;
        };
        if frame.generation == target.frame.generation {
            continue;
        }
        target.frame = frame.clone();
        if let (Some(images), Some(handle)) = (images.as_deref_mut(), target.image.as_ref()) {
            images.insert(handle.id(), snapshot_image(frame));
        }
    }
}

fn snapshot_image(frame: &Snapshot) -> Image {
    Image::new(
        Extent3d {
            width: frame.width,
            height: frame.height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        frame.pixels.to_vec(),
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}

pub fn host_lifecycle_system<B: StateBinding + Send + Sync + 'static>(
    mut lifecycle: EventReader<PagHostLifecycle>,
    mut bindings: ResMut<PagBindings<B>>,
) {
    for event in lifecycle.read() {
        for binding in bindings.map.values_mut() {
            match event {
                PagHostLifecycle::Suspend => binding.suspend(),
                PagHostLifecycle::Resume => binding.resume(),
            }
        }
    }
}

/// Disposes bindings whose entity lost its `PagAnimation` or was despawned.
pub fn dispose_system<B: StateBinding + Send + Sync + 'static>(
    mut removed: RemovedComponents<PagAnimation>,
    mut bindings: ResMut<PagBindings<B>>,
) {
    for entity in removed.read() {
        if let Some(mut binding) = bindings.map.remove(&entity) {
            binding.dispose();
            debug!("pag player released for {entity:?}");
        }
    }
}
