//! Animation events and listener contracts.
//!
//! Native players report playback through a listener. The binding registers a
//! single bridge listener per handle; the bridge forwards each callback to the
//! caller's listener and queues it so the binding can fold it back into the
//! [`AnimationState`](crate::AnimationState).

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Discrete playback signal emitted by a native player.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnimationEvent {
    Start,
    End,
    Cancel,
    Repeat,
    Update { progress: f64 },
}

impl AnimationEvent {
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Cancel => "cancel",
            Self::Repeat => "repeat",
            Self::Update { .. } => "update",
        }
    }
}

/// Callback surface of a native player listener. Every method defaults to a no-op.
pub trait AnimationListener: Send + Sync {
    fn on_start(&self) {}
    fn on_end(&self) {}
    fn on_cancel(&self) {}
    fn on_repeat(&self) {}
    fn on_update(&self, _progress: f64) {}
}

/// Shared listener handle. Identity is the allocation, not the contents.
pub type ListenerRef = Arc<dyn AnimationListener>;

/// Pointer identity of two listener handles.
#[inline]
pub fn same_listener(a: &ListenerRef, b: &ListenerRef) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Invoke the callback matching `event`.
pub fn dispatch(listener: &dyn AnimationListener, event: AnimationEvent) {
    match event {
        AnimationEvent::Start => listener.on_start(),
        AnimationEvent::End => listener.on_end(),
        AnimationEvent::Cancel => listener.on_cancel(),
        AnimationEvent::Repeat => listener.on_repeat(),
        AnimationEvent::Update { progress } => listener.on_update(progress),
    }
}

type Callback = Box<dyn Fn() + Send + Sync>;
type ProgressCallback = Box<dyn Fn(f64) + Send + Sync>;

/// Listener assembled from optional closures.
///
/// ```
/// use pagbind_core::CallbackListener;
/// let listener = CallbackListener::new()
///     .on_end(|| println!("done"))
///     .on_update(|p| println!("at {p}"))
///     .into_ref();
/// # drop(listener);
/// ```
#[derive(Default)]
pub struct CallbackListener {
    start: Option<Callback>,
    end: Option<Callback>,
    cancel: Option<Callback>,
    repeat: Option<Callback>,
    update: Option<ProgressCallback>,
}

impl CallbackListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.start = Some(Box::new(f));
        self
    }

    pub fn on_end(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.end = Some(Box::new(f));
        self
    }

    pub fn on_cancel(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.cancel = Some(Box::new(f));
        self
    }

    pub fn on_repeat(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.repeat = Some(Box::new(f));
        self
    }

    pub fn on_update(mut self, f: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.update = Some(Box::new(f));
        self
    }

    pub fn into_ref(self) -> ListenerRef {
        Arc::new(self)
    }
}

impl fmt::Debug for CallbackListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackListener")
            .field("start", &self.start.is_some())
            .field("end", &self.end.is_some())
            .field("cancel", &self.cancel.is_some())
            .field("repeat", &self.repeat.is_some())
            .field("update", &self.update.is_some())
            .finish()
    }
}

impl AnimationListener for CallbackListener {
    fn on_start(&self) {
        if let Some(f) = &self.start {
            f()
        }
    }
    fn on_end(&self) {
        if let Some(f) = &self.end {
            f()
        }
    }
    fn on_cancel(&self) {
        if let Some(f) = &self.cancel {
            f()
        }
    }
    fn on_repeat(&self) {
        if let Some(f) = &self.repeat {
            f()
        }
    }
    fn on_update(&self, progress: f64) {
        if let Some(f) = &self.update {
            f(progress)
        }
    }
}

/// FIFO of events waiting to be folded into the state.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Mutex<Vec<AnimationEvent>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: AnimationEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    pub fn drain(&self) -> Vec<AnimationEvent> {
        std::mem::take(
            &mut *self
                .events
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn callback_listener_routes_events() {
        let ends = Arc::new(AtomicUsize::new(0));
        let seen = ends.clone();
        let listener = CallbackListener::new()
            .on_end(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .into_ref();
        dispatch(listener.as_ref(), AnimationEvent::End);
        dispatch(listener.as_ref(), AnimationEvent::Start);
        assert_eq!(ends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn identity_is_pointer_based() {
        let a = CallbackListener::new().into_ref();
        let b = CallbackListener::new().into_ref();
        assert!(same_listener(&a, &a.clone()));
        assert!(!same_listener(&a, &b));
    }

    #[test]
    fn queue_drains_in_order() {
        let q = EventQueue::new();
        q.push(AnimationEvent::Start);
        q.push(AnimationEvent::Update { progress: 0.5 });
        assert_eq!(q.len(), 2);
        assert_eq!(
            q.drain(),
            vec![AnimationEvent::Start, AnimationEvent::Update { progress: 0.5 }]
        );
        assert!(q.is_empty());
    }

    #[test]
    fn events_serialize_tagged() {
        let json = serde_json::to_string(&AnimationEvent::Update { progress: 0.25 }).unwrap();
        assert_eq!(json, r#"{"type":"update","progress":0.25}"#);
    }
}
