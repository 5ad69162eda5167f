//! At-most-one listener registration per handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::events::{dispatch, same_listener, AnimationEvent, AnimationListener, EventQueue, ListenerRef};
use crate::port::NativePlayerPort;

/// The listener actually registered with the native player. Forwards to the
/// caller's listener and records the event for the binding. Callbacks arriving
/// after detachment are dropped.
struct ListenerBridge {
    user: Option<ListenerRef>,
    queue: Arc<EventQueue>,
    active: AtomicBool,
}

impl ListenerBridge {
    fn deliver(&self, event: AnimationEvent) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        if let Some(user) = &self.user {
            dispatch(user.as_ref(), event);
        }
        self.queue.push(event);
    }
}

impl AnimationListener for ListenerBridge {
    fn on_start(&self) {
        self.deliver(AnimationEvent::Start)
    }
    fn on_end(&self) {
        self.deliver(AnimationEvent::End)
    }
    fn on_cancel(&self) {
        self.deliver(AnimationEvent::Cancel)
    }
    fn on_repeat(&self) {
        self.deliver(AnimationEvent::Repeat)
    }
    fn on_update(&self, progress: f64) {
        self.deliver(AnimationEvent::Update { progress })
    }
}

/// Tracks the caller's listener and the bridge registered on the port.
pub struct ListenerSlot {
    queue: Arc<EventQueue>,
    user: Option<ListenerRef>,
    registered: Option<Arc<ListenerBridge>>,
}

impl std::fmt::Debug for ListenerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSlot")
            .field("has_user", &self.user.is_some())
            .field("registered", &self.registered.is_some())
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl ListenerSlot {
    pub fn new(queue: Arc<EventQueue>) -> Self {
        Self {
            queue,
            user: None,
            registered: None,
        }
    }

    /// Register a bridge on `port` if none is registered yet.
    pub fn attach<P: NativePlayerPort>(&mut self, port: &mut P) -> bool {
        if self.registered.is_some() {
            return false;
        }
        let bridge = Arc::new(ListenerBridge {
            user: self.user.clone(),
            queue: self.queue.clone(),
            active: AtomicBool::new(true),
        });
        let as_ref: ListenerRef = bridge.clone();
        port.add_listener(as_ref);
        self.registered = Some(bridge);
        true
    }

    /// Swap the caller's listener. The old bridge is removed before the new one
    /// is added, inside this call. Returns false when the listener is unchanged.
    pub fn replace<P: NativePlayerPort>(&mut self, port: Option<&mut P>, user: Option<ListenerRef>) -> bool {
        let unchanged = match (&self.user, &user) {
            (None, None) => true,
            (Some(a), Some(b)) => same_listener(a, b),
            _ => false,
        };
        if unchanged {
            return false;
        }
        self.user = user;
        if let Some(port) = port {
            if self.registered.is_some() {
                self.detach(port);
                self.attach(port);
            }
        }
        true
    }

    /// Deactivate and remove the registered bridge.
    pub fn detach<P: NativePlayerPort>(&mut self, port: &mut P) -> bool {
        match self.registered.take() {
            Some(bridge) => {
                bridge.active.store(false, Ordering::Release);
                let as_ref: ListenerRef = bridge;
                port.remove_listener(&as_ref);
                true
            }
            None => false,
        }
    }

    /// Deliver an event produced by the binding itself (e.g. clock wraparound)
    /// through the registered bridge.
    pub fn emit(&self, event: AnimationEvent) {
        if let Some(bridge) = &self.registered {
            bridge.deliver(event);
        }
    }

    /// Deactivate the bridge without a port (the port is already gone).
    pub(crate) fn forget(&mut self) {
        if let Some(bridge) = self.registered.take() {
            bridge.active.store(false, Ordering::Release);
        }
    }

    #[inline]
    pub fn is_registered(&self) -> bool {
        self.registered.is_some()
    }

    #[inline]
    pub fn current(&self) -> Option<&ListenerRef> {
        self.user.as_ref()
    }
}
