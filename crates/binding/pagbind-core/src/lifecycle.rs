//! Exclusive ownership of one native player handle.
//!
//! `Unattached -> Attached { has_composition } -> Released`. Acquisition is
//! idempotent, release happens at most once and `Released` is terminal.

use serde::{Deserialize, Serialize};

use crate::port::NativePlayerPort;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleState {
    Unattached,
    Attached { has_composition: bool },
    Released,
}

impl HandleState {
    #[inline]
    pub fn is_attached(&self) -> bool {
        matches!(self, Self::Attached { .. })
    }

    #[inline]
    pub fn has_composition(&self) -> bool {
        matches!(
            self,
            Self::Attached {
                has_composition: true
            }
        )
    }
}

/// Holds the handle created on first attachment and releases it on teardown.
#[derive(Debug)]
pub struct PlayerSlot<P: NativePlayerPort> {
    port: Option<P>,
    state: HandleState,
    created: u32,
}

impl<P: NativePlayerPort> Default for PlayerSlot<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: NativePlayerPort> PlayerSlot<P> {
    pub fn new() -> Self {
        Self {
            port: None,
            state: HandleState::Unattached,
            created: 0,
        }
    }

    /// Return the existing handle or create one. `None` once released.
    pub fn acquire(&mut self, create: impl FnOnce() -> P) -> Option<&mut P> {
        match self.state {
            HandleState::Released => None,
            HandleState::Attached { .. } => self.port.as_mut(),
            HandleState::Unattached => {
                self.created += 1;
                self.state = HandleState::Attached {
                    has_composition: false,
                };
                Some(self.port.insert(create()))
            }
        }
    }

    /// The live handle, if attached.
    #[inline]
    pub fn get(&self) -> Option<&P> {
        if self.state.is_attached() {
            self.port.as_ref()
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut P> {
        if self.state.is_attached() {
            self.port.as_mut()
        } else {
            None
        }
    }

    pub(crate) fn set_has_composition(&mut self, has_composition: bool) {
        if self.state.is_attached() {
            self.state = HandleState::Attached { has_composition };
        }
    }

    /// Release the handle. Safe on a never-created or already released slot;
    /// returns whether this call did the release.
    pub fn release(&mut self) -> bool {
        let was_attached = self.state.is_attached();
        self.state = HandleState::Released;
        match self.port.take() {
            Some(mut port) if was_attached => {
                port.release();
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn state(&self) -> HandleState {
        self.state
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.state == HandleState::Released
    }

    /// Number of handles ever created by this slot (0 or 1).
    #[inline]
    pub fn created(&self) -> u32 {
        self.created
    }
}
