//! # Connection State Machine
//!
//! ```text
//! [Unconnected] ──CAS──→ [Connecting] ──CAS──→ [Connected]
//!       ↑                     │                     │
//!       └── connect failed ───┘                     │
//!                                                   ▼
//!            any state ───────dispose──────→ [Disposed]
//! ```
//!
//! Transitions are compare-and-swap on a single atomic, so two racing
//! connect attempts cannot both leave `Unconnected`.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a broker client handle owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Unconnected = 0,
    Connecting = 1,
    Connected = 2,
    Disposed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Unconnected,
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disposed,
        }
    }
}

/// Atomic cell holding a [`ConnectionState`].
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Unconnected as u8))
    }

    #[must_use]
    pub fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move `from → to` atomically.
    ///
    /// Returns the state actually observed when the swap did not happen.
    pub fn transition(
        &self,
        from: ConnectionState,
        to: ConnectionState,
    ) -> Result<(), ConnectionState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(ConnectionState::from_u8)
    }

    /// Enter `Disposed` from any state, returning the previous state.
    pub fn dispose(&self) -> ConnectionState {
        ConnectionState::from_u8(
            self.0
                .swap(ConnectionState::Disposed as u8, Ordering::AcqRel),
        )
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.load() == ConnectionState::Disposed
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
