//! Single-reader admission control.
//!
//! The controller is a two-state machine:
//!
//! ```text
//! Closed --open--> Open --close--> Closed
//!                  Open --open--> Busy (no transition)
//! ```
//!
//! The check-and-set on open is one compare-and-swap, so concurrent openers
//! cannot both be admitted.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

use crate::error::DeviceError;

/// Occupancy of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Closed,
    Open,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
        }
    }
}

/// Tracks whether a session is open, plus admission counters.
#[derive(Debug, Default)]
pub struct SessionController {
    occupied: AtomicBool,
    opened: AtomicU64,
    rejected: AtomicU64,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a session, or fail with [`DeviceError::Busy`] without changing
    /// anything but the rejection counter.
    pub fn open(&self) -> Result<(), DeviceError> {
        match self
            .occupied
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                self.opened.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(_) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Err(DeviceError::Busy)
            }
        }
    }

    /// Release the slot. Returns `false` if no session was open; occupancy
    /// never goes below zero.
    pub fn close(&self) -> bool {
        self.occupied.swap(false, Ordering::AcqRel)
    }

    pub fn state(&self) -> SessionState {
        if self.occupied.load(Ordering::Acquire) {
            SessionState::Open
        } else {
            SessionState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Sessions admitted so far.
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    /// Opens refused with `Busy` so far.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}
