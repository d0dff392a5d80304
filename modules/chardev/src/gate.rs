use core::sync::atomic::{AtomicBool, Ordering};

use crate::ChardevError;

/// Lets at most one session hold the device open.
pub struct SessionGate {
    is_open: AtomicBool,
}

impl SessionGate {
    pub const fn new() -> Self {
        Self {
            is_open: AtomicBool::new(false),
        }
    }

    /// Check-and-set in one step. `Busy` leaves the gate untouched.
    pub fn acquire(&self) -> Result<(), ChardevError> {
        self.is_open
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| ())
            .map_err(|_| ChardevError::Busy)
    }

    pub fn release(&self) {
        self.is_open.store(false, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.is_open.load(Ordering::Acquire)
    }
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}
