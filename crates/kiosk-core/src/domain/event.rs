//! Input event entity.

use std::time::Instant;

use crate::keymap::SymbolicKey;

/// One accepted raw key signal, normalised to a symbolic key.
///
/// Created once per accepted signal by a device backend, shared read-only
/// with every subscriber of `key`, then dropped.  `raw_code` is kept for
/// diagnostics only; nothing routes on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    /// The symbolic key the raw code resolved to.
    pub key: SymbolicKey,
    /// The backend-specific code as read from the device.  `0` for simulated
    /// signals.
    pub raw_code: i32,
    /// Monotonic time at which the signal was accepted.
    pub timestamp: Instant,
}

impl InputEvent {
    /// Creates an event stamped with the current monotonic time.
    pub fn now(key: SymbolicKey, raw_code: i32) -> Self {
        Self::at(key, raw_code, Instant::now())
    }

    /// Creates an event with an explicit timestamp.
    pub fn at(key: SymbolicKey, raw_code: i32, timestamp: Instant) -> Self {
        Self {
            key,
            raw_code,
            timestamp,
        }
    }

    /// Creates a simulated event (raw code `0`) stamped now.
    pub fn simulated(key: SymbolicKey) -> Self {
        Self::now(key, 0)
    }
}
