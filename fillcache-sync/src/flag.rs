//! Compare-and-swap boolean.

use std::sync::atomic::{AtomicBool, Ordering};

/// A boolean whose transitions report whether the caller caused them.
///
/// `set_true` and `set_false` only succeed when they actually flip the
/// state, which makes the flag usable as a "first caller wins" guard.
#[derive(Debug, Default)]
pub struct AtomicFlag(AtomicBool);

impl AtomicFlag {
    /// Creates a flag in the given state.
    pub const fn new(state: bool) -> Self {
        Self(AtomicBool::new(state))
    }

    /// Returns the current state.
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Flips false to true. Returns true if this call changed the state.
    pub fn set_true(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Flips true to false. Returns true if this call changed the state.
    pub fn set_false(&self) -> bool {
        self.0
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
