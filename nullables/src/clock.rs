//! Nullable block clock: deterministic block time and height for testing.

use std::cell::Cell;

use tessera_types::Timestamp;

/// A deterministic block clock.
///
/// Time only advances when you tell it to. Every advance also produces a new
/// block height, mirroring a chain where each block carries its own time.
pub struct NullClock {
    current: Cell<u64>,
    height: Cell<u64>,
}

impl NullClock {
    pub fn new(initial_secs: u64) -> Self {
        Self {
            current: Cell::new(initial_secs),
            height: Cell::new(1),
        }
    }

    /// Get the current block time.
    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.current.get())
    }

    /// Current block height.
    pub fn height(&self) -> u64 {
        self.height.get()
    }

    /// Move to the next block, `secs` seconds later.
    pub fn advance(&self, secs: u64) {
        self.current.set(self.current.get().saturating_add(secs));
        self.height.set(self.height.get().saturating_add(1));
    }

    /// Jump to a specific block time (height still advances by one).
    pub fn set(&self, secs: u64) {
        self.current.set(secs);
        self.height.set(self.height.get().saturating_add(1));
    }
}
