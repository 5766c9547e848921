//! Single-slot frame coalescer.
//!
//! Pointer moves arrive much faster than the map can redraw. Each move parks
//! its update in one slot, overwriting whatever was waiting; the host is asked
//! for an animation frame only when the slot goes from empty to full, and the
//! frame callback drains it. At most one update is applied per frame.

#[cfg(test)]
#[path = "schedule_test.rs"]
mod schedule_test;

/// Holds at most one pending update of type `T`.
#[derive(Debug, Clone)]
pub struct Coalescer<T> {
    pending: Option<T>,
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> Coalescer<T> {
    /// Park `update`, replacing any pending one. Returns `true` when a frame
    /// must be requested (the slot was empty).
    pub fn schedule(&mut self, update: T) -> bool {
        self.pending.replace(update).is_none()
    }

    /// Drain the slot. Called from the frame callback.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }

    /// Discard the pending update. A frame that still fires finds nothing.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
