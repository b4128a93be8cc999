//! Identifiers and simple allocators for core entities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lookup key for one timeline model inside the `Store`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TimelineId(pub u32);

/// Handle returned by `on`/`once`, used to unregister a listener.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

impl fmt::Display for TimelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tl#{}", self.0)
    }
}

/// Monotonic allocator for TimelineId and ListenerId.
/// Ids are never reused, so a stale handle cannot alias a newer timeline.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_timeline: u32,
    next_listener: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_timeline(&mut self) -> TimelineId {
        let id = TimelineId(self.next_timeline);
        self.next_timeline = self.next_timeline.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener = self.next_listener.wrapping_add(1);
        id
    }
}
