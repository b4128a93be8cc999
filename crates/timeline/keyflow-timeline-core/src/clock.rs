//! Frame clock.
//!
//! The clock owns no animation semantics. Subscribers are identified by key; each frame
//! yields one `FrameTick` per active key with the frame delta and the time elapsed since
//! that key joined.
//!
//! Subscribe/unsubscribe never touch the active set directly. Requests are staged into
//! pending buffers and committed at the start of the next frame, so callers may change
//! subscriptions while the ticks of the current frame are being dispatched without
//! skipping or duplicating anyone.
//!
//! The host drives frames: whenever `wants_frame()` is true it should call
//! `begin_frame_at` (or `Engine::frame`) on its next refresh.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Source of frame timestamps in milliseconds.
pub trait TimeSource {
    fn now(&self) -> f64;
}

/// Test/host-controlled time. Clones share the same instant.
#[derive(Clone, Debug, Default)]
pub struct ManualTime(Rc<Cell<f64>>);

impl ManualTime {
    pub fn new(start_ms: f64) -> Self {
        Self(Rc::new(Cell::new(start_ms)))
    }

    pub fn set(&self, ms: f64) {
        self.0.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.0.set(self.0.get() + ms);
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> f64 {
        self.0.get()
    }
}

/// Monotonic wall-clock time measured from construction.
#[derive(Clone, Debug)]
pub struct SystemTime {
    origin: Instant,
}

impl SystemTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTime {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// One subscriber's share of a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameTick<K> {
    pub key: K,
    pub delta: f64,
    pub elapsed: f64,
}

#[derive(Debug)]
pub struct Clock<K> {
    active: Vec<K>,
    elapses: Vec<f64>,
    ons: Vec<K>,
    offs: Vec<K>,
    is_active: bool,
    frame_requested: bool,
    last_time: Option<f64>,
}

impl<K> Default for Clock<K> {
    fn default() -> Self {
        Self {
            active: Vec::new(),
            elapses: Vec::new(),
            ons: Vec::new(),
            offs: Vec::new(),
            is_active: false,
            frame_requested: false,
            last_time: None,
        }
    }
}

impl<K: Clone + PartialEq + std::fmt::Debug> Clock<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `key` to join on the next frame. Cancels a pending removal of the same key.
    pub fn subscribe(&mut self, key: K) {
        self.offs.retain(|k| *k != key);
        if !self.ons.contains(&key) {
            self.ons.push(key);
        }
        self.ensure_running();
    }

    /// Stage `key` to leave on the next frame. Cancels a pending join of the same key.
    pub fn unsubscribe(&mut self, key: K) {
        self.ons.retain(|k| *k != key);
        if !self.offs.contains(&key) {
            self.offs.push(key);
        }
        self.ensure_running();
    }

    // Starting while inactive requests one frame so staged changes get committed.
    fn ensure_running(&mut self) {
        if !self.is_active {
            self.is_active = true;
            self.frame_requested = true;
        }
    }

    /// True when the host should run a frame.
    #[inline]
    pub fn wants_frame(&self) -> bool {
        self.frame_requested
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.is_active
    }

    /// Whether `key` will receive ticks on the next frame.
    pub fn is_subscribed(&self, key: &K) -> bool {
        if self.ons.contains(key) {
            return true;
        }
        self.active.contains(key) && !self.offs.contains(key)
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Commit staged changes and compute this frame's ticks.
    ///
    /// Returns an empty list (and stops requesting frames, forgetting the timestamp
    /// baseline) once nobody is subscribed.
    pub fn begin_frame_at(&mut self, now: f64) -> Vec<FrameTick<K>> {
        self.frame_requested = false;

        for key in self.offs.drain(..) {
            if let Some(idx) = self.active.iter().position(|k| *k == key) {
                self.active.remove(idx);
                self.elapses.remove(idx);
            }
        }
        for key in self.ons.drain(..) {
            if !self.active.contains(&key) {
                self.active.push(key);
                self.elapses.push(0.0);
            }
        }

        if self.active.is_empty() {
            log::trace!("clock idle; releasing frame loop");
            self.is_active = false;
            self.last_time = None;
            return Vec::new();
        }

        let last = self.last_time.unwrap_or(now);
        let delta = (now - last).max(0.0);
        self.is_active = true;
        self.frame_requested = true;
        self.last_time = Some(now);

        log::trace!("clock frame: {} subscribers, delta {delta}", self.active.len());
        self.active
            .iter()
            .zip(self.elapses.iter_mut())
            .map(|(key, elapsed)| {
                *elapsed += delta;
                FrameTick {
                    key: key.clone(),
                    delta,
                    elapsed: *elapsed,
                }
            })
            .collect()
    }

    pub fn begin_frame(&mut self, time: &dyn TimeSource) -> Vec<FrameTick<K>> {
        self.begin_frame_at(time.now())
    }
}
