//! Timeline events, listener registry and deferred delivery.
//!
//! Reducers only queue `TimelineEvent`s. After a dispatch the engine pairs each queued
//! event with the listeners registered at that moment and hands back `Delivery` values;
//! the caller invokes them once the engine is no longer borrowed, so listeners may call
//! back into the timeline.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::ids::{ListenerId, TimelineId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineEvent {
    Cancel,
    Config,
    Finish,
    Pause,
    Play,
    Reverse,
    Update,
}

impl TimelineEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            TimelineEvent::Cancel => "cancel",
            TimelineEvent::Config => "config",
            TimelineEvent::Finish => "finish",
            TimelineEvent::Pause => "pause",
            TimelineEvent::Play => "play",
            TimelineEvent::Reverse => "reverse",
            TimelineEvent::Update => "update",
        }
    }
}

impl fmt::Display for TimelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives the timeline's current time at emission.
pub type Listener = Rc<dyn Fn(f64)>;

struct Entry {
    id: ListenerId,
    event: TimelineEvent,
    once: bool,
    listener: Listener,
}

#[derive(Default)]
pub(crate) struct ListenerTable {
    entries: HashMap<TimelineId, Vec<Entry>>,
}

impl fmt::Debug for ListenerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<(TimelineId, usize)> =
            self.entries.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("ListenerTable").field("counts", &counts).finish()
    }
}

impl ListenerTable {
    pub(crate) fn on(
        &mut self,
        timeline: TimelineId,
        id: ListenerId,
        event: TimelineEvent,
        listener: Listener,
        once: bool,
    ) {
        self.entries.entry(timeline).or_default().push(Entry {
            id,
            event,
            once,
            listener,
        });
    }

    /// Remove one listener. Returns whether it was registered.
    pub(crate) fn off(&mut self, timeline: TimelineId, id: ListenerId) -> bool {
        let Some(list) = self.entries.get_mut(&timeline) else {
            return false;
        };
        let before = list.len();
        list.retain(|e| e.id != id);
        before != list.len()
    }

    pub(crate) fn clear(&mut self, timeline: TimelineId) {
        self.entries.remove(&timeline);
    }

    /// Snapshot listeners for `event`, dropping `once` entries from the table.
    pub(crate) fn take(&mut self, timeline: TimelineId, event: TimelineEvent) -> Vec<Listener> {
        let Some(list) = self.entries.get_mut(&timeline) else {
            return Vec::new();
        };
        let out: Vec<Listener> = list
            .iter()
            .filter(|e| e.event == event)
            .map(|e| e.listener.clone())
            .collect();
        list.retain(|e| !(e.once && e.event == event));
        out
    }

    #[cfg(test)]
    pub(crate) fn count(&self, timeline: TimelineId) -> usize {
        self.entries.get(&timeline).map_or(0, Vec::len)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Emission {
    pub timeline: TimelineId,
    pub event: TimelineEvent,
    pub time: f64,
}

/// An emitted event bound to the listeners that must observe it.
pub struct Delivery {
    pub emission: Emission,
    listeners: Vec<Listener>,
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("emission", &self.emission)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Delivery {
    pub(crate) fn new(emission: Emission, listeners: Vec<Listener>) -> Self {
        Self {
            emission,
            listeners,
        }
    }

    /// Invoke every listener in registration order. With `isolate`, a panicking listener
    /// is logged and the remaining listeners still run.
    pub fn deliver(self, isolate: bool) {
        let Emission {
            timeline,
            event,
            time,
        } = self.emission;
        for listener in self.listeners {
            if !isolate {
                listener(time);
                continue;
            }
            if catch_unwind(AssertUnwindSafe(|| listener(time))).is_err() {
                log::error!("{timeline}: '{event}' listener panicked");
            }
        }
    }
}
