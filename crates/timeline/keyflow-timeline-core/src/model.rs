//! Per-timeline state record.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::TimelineId;
use crate::keyframes::TargetConfiguration;
use crate::options::Repeat;
use crate::plugin::AnimationController;
use crate::value::{References, Target};

/// Playback state.
///
/// `Pending` means activated (configs compiled) but not advancing, e.g. after a seek or
/// pause on an idle timeline. `Cancelled` and `Destroyed` are terminal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimelineState {
    #[default]
    Idle,
    Pending,
    Running,
    Paused,
    Finished,
    Cancelled,
    Destroyed,
}

impl TimelineState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, TimelineState::Cancelled | TimelineState::Destroyed)
    }
}

/// Live controller for one compiled effect, tagged with the configuration it came from.
pub struct AnimationPlayer {
    pub config: usize,
    pub target: Target,
    pub prop: String,
    pub from: f64,
    pub to: f64,
    pub controller: Box<dyn AnimationController>,
}

impl fmt::Debug for AnimationPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationPlayer")
            .field("config", &self.config)
            .field("target", &self.target)
            .field("prop", &self.prop)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct TimelineModel {
    pub id: TimelineId,
    pub name: Option<String>,
    pub configs: Vec<TargetConfiguration>,
    /// Total length in ms: `max(to + max(end_delay, 0))` over configs.
    pub duration: f64,
    /// Insertion point for the next appended block.
    pub cursor: f64,
    pub rate: f64,
    pub refs: References,
    pub repeat: Repeat,
    /// Completed iterations.
    pub round: u32,
    pub state: TimelineState,
    pub time: f64,
    pub yoyo: bool,
    pub players: Vec<AnimationPlayer>,
    /// Destroy once finished.
    pub destroy: bool,
    /// `(cursor, duration)` at the last activation.
    pub(crate) compiled_extent: Option<(f64, f64)>,
}

impl TimelineModel {
    pub fn new(id: TimelineId, name: Option<String>, refs: References) -> Self {
        Self {
            id,
            name,
            configs: Vec::new(),
            duration: 0.0,
            cursor: 0.0,
            rate: 1.0,
            refs,
            repeat: Repeat::default(),
            round: 0,
            state: TimelineState::Idle,
            time: 0.0,
            yoyo: false,
            players: Vec::new(),
            destroy: false,
            compiled_extent: None,
        }
    }

    /// Recompute `duration` and `cursor` from the configurations.
    pub fn recompute_extent(&mut self) {
        let mut duration = 0.0f64;
        let mut cursor = 0.0f64;
        for c in &self.configs {
            duration = duration.max(c.to + c.end_delay.max(0.0));
            cursor = cursor.max(c.to + c.end_delay);
        }
        self.duration = duration;
        self.cursor = cursor.max(0.0);
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == TimelineState::Running
    }
}
