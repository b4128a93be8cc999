//! Core configuration for keyflow-timeline-core.

use serde::{Deserialize, Serialize};

/// Engine-wide settings shared by every timeline created from one `Engine`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Easing applied to keyframes when neither the keyframe nor its configuration names one.
    pub default_easing: String,

    /// Upper bound on repeat wrap-arounds processed in a single frame. A frame delta
    /// spanning more iterations than this pins time inside the current iteration.
    pub max_wraps_per_tick: u32,

    /// Catch panics raised by event listeners so one listener cannot abort a frame.
    pub isolate_listener_panics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_easing: "linear".to_string(),
            max_wraps_per_tick: 64,
            isolate_listener_panics: true,
        }
    }
}
