//! Error types for timeline operations

use crate::ids::TimelineId;
use crate::model::TimelineState;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum TimelineError {
    /// The id does not name a live model (never created, or destroyed)
    #[error("Timeline not found: {0}")]
    UnknownTimeline(TimelineId),

    /// The model reached a terminal state and ignores further actions
    #[error("Timeline {id} is {state:?}; ignoring {action}")]
    Terminal {
        id: TimelineId,
        state: TimelineState,
        action: &'static str,
    },

    /// Animation options failed validation
    #[error("Invalid animation options: {reason}")]
    InvalidOptions { reason: String },

    /// Malformed JSON animation definitions
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Timeline result type
pub type Result<T> = core::result::Result<T, TimelineError>;
