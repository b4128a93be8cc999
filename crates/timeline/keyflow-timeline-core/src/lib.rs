//! Keyflow Timeline Core (renderer-agnostic)
//!
//! Declarative property animations are compiled into per-property keyframe tracks
//! (`keyframes`), folded into offset-complete effects (`effects`) and played back by
//! plugin-provided controllers. Timing state lives in a per-timeline model that is only
//! mutated through reducers (`reducers`), driven by an explicit frame clock (`clock`).
//!
//! Layers, leaf to root:
//! - `clock`: frame scheduler with staged subscribe/unsubscribe
//! - `keyframes`, `effects`: pure compilers
//! - `store`, `model`: timeline models keyed by `TimelineId`
//! - `reducers`, `engine`: action dispatch, player sync, event queueing
//! - `timeline`: shared `Runtime` handle and the `Timeline` facade

pub mod clock;
pub mod config;
pub mod easing;
pub mod effects;
pub mod engine;
pub mod error;
pub mod events;
pub mod ids;
pub mod keyframes;
pub mod model;
pub mod options;
pub mod plugin;
pub mod reducers;
pub mod store;
pub mod timeline;
pub mod value;
pub mod value_store;

// Re-exports for hosts and plugin authors
pub use clock::{Clock, FrameTick, ManualTime, SystemTime, TimeSource};
pub use config::Config;
pub use easing::{EasingFn, EasingRegistry};
pub use effects::{to_effects, Effect, EffectCompiler, Keyframe, PropertyEffect, PropertyEffects};
pub use engine::Engine;
pub use error::{Result, TimelineError};
pub use events::{Delivery, Emission, Listener, TimelineEvent};
pub use ids::{ListenerId, TimelineId};
pub use keyframes::{add_property_keyframes, infer_offsets, PropertyKeyframe, TargetConfiguration};
pub use model::{AnimationPlayer, TimelineModel, TimelineState};
pub use options::{
    parse_animations_json, AddAnimationOptions, AnimationOptions, BaseAnimationOptions,
    KeyframeOptions, PlayOptions, PropertyInput, PropertyValues, Props, Repeat, SetOptions,
    TimelineOptions,
};
pub use plugin::{AnimationController, Plugin, PluginRegistry};
pub use reducers::{Action, ClockRequest, ReducerContext};
pub use store::Store;
pub use timeline::{Runtime, Timeline};
pub use value::{PropertyValue, References, Resolver, Target};
pub use value_store::{PropertyStore, ValueStorePlugin};
