//! Rendering plugin contract and the ordered plugin registry.
//!
//! Plugins are consulted in registration order; the first whose `is_handled` accepts a
//! `(target, prop)` pair owns it (start-value backfill and playback).

use std::fmt;
use std::rc::Rc;

use crate::effects::{Effect, PropertyEffects};
use crate::keyframes::TargetConfiguration;
use crate::value::{PropertyValue, Target};

/// Runtime controller for one compiled effect.
pub trait AnimationController {
    /// Revert the target to its pre-animation state.
    fn cancel(&mut self);
    /// Render the effect at timeline `time`. `is_active` is true while the timeline runs.
    fn update(&mut self, time: f64, rate: f64, is_active: bool);
}

pub trait Plugin {
    fn name(&self) -> &str;

    fn animate(&self, effect: &Effect) -> Box<dyn AnimationController>;

    /// Current rendered value, used to backfill a missing offset-0 frame.
    fn get_value(&self, target: &Target, prop: &str) -> Option<PropertyValue>;

    fn is_handled(&self, target: &Target, prop: &str) -> bool;

    /// Adjustment hook run on each configuration's collected keyframes before they are
    /// finalized into effects.
    fn on_will_animate(&self, _config: &TargetConfiguration, _effects: &mut PropertyEffects) {}
}

#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<Rc<dyn Plugin>>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|p| p.name().to_string()))
            .finish()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin. Registering a name twice replaces the earlier plugin in place.
    pub fn register(&mut self, plugin: Rc<dyn Plugin>) {
        match self.plugins.iter_mut().find(|p| p.name() == plugin.name()) {
            Some(slot) => *slot = plugin,
            None => self.plugins.push(plugin),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<dyn Plugin>> {
        self.plugins.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Rc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    /// First registered plugin that handles `(target, prop)`.
    pub fn find_handler(&self, target: &Target, prop: &str) -> Option<&Rc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.is_handled(target, prop))
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
