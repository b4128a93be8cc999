//! Reference plugin that renders effects into an in-memory property table.
//!
//! Hosts without a renderer (tests, headless tools, servers that ship values elsewhere)
//! read animated values straight out of the shared `PropertyStore`.
//!
//! Sampling model:
//! - Keyframe offsets are normalized over the effect window `[from, to]`.
//! - Numbers blend linearly after the left keyframe's easing is applied to local time.
//! - Text, mixed pairs and `interpolate: "discrete"` segments hold the left value (step).

use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::easing::EasingRegistry;
use crate::effects::{Effect, Keyframe};
use crate::plugin::{AnimationController, Plugin};
use crate::value::{PropertyValue, Target};

pub type PropertyStore = Rc<RefCell<HashMap<(Target, String), PropertyValue>>>;

const DISCRETE: &str = "discrete";

#[derive(Debug)]
pub struct ValueStorePlugin {
    name: String,
    store: PropertyStore,
    easings: EasingRegistry,
}

impl Default for ValueStorePlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueStorePlugin {
    pub fn new() -> Self {
        Self::with_store(PropertyStore::default())
    }

    /// Render into an existing table (e.g. one the host already reads from).
    pub fn with_store(store: PropertyStore) -> Self {
        Self {
            name: "value-store".to_string(),
            store,
            easings: EasingRegistry::with_defaults(),
        }
    }

    /// Shared handle to the rendered values.
    pub fn store(&self) -> PropertyStore {
        self.store.clone()
    }

    pub fn easings_mut(&mut self) -> &mut EasingRegistry {
        &mut self.easings
    }

    /// Seed a value, as a host would before animating from "current state".
    pub fn set(&self, target: impl Into<Target>, prop: &str, value: impl Into<PropertyValue>) {
        self.store
            .borrow_mut()
            .insert((target.into(), prop.to_string()), value.into());
    }

    pub fn get(&self, target: impl Into<Target>, prop: &str) -> Option<PropertyValue> {
        self.store
            .borrow()
            .get(&(target.into(), prop.to_string()))
            .cloned()
    }
}

impl Plugin for ValueStorePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn animate(&self, effect: &Effect) -> Box<dyn AnimationController> {
        let key = (effect.target.clone(), effect.prop.clone());
        let initial = self.store.borrow().get(&key).cloned();
        Box::new(StoreController {
            store: self.store.clone(),
            key,
            from: effect.from,
            to: effect.to,
            keyframes: effect.keyframes.clone(),
            easings: self.easings.clone(),
            initial,
        })
    }

    fn get_value(&self, target: &Target, prop: &str) -> Option<PropertyValue> {
        self.store
            .borrow()
            .get(&(target.clone(), prop.to_string()))
            .cloned()
    }

    fn is_handled(&self, _target: &Target, _prop: &str) -> bool {
        true
    }
}

struct StoreController {
    store: PropertyStore,
    key: (Target, String),
    from: f64,
    to: f64,
    keyframes: Vec<Keyframe>,
    easings: EasingRegistry,
    initial: Option<PropertyValue>,
}

impl StoreController {
    fn local_offset(&self, time: f64) -> f64 {
        if self.to <= self.from {
            1.0
        } else {
            ((time - self.from) / (self.to - self.from)).clamp(0.0, 1.0)
        }
    }
}

impl AnimationController for StoreController {
    fn cancel(&mut self) {
        let mut store = self.store.borrow_mut();
        match self.initial.take() {
            Some(v) => {
                store.insert(self.key.clone(), v);
            }
            None => {
                store.remove(&self.key);
            }
        }
    }

    fn update(&mut self, time: f64, _rate: f64, _is_active: bool) {
        if time < self.from {
            return;
        }
        let u = self.local_offset(time);
        if let Some(value) = sample(&self.keyframes, u, &self.easings) {
            self.store.borrow_mut().insert(self.key.clone(), value);
        }
    }
}

/// Segment `[i, i+1]` containing `u` with local time in `[0, 1]`.
/// Returns `(i, i, 0)` outside the keyed range.
fn find_segment(frames: &[Keyframe], u: f64) -> (usize, usize, f64) {
    let n = frames.len();
    if n <= 1 || u <= frames[0].offset {
        return (0, 0, 0.0);
    }
    if u >= frames[n - 1].offset {
        return (n - 1, n - 1, 0.0);
    }
    for i in 0..(n - 1) {
        let (t0, t1) = (frames[i].offset, frames[i + 1].offset);
        if u >= t0 && u <= t1 {
            let span = t1 - t0;
            let lt = if span > 0.0 { (u - t0) / span } else { 1.0 };
            return (i, i + 1, lt.clamp(0.0, 1.0));
        }
    }
    (n - 1, n - 1, 0.0)
}

pub(crate) fn sample(frames: &[Keyframe], u: f64, easings: &EasingRegistry) -> Option<PropertyValue> {
    if frames.is_empty() {
        return None;
    }
    let (i0, i1, lt) = find_segment(frames, u);
    let left = &frames[i0];
    if i0 == i1 {
        return Some(left.value.clone());
    }
    let right = &frames[i1];
    let t = easings.apply(&left.easing, lt);

    let discrete = left.interpolate.as_deref() == Some(DISCRETE);
    match (&left.value, &right.value) {
        (PropertyValue::Number(a), PropertyValue::Number(b)) if !discrete => {
            Some(PropertyValue::Number(a + (b - a) * t))
        }
        _ if lt >= 1.0 => Some(right.value.clone()),
        _ => Some(left.value.clone()),
    }
}
