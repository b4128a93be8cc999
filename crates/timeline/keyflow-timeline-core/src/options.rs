//! User-facing animation definitions.
//!
//! Property input is heterogeneous on the way in (single value, list of values,
//! detailed object, or an array of keyframe objects). It is captured here as tagged
//! variants and normalized by `keyframes::add_property_keyframes` into
//! `PropertyKeyframe`s; nothing downstream inspects these shapes.
//!
//! All types deserialize from JSON (camelCase keys). Computed resolvers can only be
//! attached from Rust.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TimelineError};
use crate::value::{PropertyValue, References, Resolver, Target};

/// One value or an ordered list of values for a property.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum PropertyValues {
    Many(Vec<Resolver<PropertyValue>>),
    One(Resolver<PropertyValue>),
}

impl PropertyValues {
    pub fn as_slice(&self) -> &[Resolver<PropertyValue>] {
        match self {
            PropertyValues::Many(v) => v,
            PropertyValues::One(v) => std::slice::from_ref(v),
        }
    }
}

/// Value(s) for one property in the property-map form.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum PropertyInput {
    // Tried first: a derived struct would also accept a JSON array positionally.
    Values(PropertyValues),
    Detailed {
        value: PropertyValues,
        #[serde(default)]
        easing: Option<String>,
        #[serde(default)]
        interpolate: Option<String>,
    },
}

impl PropertyInput {
    pub fn one(value: impl Into<Resolver<PropertyValue>>) -> Self {
        PropertyInput::Values(PropertyValues::One(value.into()))
    }

    pub fn many<V: Into<Resolver<PropertyValue>>>(values: impl IntoIterator<Item = V>) -> Self {
        PropertyInput::Values(PropertyValues::Many(
            values.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn values(&self) -> &[Resolver<PropertyValue>] {
        match self {
            PropertyInput::Detailed { value, .. } => value.as_slice(),
            PropertyInput::Values(v) => v.as_slice(),
        }
    }

    pub fn easing(&self) -> Option<&str> {
        match self {
            PropertyInput::Detailed { easing, .. } => easing.as_deref(),
            PropertyInput::Values(_) => None,
        }
    }

    pub fn interpolate(&self) -> Option<&str> {
        match self {
            PropertyInput::Detailed { interpolate, .. } => interpolate.as_deref(),
            PropertyInput::Values(_) => None,
        }
    }
}

/// One element of the array-of-keyframes form. `None` property values are skipped.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct KeyframeOptions {
    #[serde(default)]
    pub offset: Option<f64>,
    #[serde(default)]
    pub easing: Option<String>,
    #[serde(flatten)]
    pub props: IndexMap<String, Option<Resolver<PropertyValue>>>,
}

impl KeyframeOptions {
    pub fn at(offset: f64) -> Self {
        Self {
            offset: Some(offset),
            ..Self::default()
        }
    }

    pub fn with(mut self, prop: &str, value: impl Into<Resolver<PropertyValue>>) -> Self {
        self.props.insert(prop.to_string(), Some(value.into()));
        self
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Props {
    Keyframes(Vec<KeyframeOptions>),
    Map(IndexMap<String, Option<PropertyInput>>),
}

impl Default for Props {
    fn default() -> Self {
        Props::Map(IndexMap::new())
    }
}

/// Targets, timing modifiers and properties shared by every way of adding an animation.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseAnimationOptions {
    pub targets: Vec<Target>,
    #[serde(default)]
    pub delay: Option<Resolver<f64>>,
    #[serde(default)]
    pub easing: Option<String>,
    #[serde(default)]
    pub end_delay: Option<Resolver<f64>>,
    #[serde(default)]
    pub props: Props,
    #[serde(default)]
    pub stagger: Option<f64>,
}

impl BaseAnimationOptions {
    /// Explicit keyframe offsets must lie in `[0, 1]`.
    pub(crate) fn validate(&self) -> Result<()> {
        let Props::Keyframes(frames) = &self.props else {
            return Ok(());
        };
        match frames
            .iter()
            .filter_map(|f| f.offset)
            .find(|o| !(0.0..=1.0).contains(o))
        {
            Some(offset) => Err(TimelineError::InvalidOptions {
                reason: format!("keyframe offset {offset} is outside 0..=1"),
            }),
            None => Ok(()),
        }
    }

    pub fn new<T: Into<Target>>(targets: impl IntoIterator<Item = T>) -> Self {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add a property in the property-map form. Replaces a keyframe-array `props`.
    pub fn prop(mut self, name: &str, input: PropertyInput) -> Self {
        match &mut self.props {
            Props::Map(map) => {
                map.insert(name.to_string(), Some(input));
            }
            Props::Keyframes(_) => {
                let mut map = IndexMap::new();
                map.insert(name.to_string(), Some(input));
                self.props = Props::Map(map);
            }
        }
        self
    }

    pub fn keyframes(mut self, frames: Vec<KeyframeOptions>) -> Self {
        self.props = Props::Keyframes(frames);
        self
    }

    pub fn delay(mut self, delay: impl Into<Resolver<f64>>) -> Self {
        self.delay = Some(delay.into());
        self
    }

    pub fn end_delay(mut self, end_delay: impl Into<Resolver<f64>>) -> Self {
        self.end_delay = Some(end_delay.into());
        self
    }

    pub fn easing(mut self, easing: &str) -> Self {
        self.easing = Some(easing.to_string());
        self
    }

    pub fn stagger(mut self, stagger: f64) -> Self {
        self.stagger = Some(stagger);
        self
    }

    /// Pin the block to an absolute window.
    pub fn at(self, from: f64, to: f64) -> AnimationOptions {
        AnimationOptions {
            from,
            to,
            targets: self.targets,
            easing: self.easing,
            stagger: self.stagger,
            delay: self.delay,
            end_delay: self.end_delay,
            props: self.props,
        }
    }
}

/// Options for `add`/`animate`/`sequence`: a block placed at the cursor unless
/// `from`/`to` say otherwise.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AddAnimationOptions {
    #[serde(flatten)]
    pub base: BaseAnimationOptions,
    #[serde(default)]
    pub from: Option<f64>,
    #[serde(default)]
    pub to: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl AddAnimationOptions {
    pub fn new(base: BaseAnimationOptions) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    pub fn duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn from_to(mut self, from: f64, to: f64) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Resolve `from`/`to` against the insertion point. Without `to` or `duration`
    /// the block has zero length.
    pub fn place(self, cursor: f64) -> AnimationOptions {
        let from = self.from.unwrap_or(cursor);
        let to = self.to.unwrap_or(from + self.duration.unwrap_or(0.0));
        self.base.at(from, to)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("from", self.from),
            ("to", self.to),
            ("duration", self.duration),
        ] {
            if let Some(v) = v {
                if !v.is_finite() {
                    return Err(TimelineError::InvalidOptions {
                        reason: format!("{name} must be finite"),
                    });
                }
            }
        }
        if matches!(self.duration, Some(d) if d < 0.0) {
            return Err(TimelineError::InvalidOptions {
                reason: "duration must not be negative".to_string(),
            });
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if to < from {
                return Err(TimelineError::InvalidOptions {
                    reason: format!("to ({to}) precedes from ({from})"),
                });
            }
        }
        self.base.validate()
    }
}

/// A fully placed block: absolute `from`/`to` before stagger and delay are applied.
#[derive(Clone, Debug)]
pub struct AnimationOptions {
    pub from: f64,
    pub to: f64,
    pub targets: Vec<Target>,
    pub easing: Option<String>,
    pub stagger: Option<f64>,
    pub delay: Option<Resolver<f64>>,
    pub end_delay: Option<Resolver<f64>>,
    pub props: Props,
}

/// Instant property assignment at `at` (defaults to the cursor).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SetOptions {
    pub targets: Vec<Target>,
    #[serde(default)]
    pub at: Option<f64>,
    #[serde(default)]
    pub easing: Option<String>,
    #[serde(default)]
    pub props: IndexMap<String, Resolver<PropertyValue>>,
}

impl SetOptions {
    pub fn new<T: Into<Target>>(targets: impl IntoIterator<Item = T>) -> Self {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn at(mut self, at: f64) -> Self {
        self.at = Some(at);
        self
    }

    pub fn prop(mut self, name: &str, value: impl Into<Resolver<PropertyValue>>) -> Self {
        self.props.insert(name.to_string(), value.into());
        self
    }
}

/// Number of iterations a timeline plays before finishing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Repeat {
    Times(u32),
    Forever,
}

impl Default for Repeat {
    fn default() -> Self {
        Repeat::Times(1)
    }
}

impl Repeat {
    /// True once `rounds` completed iterations use up the budget. `Times(0)` plays once.
    pub fn is_exhausted(&self, rounds: u32) -> bool {
        match self {
            Repeat::Times(n) => rounds >= (*n).max(1),
            Repeat::Forever => false,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayOptions {
    pub repeat: Option<Repeat>,
    /// Alternate direction on each iteration (yoyo).
    pub alternate: Option<bool>,
    /// Destroy the timeline once it finishes.
    pub destroy: Option<bool>,
}

impl PlayOptions {
    pub fn repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = Some(repeat);
        self
    }

    pub fn alternate(mut self, alternate: bool) -> Self {
        self.alternate = Some(alternate);
        self
    }

    pub fn destroy(mut self, destroy: bool) -> Self {
        self.destroy = Some(destroy);
        self
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineOptions {
    pub name: Option<String>,
    /// Values substituted for `@name` placeholders.
    pub references: References,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<AddAnimationOptions>),
    One(Box<AddAnimationOptions>),
}

/// Parse one animation block or a list of them from JSON and validate their timing.
pub fn parse_animations_json(s: &str) -> Result<Vec<AddAnimationOptions>> {
    let parsed: OneOrMany = serde_json::from_str(s)?;
    let list = match parsed {
        OneOrMany::Many(v) => v,
        OneOrMany::One(v) => vec![*v],
    };
    for opts in &list {
        opts.validate()?;
    }
    Ok(list)
}
