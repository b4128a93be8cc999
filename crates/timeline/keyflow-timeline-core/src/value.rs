//! Property values, target handles and per-target resolvers.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque handle to the thing being animated. The engine never owns the target itself;
/// plugins map handles onto whatever the host renders.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(pub String);

impl Target {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Target {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A keyframe value. Numbers interpolate; text holds (step) unless a plugin knows better.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
}

impl PropertyValue {
    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            PropertyValue::Text(_) => None,
        }
    }

    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            PropertyValue::Number(_) => None,
        }
    }

    /// Name of an `@name` placeholder, if this value is one.
    pub fn reference_name(&self) -> Option<&str> {
        self.as_text().and_then(|s| s.strip_prefix('@'))
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

impl From<i32> for PropertyValue {
    fn from(n: i32) -> Self {
        PropertyValue::Number(n as f64)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Text(s)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Number(n) => write!(f, "{n}"),
            PropertyValue::Text(s) => f.write_str(s),
        }
    }
}

/// `@name` substitution table carried by each timeline.
pub type References = IndexMap<String, PropertyValue>;

/// Per-target computation: `(target, index, target_count) -> value`.
pub type ResolverFn<T> = Rc<dyn Fn(&Target, usize, usize) -> T>;

/// Either a literal or a function evaluated once per target at compile time.
#[derive(Clone)]
pub enum Resolver<T> {
    Value(T),
    Computed(ResolverFn<T>),
}

impl<T: Clone> Resolver<T> {
    pub fn computed(f: impl Fn(&Target, usize, usize) -> T + 'static) -> Self {
        Resolver::Computed(Rc::new(f))
    }

    pub fn resolve(&self, target: &Target, index: usize, len: usize) -> T {
        match self {
            Resolver::Value(v) => v.clone(),
            Resolver::Computed(f) => f(target, index, len),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolver::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Resolver::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl<T> From<T> for Resolver<T> {
    fn from(v: T) -> Self {
        Resolver::Value(v)
    }
}

impl From<f64> for Resolver<PropertyValue> {
    fn from(n: f64) -> Self {
        Resolver::Value(PropertyValue::Number(n))
    }
}

impl From<&str> for Resolver<PropertyValue> {
    fn from(s: &str) -> Self {
        Resolver::Value(PropertyValue::from(s))
    }
}

// JSON can only carry literals; computed resolvers are Rust-side only.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Resolver<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Resolver::Value)
    }
}
