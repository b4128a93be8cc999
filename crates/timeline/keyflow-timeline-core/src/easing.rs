//! Easing registry: name -> `t -> t'` lookup with a linear fallback.

use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;

pub type EasingFn = Rc<dyn Fn(f64) -> f64>;

#[derive(Clone, Default)]
pub struct EasingRegistry {
    entries: HashMap<String, EasingFn>,
}

impl fmt::Debug for EasingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("EasingRegistry").field("names", &names).finish()
    }
}

impl EasingRegistry {
    /// Empty registry; every lookup resolves to linear.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the stock curves. Linear is the fallback, so it is not registered.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.register("ease-in", |t| t * t * t);
        reg.register("ease-out", |t| {
            let u = 1.0 - t;
            1.0 - u * u * u
        });
        reg.register("ease-in-out", |t| {
            if t < 0.5 {
                4.0 * t * t * t
            } else {
                let u = -2.0 * t + 2.0;
                1.0 - u * u * u / 2.0
            }
        });
        reg.register("step-start", |t| if t > 0.0 { 1.0 } else { 0.0 });
        reg.register("step-end", |t| if t >= 1.0 { 1.0 } else { 0.0 });
        reg
    }

    pub fn register(&mut self, name: &str, f: impl Fn(f64) -> f64 + 'static) {
        self.entries.insert(name.to_string(), Rc::new(f));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<EasingFn> {
        self.entries.get(name).cloned()
    }

    /// Apply `name` to `t`; unknown names are linear.
    pub fn apply(&self, name: &str, t: f64) -> f64 {
        match self.entries.get(name) {
            Some(f) => f(t),
            None => t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_fall_back_to_linear() {
        let reg = EasingRegistry::with_defaults();
        assert_eq!(reg.apply("no-such-curve", 0.3), 0.3);
        assert_eq!(reg.apply("linear", 0.7), 0.7);
    }

    #[test]
    fn stock_curves_hit_endpoints() {
        let reg = EasingRegistry::with_defaults();
        for name in ["ease-in", "ease-out", "ease-in-out"] {
            assert!(reg.apply(name, 0.0).abs() < 1e-12, "{name}");
            assert!((reg.apply(name, 1.0) - 1.0).abs() < 1e-12, "{name}");
        }
        assert!(reg.apply("ease-in", 0.5) < 0.5);
        assert!(reg.apply("ease-out", 0.5) > 0.5);
        assert_eq!(reg.apply("step-end", 0.99), 0.0);
        assert_eq!(reg.apply("step-start", 0.01), 1.0);
    }

    #[test]
    fn custom_registration_overrides() {
        let mut reg = EasingRegistry::new();
        reg.register("half", |t| t / 2.0);
        assert!(reg.contains("half"));
        assert_eq!(reg.apply("half", 1.0), 0.5);
    }
}
