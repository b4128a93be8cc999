//! Effect compiler: target configurations -> offset-complete per-(target, prop) effects.
//!
//! Per configuration:
//! 1. Normalize every keyframe time to an offset `(time - from) / duration` (0 when the
//!    configuration has no length) and collect `offset -> value` per property.
//! 2. Run each plugin's `on_will_animate` hook over the collected frames.
//! 3. Sort frames by offset and backfill a missing or unresolved offset-0 frame from the
//!    first plugin that handles the property.
//! 4. Emit one `Effect` per property. Frames that stay unresolved are dropped.
//!
//! Compilation is pure given the plugin registry: the same configurations compile to the
//! same effects.

use indexmap::IndexMap;

use crate::keyframes::TargetConfiguration;
use crate::plugin::PluginRegistry;
use crate::value::{PropertyValue, References, Target};

/// Finalized keyframe inside an effect.
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframe {
    pub offset: f64,
    pub value: PropertyValue,
    pub easing: String,
    pub interpolate: Option<String>,
}

/// Collected frame before finalization; `value` may still be unresolved.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyEffect {
    pub offset: f64,
    pub value: Option<PropertyValue>,
    pub easing: Option<String>,
    pub interpolate: Option<String>,
}

/// Per-property collected frames, in property first-seen order.
pub type PropertyEffects = IndexMap<String, Vec<PropertyEffect>>;

#[derive(Clone, Debug, PartialEq)]
pub struct Effect {
    pub target: Target,
    /// Plugin that will render this effect; `None` when no plugin handles the property.
    pub plugin: Option<String>,
    pub prop: String,
    pub from: f64,
    pub to: f64,
    /// Sorted ascending by offset.
    pub keyframes: Vec<Keyframe>,
}

pub struct EffectCompiler<'a> {
    pub plugins: &'a PluginRegistry,
    pub refs: &'a References,
    pub default_easing: &'a str,
}

impl EffectCompiler<'_> {
    pub fn to_effects(&self, configs: &[TargetConfiguration]) -> Vec<Effect> {
        configs
            .iter()
            .flat_map(|config| self.config_effects(config))
            .collect()
    }

    pub fn config_effects(&self, config: &TargetConfiguration) -> Vec<Effect> {
        let mut effects = self.collect(config);

        for plugin in self.plugins.iter() {
            plugin.on_will_animate(config, &mut effects);
        }

        let mut result = Vec::with_capacity(effects.len());
        for (prop, mut frames) in effects {
            if frames.is_empty() {
                continue;
            }
            frames.sort_by(|a, b| a.offset.total_cmp(&b.offset));

            let handler = self.plugins.find_handler(&config.target, &prop);
            let needs_start = frames[0].offset != 0.0 || frames[0].value.is_none();
            if needs_start {
                if let Some(plugin) = handler {
                    let value = plugin.get_value(&config.target, &prop);
                    if frames[0].offset == 0.0 {
                        frames[0].value = value;
                    } else {
                        frames.insert(
                            0,
                            PropertyEffect {
                                offset: 0.0,
                                value,
                                easing: None,
                                interpolate: None,
                            },
                        );
                    }
                }
            }

            let collected = frames.len();
            let keyframes: Vec<Keyframe> = frames
                .into_iter()
                .filter_map(|f| {
                    Some(Keyframe {
                        offset: f.offset,
                        value: f.value?,
                        easing: f
                            .easing
                            .or_else(|| config.easing.clone())
                            .unwrap_or_else(|| self.default_easing.to_string()),
                        interpolate: f.interpolate,
                    })
                })
                .collect();
            if keyframes.len() < collected {
                log::warn!(
                    "{}.{}: dropped {} unresolved keyframe(s)",
                    config.target,
                    prop,
                    collected - keyframes.len()
                );
            }

            result.push(Effect {
                target: config.target.clone(),
                plugin: handler.map(|p| p.name().to_string()),
                prop,
                from: config.from,
                to: config.to,
                keyframes,
            });
        }
        result
    }

    fn collect(&self, config: &TargetConfiguration) -> PropertyEffects {
        let mut effects = PropertyEffects::new();
        for name in &config.prop_names {
            effects.insert(name.clone(), Vec::new());
        }

        for kf in &config.keyframes {
            let offset = if config.duration > 0.0 {
                ((kf.time - config.from) / config.duration).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let value = kf.value.as_ref().map(|v| self.substitute(v));
            let frames = effects.entry(kf.prop.clone()).or_default();
            match frames.iter_mut().find(|f| f.offset == offset) {
                Some(existing) => {
                    if value.is_some() {
                        existing.value = value;
                    }
                    if kf.easing.is_some() {
                        existing.easing = kf.easing.clone();
                    }
                }
                None => frames.push(PropertyEffect {
                    offset,
                    value,
                    easing: kf.easing.clone(),
                    interpolate: kf.interpolate.clone(),
                }),
            }
        }
        effects
    }

    // `@name` placeholders resolve through the timeline's references; unknown names stay literal.
    fn substitute(&self, value: &PropertyValue) -> PropertyValue {
        value
            .reference_name()
            .and_then(|name| self.refs.get(name))
            .unwrap_or(value)
            .clone()
    }
}

/// Compile with no references and linear default easing.
pub fn to_effects(configs: &[TargetConfiguration], plugins: &PluginRegistry) -> Vec<Effect> {
    let refs = References::new();
    EffectCompiler {
        plugins,
        refs: &refs,
        default_easing: "linear",
    }
    .to_effects(configs)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::keyframes::add_property_keyframes;
    use crate::options::{BaseAnimationOptions, KeyframeOptions, PropertyInput};
    use crate::plugin::{AnimationController, Plugin};

    struct Noop;
    impl AnimationController for Noop {
        fn cancel(&mut self) {}
        fn update(&mut self, _: f64, _: f64, _: bool) {}
    }

    struct FixedPlugin {
        name: &'static str,
        handles: &'static str,
        value: f64,
        asked: Cell<u32>,
    }

    impl Plugin for FixedPlugin {
        fn name(&self) -> &str {
            self.name
        }
        fn animate(&self, _: &Effect) -> Box<dyn AnimationController> {
            Box::new(Noop)
        }
        fn get_value(&self, _: &Target, _: &str) -> Option<PropertyValue> {
            self.asked.set(self.asked.get() + 1);
            Some(PropertyValue::Number(self.value))
        }
        fn is_handled(&self, _: &Target, prop: &str) -> bool {
            self.handles == "*" || self.handles == prop
        }
    }

    fn fixed(name: &'static str, handles: &'static str, value: f64) -> Rc<FixedPlugin> {
        Rc::new(FixedPlugin {
            name,
            handles,
            value,
            asked: Cell::new(0),
        })
    }

    fn config(base: BaseAnimationOptions, from: f64, to: f64) -> TargetConfiguration {
        let opts = base.at(from, to);
        let mut cfg = TargetConfiguration::new(opts.targets[0].clone(), opts.targets.len());
        add_property_keyframes(&mut cfg, 0, &opts);
        cfg
    }

    fn offsets(effect: &Effect) -> Vec<(f64, PropertyValue)> {
        effect
            .keyframes
            .iter()
            .map(|k| (k.offset, k.value.clone()))
            .collect()
    }

    #[test]
    fn value_list_compiles_to_even_offsets() {
        let cfg = config(
            BaseAnimationOptions::new(["el"]).prop("x", PropertyInput::many([0.0, 50.0, 100.0])),
            0.0,
            1000.0,
        );
        let effects = to_effects(&[cfg], &PluginRegistry::new());
        assert_eq!(effects.len(), 1);
        assert_eq!(
            offsets(&effects[0]),
            vec![
                (0.0, PropertyValue::Number(0.0)),
                (0.5, PropertyValue::Number(50.0)),
                (1.0, PropertyValue::Number(100.0)),
            ]
        );
        assert_eq!(effects[0].plugin, None);
    }

    #[test]
    fn missing_start_is_backfilled_by_first_handler() {
        let cfg = config(
            BaseAnimationOptions::new(["el"]).prop("opacity", PropertyInput::one(1.0)),
            0.0,
            400.0,
        );
        let first = fixed("first", "opacity", 0.25);
        let second = fixed("second", "*", 0.75);
        let mut plugins = PluginRegistry::new();
        plugins.register(first.clone());
        plugins.register(second.clone());

        let effects = to_effects(&[cfg], &plugins);
        assert_eq!(effects[0].plugin.as_deref(), Some("first"));
        assert_eq!(
            offsets(&effects[0]),
            vec![
                (0.0, PropertyValue::Number(0.25)),
                (1.0, PropertyValue::Number(1.0)),
            ]
        );
        assert_eq!(first.asked.get(), 1);
        assert_eq!(second.asked.get(), 0);
    }

    #[test]
    fn keyframe_form_without_zero_gets_spliced_start() {
        let cfg = config(
            BaseAnimationOptions::new(["el"]).keyframes(vec![
                KeyframeOptions::at(0.5).with("x", 10.0),
                KeyframeOptions::at(1.0).with("x", 20.0),
            ]),
            0.0,
            100.0,
        );
        let mut plugins = PluginRegistry::new();
        plugins.register(fixed("p", "x", -1.0));
        let effects = to_effects(&[cfg], &plugins);
        assert_eq!(
            offsets(&effects[0]),
            vec![
                (0.0, PropertyValue::Number(-1.0)),
                (0.5, PropertyValue::Number(10.0)),
                (1.0, PropertyValue::Number(20.0)),
            ]
        );
    }

    #[test]
    fn unresolved_start_without_plugin_is_dropped() {
        let cfg = config(
            BaseAnimationOptions::new(["el"]).prop("x", PropertyInput::one(5.0)),
            0.0,
            100.0,
        );
        let effects = to_effects(&[cfg], &PluginRegistry::new());
        assert_eq!(offsets(&effects[0]), vec![(1.0, PropertyValue::Number(5.0))]);
    }

    #[test]
    fn zero_length_configs_collapse_to_offset_zero() {
        let cfg = config(
            BaseAnimationOptions::new(["el"]).prop("x", PropertyInput::one(9.0)),
            300.0,
            300.0,
        );
        let effects = to_effects(&[cfg], &PluginRegistry::new());
        assert_eq!(offsets(&effects[0]), vec![(0.0, PropertyValue::Number(9.0))]);
    }

    #[test]
    fn compilation_is_idempotent() {
        let cfgs = vec![
            config(
                BaseAnimationOptions::new(["a"]).prop("x", PropertyInput::many([1.0, 2.0, 3.0])),
                0.0,
                90.0,
            ),
            config(
                BaseAnimationOptions::new(["b"]).prop("y", PropertyInput::one(4.0)),
                10.0,
                20.0,
            ),
        ];
        let mut plugins = PluginRegistry::new();
        plugins.register(fixed("p", "*", 0.0));
        assert_eq!(to_effects(&cfgs, &plugins), to_effects(&cfgs, &plugins));
    }

    #[test]
    fn references_and_easing_resolve() {
        let cfg = config(
            BaseAnimationOptions::new(["el"])
                .easing("ease-out")
                .prop("fill", PropertyInput::many(["@start", "@end"])),
            0.0,
            10.0,
        );
        let mut refs = References::new();
        refs.insert("start".into(), PropertyValue::from("red"));
        let plugins = PluginRegistry::new();
        let effects = EffectCompiler {
            plugins: &plugins,
            refs: &refs,
            default_easing: "linear",
        }
        .to_effects(&[cfg]);
        let kf = &effects[0].keyframes;
        assert_eq!(kf[0].value, PropertyValue::from("red"));
        // Unknown reference stays literal.
        assert_eq!(kf[1].value, PropertyValue::from("@end"));
        assert!(kf.iter().all(|k| k.easing == "ease-out"));
    }

    struct Inject;
    impl Plugin for Inject {
        fn name(&self) -> &str {
            "inject"
        }
        fn animate(&self, _: &Effect) -> Box<dyn AnimationController> {
            Box::new(Noop)
        }
        fn get_value(&self, _: &Target, _: &str) -> Option<PropertyValue> {
            None
        }
        fn is_handled(&self, _: &Target, _: &str) -> bool {
            false
        }
        fn on_will_animate(&self, _: &TargetConfiguration, effects: &mut PropertyEffects) {
            effects.entry("visibility".into()).or_default().push(PropertyEffect {
                offset: 0.0,
                value: Some(PropertyValue::from("visible")),
                easing: None,
                interpolate: None,
            });
        }
    }

    #[test]
    fn will_animate_hook_can_inject_frames() {
        let cfg = config(
            BaseAnimationOptions::new(["el"]).prop("x", PropertyInput::many([0.0, 1.0])),
            0.0,
            10.0,
        );
        let mut plugins = PluginRegistry::new();
        plugins.register(Rc::new(Inject));
        let effects = to_effects(&[cfg], &plugins);
        let props: Vec<&str> = effects.iter().map(|e| e.prop.as_str()).collect();
        assert_eq!(props, vec!["x", "visibility"]);
    }
}
