//! Keyframe compiler: user animation options -> per-target `PropertyKeyframe` lists.
//!
//! Times are absolute timeline milliseconds, floored. Every `(prop, time)` pair is unique
//! within a configuration; adding a frame at an occupied slot overwrites its value.

use indexmap::IndexSet;

use crate::options::{AnimationOptions, KeyframeOptions, Props};
use crate::value::{PropertyValue, Target};

/// One property value pinned to an absolute time. `value == None` is an unresolved
/// placeholder that the effect compiler fills from the target's current value.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyKeyframe {
    pub index: usize,
    pub prop: String,
    pub time: f64,
    pub value: Option<PropertyValue>,
    pub easing: Option<String>,
    pub interpolate: Option<String>,
    pub plugin: Option<String>,
}

/// Compiled record of one target within one animation block.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetConfiguration {
    pub target: Target,
    pub target_length: usize,
    pub easing: Option<String>,
    pub from: f64,
    pub to: f64,
    pub duration: f64,
    pub end_delay: f64,
    pub stagger: f64,
    /// Touched properties in first-seen order.
    pub prop_names: IndexSet<String>,
    pub keyframes: Vec<PropertyKeyframe>,
}

impl TargetConfiguration {
    pub fn new(target: Target, target_length: usize) -> Self {
        Self {
            target,
            target_length,
            easing: None,
            from: 0.0,
            to: 0.0,
            duration: 0.0,
            end_delay: 0.0,
            stagger: 0.0,
            prop_names: IndexSet::new(),
            keyframes: Vec::new(),
        }
    }

    pub fn find_keyframe(&self, prop: &str, time: f64) -> Option<&PropertyKeyframe> {
        self.keyframes
            .iter()
            .find(|k| k.prop == prop && k.time == time)
    }

    pub fn keyframes_for<'a>(
        &'a self,
        prop: &'a str,
    ) -> impl Iterator<Item = &'a PropertyKeyframe> + 'a {
        self.keyframes.iter().filter(move |k| k.prop == prop)
    }

    /// Insert a frame, or overwrite value (and any provided easing/interpolator) of the
    /// frame already occupying `(prop, time)`.
    pub fn upsert_keyframe(&mut self, frame: PropertyKeyframe) {
        self.prop_names.insert(frame.prop.clone());
        let existing = self
            .keyframes
            .iter_mut()
            .find(|k| k.prop == frame.prop && k.time == frame.time);
        match existing {
            Some(k) => {
                k.value = frame.value;
                if frame.easing.is_some() {
                    k.easing = frame.easing;
                }
                if frame.interpolate.is_some() {
                    k.interpolate = frame.interpolate;
                }
            }
            None => self.keyframes.push(frame),
        }
    }

    /// Insert an unresolved frame unless `(prop, time)` is already occupied.
    fn ensure_keyframe(&mut self, index: usize, prop: &str, time: f64) {
        if self.find_keyframe(prop, time).is_none() {
            self.keyframes.push(PropertyKeyframe {
                index,
                prop: prop.to_string(),
                time,
                value: None,
                easing: None,
                interpolate: None,
                plugin: None,
            });
        }
    }

    // First block sets the window; later blocks widen it.
    fn extend_window(&mut self, from: f64, to: f64) {
        if self.keyframes.is_empty() && self.prop_names.is_empty() {
            self.from = from;
            self.to = to;
        } else {
            self.from = self.from.min(from);
            self.to = self.to.max(to);
        }
        self.duration = self.to - self.from;
    }
}

#[inline]
fn frame_time(from: f64, duration: f64, offset: f64) -> f64 {
    (duration * offset + from).floor()
}

/// Compile `options` for the `index`-th target into `config`.
///
/// `from = floor(max(0, options.from + stagger * (index + 1) + delay(target, index)))`,
/// `duration = options.to - options.from`. The window ends on the last frame time.
pub fn add_property_keyframes(
    config: &mut TargetConfiguration,
    index: usize,
    options: &AnimationOptions,
) {
    let len = config.target_length.max(1);
    let stagger_ms = options.stagger.map_or(0.0, |s| s * (index + 1) as f64);
    let delay_ms = options
        .delay
        .as_ref()
        .map_or(0.0, |d| d.resolve(&config.target, index, len));
    let from = (options.from + stagger_ms + delay_ms).max(0.0).floor();
    let duration = options.to - options.from;

    config.extend_window(from, frame_time(from, duration, 1.0));

    match &options.props {
        Props::Keyframes(frames) => {
            let mut frames = frames.clone();
            infer_keyframe_offsets(&mut frames);
            add_keyframes(config, index, &frames, duration, from);
        }
        Props::Map(_) => add_properties(config, index, options, duration, from),
    }
}

fn add_keyframes(
    config: &mut TargetConfiguration,
    index: usize,
    frames: &[KeyframeOptions],
    duration: f64,
    from: f64,
) {
    let len = config.target_length.max(1);
    let mut touched = IndexSet::new();
    for frame in frames {
        let time = frame_time(from, duration, frame.offset.unwrap_or(0.0));
        for (name, value) in &frame.props {
            let Some(value) = value else {
                continue;
            };
            let resolved = value.resolve(&config.target, index, len);
            config.upsert_keyframe(PropertyKeyframe {
                index,
                prop: name.clone(),
                time,
                value: Some(resolved),
                easing: frame.easing.clone(),
                interpolate: None,
                plugin: None,
            });
            touched.insert(name.as_str());
        }
    }

    for name in touched {
        config.ensure_keyframe(index, name, frame_time(from, duration, 0.0));
        config.ensure_keyframe(index, name, frame_time(from, duration, 1.0));
    }
}

fn add_properties(
    config: &mut TargetConfiguration,
    index: usize,
    options: &AnimationOptions,
    duration: f64,
    from: f64,
) {
    let Props::Map(props) = &options.props else {
        return;
    };
    let len = config.target_length.max(1);

    for (name, input) in props {
        let Some(input) = input else {
            continue;
        };
        let values = input.values();
        let count = values.len();
        if count == 0 {
            continue;
        }

        for (i, value) in values.iter().enumerate() {
            let offset = if i == count - 1 {
                1.0
            } else if i == 0 {
                0.0
            } else {
                i as f64 / (count - 1) as f64
            };
            config.upsert_keyframe(PropertyKeyframe {
                index,
                prop: name.clone(),
                time: frame_time(from, duration, offset),
                value: Some(value.resolve(&config.target, index, len)),
                easing: input.easing().map(str::to_string),
                interpolate: input.interpolate().map(str::to_string),
                plugin: None,
            });
        }

        // Bracketing frames so the effect compiler always has both ends.
        config.ensure_keyframe(index, name, frame_time(from, duration, 0.0));
        config.ensure_keyframe(index, name, frame_time(from, duration, 1.0));
    }
}

fn infer_keyframe_offsets(frames: &mut [KeyframeOptions]) {
    let mut offsets: Vec<Option<f64>> = frames.iter().map(|f| f.offset).collect();
    infer_offsets(&mut offsets);
    for (frame, offset) in frames.iter_mut().zip(offsets) {
        frame.offset = offset;
    }
}

/// Fill missing keyframe offsets in place.
///
/// - The first frame (or the first frame explicitly at 0) defaults to 0.
/// - With more than one frame, the last frame (or the last one explicitly at 1) defaults to 1.
/// - A run of `n` missing slots between defined offsets `start` (index `i-1`) and `end`
///   (index `j`) gets `start + (end - start) * k / (j - i + 1)` for `k = 1..=n`.
/// - A leading run is bounded by 0 and a trailing run by 1, so every slot ends up defined.
pub fn infer_offsets(offsets: &mut [Option<f64>]) {
    let len = offsets.len();
    if len == 0 {
        return;
    }

    let first = offsets.iter().position(|o| *o == Some(0.0)).unwrap_or(0);
    if offsets[first].is_none() {
        offsets[first] = Some(0.0);
    }
    let last = offsets
        .iter()
        .rposition(|o| *o == Some(1.0))
        .unwrap_or(len - 1);
    if len > 1 && offsets[last].is_none() {
        offsets[last] = Some(1.0);
    }

    let mut i = 0;
    while i < len {
        if offsets[i].is_some() {
            i += 1;
            continue;
        }
        let mut j = i;
        while j < len && offsets[j].is_none() {
            j += 1;
        }

        // Virtual bounds: 0 before the list, 1 after it.
        let (start, start_idx) = if i == 0 {
            (0.0, -1isize)
        } else {
            (offsets[i - 1].unwrap_or(0.0), i as isize - 1)
        };
        let end = if j < len {
            offsets[j].unwrap_or(1.0)
        } else {
            start.max(1.0)
        };
        let span = (j as isize - start_idx) as f64;
        for k in 1..=(j - i) {
            offsets[i + k - 1] = Some(start + (end - start) * k as f64 / span);
        }
        i = j;
    }
}
