//! State transitions for one timeline model.
//!
//! Every reducer takes `(model, action data, ctx)`, mutates the model and records side
//! effects in `ReducerContext`: queued events, configurations to recompile, the clock
//! request and teardown. The engine applies those after the reducer returns, so a reducer
//! never talks to the clock, the plugins' `animate` or listeners directly.

use crate::events::TimelineEvent;
use crate::keyframes::{add_property_keyframes, TargetConfiguration};
use crate::model::{TimelineModel, TimelineState};
use crate::options::{
    AddAnimationOptions, AnimationOptions, BaseAnimationOptions, PlayOptions, PropertyInput,
    Props, SetOptions,
};

#[derive(Clone, Debug)]
pub enum Action {
    /// Parallel group placed at the cursor.
    Append(Vec<AddAnimationOptions>),
    /// Blocks pinned to an absolute window.
    Insert {
        from: f64,
        to: f64,
        options: Vec<BaseAnimationOptions>,
    },
    Set(Vec<SetOptions>),
    Play(PlayOptions),
    Pause,
    Reverse,
    Seek(f64),
    SetRate(f64),
    Cancel,
    Finish,
    Destroy,
    /// Frame delta in ms.
    Tick(f64),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Append(_) => "append",
            Action::Insert { .. } => "insert",
            Action::Set(_) => "set",
            Action::Play(_) => "play",
            Action::Pause => "pause",
            Action::Reverse => "reverse",
            Action::Seek(_) => "seek",
            Action::SetRate(_) => "set_rate",
            Action::Cancel => "cancel",
            Action::Finish => "finish",
            Action::Destroy => "destroy",
            Action::Tick(_) => "tick",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClockRequest {
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Default)]
pub struct ReducerContext {
    /// FIFO emission order.
    pub events: Vec<TimelineEvent>,
    /// Configuration indices to (re)compile into players. No duplicates.
    pub need_update: Vec<usize>,
    /// Last request wins.
    pub clock: Option<ClockRequest>,
    /// Remove the model once this dispatch completes.
    pub destroyed: bool,
}

impl ReducerContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn trigger(&mut self, event: TimelineEvent) {
        self.events.push(event);
    }

    pub fn dirty(&mut self, config: usize) {
        if !self.need_update.contains(&config) {
            self.need_update.push(config);
        }
    }

    pub fn dirty_all(&mut self, count: usize) {
        for i in 0..count {
            self.dirty(i);
        }
    }

    #[inline]
    pub fn subscribe(&mut self) {
        self.clock = Some(ClockRequest::Subscribe);
    }

    #[inline]
    pub fn unsubscribe(&mut self) {
        self.clock = Some(ClockRequest::Unsubscribe);
    }
}

/// Route `action` to its reducer. `max_wraps` bounds repeat wrap-around per tick.
pub fn reduce(model: &mut TimelineModel, action: Action, max_wraps: u32, ctx: &mut ReducerContext) {
    match action {
        Action::Append(list) => append(model, list, ctx),
        Action::Insert { from, to, options } => insert(model, from, to, options, ctx),
        Action::Set(list) => set(model, list, ctx),
        Action::Play(opts) => play(model, opts, ctx),
        Action::Pause => pause(model, ctx),
        Action::Reverse => reverse(model, ctx),
        Action::Seek(time) => seek(model, time, ctx),
        Action::SetRate(rate) => set_rate(model, rate),
        Action::Cancel => cancel(model, ctx),
        Action::Finish => finish(model, ctx),
        Action::Destroy => destroy(model, ctx),
        Action::Tick(delta) => tick(model, delta, max_wraps, ctx),
    }
}

// Compile everything on first use and remember the extent it was compiled against.
fn activate(model: &mut TimelineModel, ctx: &mut ReducerContext) {
    ctx.dirty_all(model.configs.len());
    model.state = TimelineState::Pending;
    model.compiled_extent = Some((model.cursor, model.duration));
}

fn insert_block(model: &mut TimelineModel, opts: &AnimationOptions, ctx: &mut ReducerContext) {
    let len = opts.targets.len();
    for (index, target) in opts.targets.iter().enumerate() {
        let mut config = TargetConfiguration::new(target.clone(), len);
        config.easing = opts.easing.clone();
        config.stagger = opts.stagger.unwrap_or(0.0);
        config.end_delay = opts
            .end_delay
            .as_ref()
            .map_or(0.0, |d| d.resolve(target, index, len));
        add_property_keyframes(&mut config, index, opts);
        model.configs.push(config);
        ctx.dirty(model.configs.len() - 1);
    }
}

fn configs_added(model: &mut TimelineModel, before: usize, ctx: &mut ReducerContext) {
    if model.configs.len() == before {
        return;
    }
    model.recompute_extent();
    ctx.trigger(TimelineEvent::Config);
}

pub fn append(model: &mut TimelineModel, list: Vec<AddAnimationOptions>, ctx: &mut ReducerContext) {
    let before = model.configs.len();
    let start = model.cursor;
    for opts in list {
        let placed = opts.place(start);
        insert_block(model, &placed, ctx);
    }
    configs_added(model, before, ctx);
}

pub fn insert(
    model: &mut TimelineModel,
    from: f64,
    to: f64,
    options: Vec<BaseAnimationOptions>,
    ctx: &mut ReducerContext,
) {
    let before = model.configs.len();
    for base in options {
        insert_block(model, &base.at(from, to), ctx);
    }
    configs_added(model, before, ctx);
}

/// Zero-length blocks that pin each property to a single value at `at`.
pub fn set(model: &mut TimelineModel, list: Vec<SetOptions>, ctx: &mut ReducerContext) {
    let before = model.configs.len();
    for opts in list {
        let at = opts.at.unwrap_or(model.cursor);
        let props = opts
            .props
            .into_iter()
            .map(|(name, value)| (name, Some(PropertyInput::one(value))))
            .collect();
        let placed = AnimationOptions {
            from: at,
            to: at,
            targets: opts.targets,
            easing: opts.easing,
            stagger: None,
            delay: None,
            end_delay: None,
            props: Props::Map(props),
        };
        insert_block(model, &placed, ctx);
    }
    configs_added(model, before, ctx);
}

pub fn play(model: &mut TimelineModel, opts: PlayOptions, ctx: &mut ReducerContext) {
    if let Some(repeat) = opts.repeat {
        model.repeat = repeat;
    }
    if let Some(alternate) = opts.alternate {
        model.yoyo = alternate;
    }
    if let Some(destroy) = opts.destroy {
        model.destroy = destroy;
    }

    match model.state {
        TimelineState::Running => return,
        TimelineState::Idle => activate(model, ctx),
        TimelineState::Finished => model.round = 0,
        _ => {}
    }
    // Starting on the trailing edge would finish on the first frame.
    if model.rate < 0.0 && model.time <= 0.0 {
        model.time = model.duration;
    } else if model.rate >= 0.0 && model.time >= model.duration {
        model.time = 0.0;
    }

    model.state = TimelineState::Running;
    ctx.subscribe();
    ctx.trigger(TimelineEvent::Play);
}

pub fn pause(model: &mut TimelineModel, ctx: &mut ReducerContext) {
    if model.state == TimelineState::Idle {
        activate(model, ctx);
    }
    if !matches!(model.state, TimelineState::Running | TimelineState::Pending) {
        return;
    }
    model.state = TimelineState::Paused;
    ctx.unsubscribe();
    ctx.trigger(TimelineEvent::Pause);
}

/// Flip direction in place; time and round are kept.
pub fn reverse(model: &mut TimelineModel, ctx: &mut ReducerContext) {
    model.rate = -model.rate;
    ctx.trigger(TimelineEvent::Reverse);
}

pub fn seek(model: &mut TimelineModel, time: f64, ctx: &mut ReducerContext) {
    if time.is_nan() {
        return;
    }
    if model.state == TimelineState::Idle {
        activate(model, ctx);
    }
    let extent = (model.cursor, model.duration);
    if model.compiled_extent != Some(extent) {
        ctx.dirty_all(model.configs.len());
        model.compiled_extent = Some(extent);
    }
    if model.state == TimelineState::Finished {
        model.state = TimelineState::Paused;
    }
    model.time = time.clamp(0.0, model.duration);
    ctx.trigger(TimelineEvent::Update);
}

pub fn set_rate(model: &mut TimelineModel, rate: f64) {
    if rate.is_finite() {
        model.rate = rate;
    }
}

// Revert targets and drop everything compiled from the configurations.
fn release(model: &mut TimelineModel, ctx: &mut ReducerContext) {
    for mut player in model.players.drain(..) {
        player.controller.cancel();
    }
    model.configs.clear();
    model.compiled_extent = None;
    model.recompute_extent();
    ctx.need_update.clear();
    ctx.unsubscribe();
}

pub fn cancel(model: &mut TimelineModel, ctx: &mut ReducerContext) {
    release(model, ctx);
    model.state = TimelineState::Cancelled;
    model.time = 0.0;
    model.round = 0;
    ctx.trigger(TimelineEvent::Cancel);
}

pub fn finish(model: &mut TimelineModel, ctx: &mut ReducerContext) {
    if model.state == TimelineState::Idle {
        activate(model, ctx);
    }
    model.time = if model.rate >= 0.0 { model.duration } else { 0.0 };
    complete(model, ctx);
}

// Terminal step of playback: pinned time is already set.
fn complete(model: &mut TimelineModel, ctx: &mut ReducerContext) {
    model.state = TimelineState::Finished;
    ctx.unsubscribe();
    ctx.trigger(TimelineEvent::Update);
    ctx.trigger(TimelineEvent::Finish);
    if model.destroy {
        ctx.destroyed = true;
    }
}

pub fn destroy(model: &mut TimelineModel, ctx: &mut ReducerContext) {
    release(model, ctx);
    model.state = TimelineState::Destroyed;
    ctx.destroyed = true;
}

/// Advance by one frame. Handles iteration boundaries (repeat/yoyo) and completion.
pub fn tick(model: &mut TimelineModel, delta: f64, max_wraps: u32, ctx: &mut ReducerContext) {
    if model.state != TimelineState::Running || !delta.is_finite() {
        return;
    }
    model.time += delta * model.rate;

    let mut wraps = 0u32;
    loop {
        let forward = model.rate >= 0.0;
        let crossed = if forward {
            model.time >= model.duration
        } else {
            model.time <= 0.0
        };
        if !crossed {
            break;
        }

        let round = model.round.saturating_add(1);
        if model.duration <= 0.0 || model.repeat.is_exhausted(round) {
            model.round = round;
            model.time = if forward { model.duration } else { 0.0 };
            complete(model, ctx);
            return;
        }
        if wraps >= max_wraps {
            model.time = model.time.clamp(0.0, model.duration);
            break;
        }

        model.round = round;
        wraps += 1;
        let overshoot = if forward {
            model.time - model.duration
        } else {
            -model.time
        };
        if model.yoyo {
            model.rate = -model.rate;
            model.time = if forward {
                model.duration - overshoot
            } else {
                overshoot
            };
        } else {
            model.time = if forward {
                overshoot
            } else {
                model.duration - overshoot
            };
        }
    }
    ctx.trigger(TimelineEvent::Update);
}
