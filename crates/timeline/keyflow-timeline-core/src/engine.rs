//! Dispatcher that owns every timeline and applies reducer side effects.
//!
//! `Engine::dispatch(id, action)`:
//! 1. Look up the model; refuse unknown ids and terminal models.
//! 2. Run the reducer with a fresh `ReducerContext`.
//! 3. Recompile dirty configurations into players (old players for a configuration are
//!    cancelled first) and push the current time into every player.
//! 4. Apply the clock request and pair queued events with their listeners.
//! 5. Remove the model when the reducer asked for teardown.
//!
//! Listener invocation is left to the caller through the returned `Delivery` list.

use std::fmt;
use std::rc::Rc;

use crate::clock::{Clock, FrameTick, SystemTime, TimeSource};
use crate::config::Config;
use crate::effects::EffectCompiler;
use crate::error::{Result, TimelineError};
use crate::events::{Delivery, Emission, Listener, ListenerTable, TimelineEvent};
use crate::ids::{ListenerId, TimelineId};
use crate::model::{AnimationPlayer, TimelineModel, TimelineState};
use crate::options::{BaseAnimationOptions, TimelineOptions};
use crate::plugin::{Plugin, PluginRegistry};
use crate::reducers::{self, Action, ClockRequest, ReducerContext};
use crate::store::Store;

pub struct Engine {
    config: Config,
    clock: Clock<TimelineId>,
    store: Store,
    plugins: PluginRegistry,
    listeners: ListenerTable,
    time: Box<dyn TimeSource>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("store", &self.store)
            .field("plugins", &self.plugins)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Engine {
    /// Engine timed by the monotonic system clock.
    pub fn new(config: Config) -> Self {
        Self::with_time_source(config, SystemTime::new())
    }

    pub fn with_time_source(config: Config, time: impl TimeSource + 'static) -> Self {
        Self {
            config,
            clock: Clock::new(),
            store: Store::new(),
            plugins: PluginRegistry::new(),
            listeners: ListenerTable::default(),
            time: Box::new(time),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn register_plugin(&mut self, plugin: Rc<dyn Plugin>) {
        log::debug!("plugin '{}' registered", plugin.name());
        self.plugins.register(plugin);
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn create_timeline(&mut self, opts: TimelineOptions) -> TimelineId {
        self.store.create(opts)
    }

    pub fn model(&self, id: TimelineId) -> Option<&TimelineModel> {
        self.store.get(id)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn clock(&self) -> &Clock<TimelineId> {
        &self.clock
    }

    pub fn now(&self) -> f64 {
        self.time.now()
    }

    pub fn on(
        &mut self,
        id: TimelineId,
        event: TimelineEvent,
        listener: Listener,
        once: bool,
    ) -> Result<ListenerId> {
        if !self.store.contains(id) {
            return Err(TimelineError::UnknownTimeline(id));
        }
        let lid = self.store.alloc_listener();
        self.listeners.on(id, lid, event, listener, once);
        Ok(lid)
    }

    pub fn off(&mut self, id: TimelineId, listener: ListenerId) -> bool {
        self.listeners.off(id, listener)
    }

    /// Run `action` against timeline `id` and return the events it fired.
    pub fn dispatch(&mut self, id: TimelineId, action: Action) -> Result<Vec<Delivery>> {
        let model = self
            .store
            .get_mut(id)
            .ok_or(TimelineError::UnknownTimeline(id))?;
        if model.state.is_terminal() && !matches!(action, Action::Destroy) {
            return Err(TimelineError::Terminal {
                id,
                state: model.state,
                action: action.name(),
            });
        }
        validate(&action)?;

        if matches!(action, Action::Tick(_)) {
            log::trace!("{id}: {}", action.name());
        } else {
            log::debug!("{id}: {} ({:?})", action.name(), model.state);
        }

        let mut ctx = ReducerContext::new();
        reducers::reduce(model, action, self.config.max_wraps_per_tick, &mut ctx);

        if model.state != TimelineState::Idle && !model.state.is_terminal() {
            sync_players(&self.plugins, &self.config.default_easing, model, &ctx.need_update);
            let (time, rate) = (model.time, model.rate);
            let active = model.state == TimelineState::Running;
            for player in &mut model.players {
                player.controller.update(time, rate, active);
            }
        }

        match ctx.clock {
            Some(ClockRequest::Subscribe) => self.clock.subscribe(id),
            Some(ClockRequest::Unsubscribe) => self.clock.unsubscribe(id),
            None => {}
        }

        let time = model.time;
        let deliveries = ctx
            .events
            .iter()
            .map(|&event| {
                Delivery::new(
                    Emission {
                        timeline: id,
                        event,
                        time,
                    },
                    self.listeners.take(id, event),
                )
            })
            .collect();

        if ctx.destroyed {
            self.store.destroy(id);
            self.listeners.clear(id);
            self.clock.unsubscribe(id);
            log::debug!("{id}: destroyed");
        }
        Ok(deliveries)
    }

    #[inline]
    pub fn wants_frame(&self) -> bool {
        self.clock.wants_frame()
    }

    /// Commit clock changes and compute ticks using the injected time source.
    pub fn begin_frame(&mut self) -> Vec<FrameTick<TimelineId>> {
        let now = self.time.now();
        self.clock.begin_frame_at(now)
    }

    pub fn begin_frame_at(&mut self, now: f64) -> Vec<FrameTick<TimelineId>> {
        self.clock.begin_frame_at(now)
    }
}

fn validate(action: &Action) -> Result<()> {
    match action {
        Action::Append(list) => list.iter().try_for_each(|o| o.validate()),
        Action::Insert { from, to, options } => {
            if !from.is_finite() || !to.is_finite() || to < from {
                return Err(TimelineError::InvalidOptions {
                    reason: format!("invalid window {from}..{to}"),
                });
            }
            options.iter().try_for_each(BaseAnimationOptions::validate)
        }
        Action::Set(list) => {
            if list.iter().any(|s| matches!(s.at, Some(at) if !at.is_finite())) {
                return Err(TimelineError::InvalidOptions {
                    reason: "set time must be finite".to_string(),
                });
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

// Replace the players of every dirty configuration, keeping players ordered by configuration.
fn sync_players(
    plugins: &PluginRegistry,
    default_easing: &str,
    model: &mut TimelineModel,
    dirty: &[usize],
) {
    if dirty.is_empty() {
        return;
    }
    let compiler = EffectCompiler {
        plugins,
        refs: &model.refs,
        default_easing,
    };
    for &index in dirty {
        let Some(config) = model.configs.get(index) else {
            continue;
        };
        model.players.retain_mut(|p| {
            if p.config == index {
                p.controller.cancel();
                false
            } else {
                true
            }
        });

        for effect in compiler.config_effects(config) {
            let Some(plugin) = effect.plugin.as_deref().and_then(|name| plugins.get(name)) else {
                log::warn!(
                    "{}: no plugin handles {}.{}",
                    model.id,
                    effect.target,
                    effect.prop
                );
                continue;
            };
            let controller = plugin.animate(&effect);
            model.players.push(AnimationPlayer {
                config: index,
                target: effect.target,
                prop: effect.prop,
                from: effect.from,
                to: effect.to,
                controller,
            });
        }
    }
    model.players.sort_by_key(|p| p.config);
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::clock::ManualTime;
    use crate::options::{
        AddAnimationOptions, BaseAnimationOptions, KeyframeOptions, PlayOptions, PropertyInput,
    };
    use crate::value_store::ValueStorePlugin;

    fn engine_with_store() -> (Engine, Rc<ValueStorePlugin>) {
        let mut engine = Engine::with_time_source(Config::default(), ManualTime::new(0.0));
        let plugin = Rc::new(ValueStorePlugin::new());
        engine.register_plugin(plugin.clone());
        (engine, plugin)
    }

    fn fade(duration: f64) -> Action {
        Action::Append(vec![AddAnimationOptions::new(
            BaseAnimationOptions::new(["el"]).prop("opacity", PropertyInput::many([0.0, 1.0])),
        )
        .duration(duration)])
    }

    #[test]
    fn players_are_created_on_activation_only() {
        let (mut engine, _) = engine_with_store();
        let id = engine.create_timeline(TimelineOptions::default());
        engine.dispatch(id, fade(1000.0)).unwrap();
        assert!(engine.model(id).unwrap().players.is_empty());

        engine.dispatch(id, Action::Play(PlayOptions::default())).unwrap();
        let m = engine.model(id).unwrap();
        assert_eq!(m.players.len(), 1);
        assert_eq!(m.players[0].prop, "opacity");
        assert!(engine.clock().is_subscribed(&id));
    }

    #[test]
    fn deliveries_carry_listeners_and_time() {
        let (mut engine, _) = engine_with_store();
        let id = engine.create_timeline(TimelineOptions::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        engine
            .on(id, TimelineEvent::Update, Rc::new(move |t: f64| sink.borrow_mut().push(t)), false)
            .unwrap();
        engine.dispatch(id, fade(1000.0)).unwrap();
        let deliveries = engine.dispatch(id, Action::Seek(250.0)).unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].emission.event, TimelineEvent::Update);
        for d in deliveries {
            d.deliver(true);
        }
        assert_eq!(*seen.borrow(), vec![250.0]);
    }

    #[test]
    fn terminal_models_refuse_actions() {
        let (mut engine, _) = engine_with_store();
        let id = engine.create_timeline(TimelineOptions::default());
        engine.dispatch(id, Action::Cancel).unwrap();
        let err = engine.dispatch(id, Action::Seek(10.0)).unwrap_err();
        assert!(matches!(err, TimelineError::Terminal { action: "seek", .. }));

        engine.dispatch(id, Action::Destroy).unwrap();
        assert!(engine.model(id).is_none());
        let err = engine.dispatch(id, Action::Play(PlayOptions::default())).unwrap_err();
        assert!(matches!(err, TimelineError::UnknownTimeline(_)));
    }

    #[test]
    fn invalid_windows_are_rejected() {
        let (mut engine, _) = engine_with_store();
        let id = engine.create_timeline(TimelineOptions::default());
        let err = engine
            .dispatch(
                id,
                Action::Insert {
                    from: 100.0,
                    to: 50.0,
                    options: vec![BaseAnimationOptions::new(["a"])],
                },
            )
            .unwrap_err();
        assert!(matches!(err, TimelineError::InvalidOptions { .. }));
        assert!(engine.model(id).unwrap().configs.is_empty());

        let frames = vec![
            KeyframeOptions::at(0.0).with("x", 0.0),
            KeyframeOptions::at(2.0).with("x", 1.0),
        ];
        let err = engine
            .dispatch(
                id,
                Action::Insert {
                    from: 0.0,
                    to: 100.0,
                    options: vec![BaseAnimationOptions::new(["a"]).keyframes(frames)],
                },
            )
            .unwrap_err();
        assert!(matches!(err, TimelineError::InvalidOptions { .. }));
    }

    #[test]
    fn destroy_releases_clock_and_listeners() {
        let (mut engine, plugin) = engine_with_store();
        plugin.set("el", "opacity", 0.5);
        let id = engine.create_timeline(TimelineOptions::default());
        engine.on(id, TimelineEvent::Play, Rc::new(|_: f64| {}), false).unwrap();
        engine.dispatch(id, fade(100.0)).unwrap();
        engine.dispatch(id, Action::Play(PlayOptions::default())).unwrap();
        engine.begin_frame_at(0.0);
        engine.dispatch(id, Action::Tick(25.0)).unwrap();
        assert_eq!(plugin.get("el", "opacity"), Some(0.25.into()));

        engine.dispatch(id, Action::Destroy).unwrap();
        // Pre-animation value restored.
        assert_eq!(plugin.get("el", "opacity"), Some(0.5.into()));
        assert!(engine.begin_frame_at(16.0).is_empty());
        assert!(engine.on(id, TimelineEvent::Play, Rc::new(|_: f64| {}), false).is_err());
    }
}
