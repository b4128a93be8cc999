//! Shared runtime handle and the chainable `Timeline` facade.
//!
//! `Runtime` wraps one `Engine` behind `Rc<RefCell<..>>`; clones are cheap and share the
//! same clock, store and plugins. A `Timeline` is just `{ id, runtime }`: every method is
//! an id lookup plus a dispatch, so handles never hold on to a model across frames.
//!
//! Listeners run after the engine borrow is released and may call back into any timeline
//! of the same runtime. Misuse (actions on a cancelled or destroyed timeline, invalid
//! windows) is logged at debug level and otherwise ignored.

use std::cell::RefCell;
use std::rc::Rc;

use crate::clock::TimeSource;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::events::TimelineEvent;
use crate::ids::{ListenerId, TimelineId};
use crate::model::TimelineState;
use crate::options::{
    parse_animations_json, AddAnimationOptions, BaseAnimationOptions, PlayOptions, SetOptions,
    TimelineOptions,
};
use crate::plugin::Plugin;
use crate::reducers::Action;

#[derive(Clone, Debug, Default)]
pub struct Runtime {
    engine: Rc<RefCell<Engine>>,
}

impl Runtime {
    pub fn new(config: Config) -> Self {
        Self::from_engine(Engine::new(config))
    }

    pub fn with_time_source(config: Config, time: impl TimeSource + 'static) -> Self {
        Self::from_engine(Engine::with_time_source(config, time))
    }

    pub fn from_engine(engine: Engine) -> Self {
        Self {
            engine: Rc::new(RefCell::new(engine)),
        }
    }

    pub fn register_plugin(&self, plugin: Rc<dyn Plugin>) {
        self.engine.borrow_mut().register_plugin(plugin);
    }

    /// Create an Idle timeline.
    pub fn timeline(&self, opts: TimelineOptions) -> Timeline {
        let id = self.engine.borrow_mut().create_timeline(opts);
        Timeline {
            id,
            runtime: self.clone(),
        }
    }

    /// Handle for an existing id. Methods on a stale handle are no-ops.
    pub fn handle(&self, id: TimelineId) -> Timeline {
        Timeline {
            id,
            runtime: self.clone(),
        }
    }

    pub fn wants_frame(&self) -> bool {
        self.engine.borrow().wants_frame()
    }

    /// Run a frame at the time source's current instant if one was requested.
    /// Returns whether a frame ran.
    pub fn frame(&self) -> bool {
        let now = {
            let engine = self.engine.borrow();
            if !engine.wants_frame() {
                return false;
            }
            engine.now()
        };
        self.frame_at(now);
        true
    }

    /// Run a frame at `now` (ms): commit clock changes, then tick every subscribed
    /// timeline in subscription order.
    pub fn frame_at(&self, now: f64) {
        let ticks = self.engine.borrow_mut().begin_frame_at(now);
        for tick in ticks {
            // A listener earlier in this frame may have destroyed the timeline.
            self.dispatch(tick.key, Action::Tick(tick.delta));
        }
    }

    /// Borrow the engine directly. Must not be called from inside another `with_engine`.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        f(&mut self.engine.borrow_mut())
    }

    /// Dispatch and deliver. Returns false when the engine refused the action.
    pub fn dispatch(&self, id: TimelineId, action: Action) -> bool {
        let (result, isolate) = {
            let mut engine = self.engine.borrow_mut();
            let isolate = engine.config().isolate_listener_panics;
            (engine.dispatch(id, action), isolate)
        };
        match result {
            Ok(deliveries) => {
                for delivery in deliveries {
                    delivery.deliver(isolate);
                }
                true
            }
            Err(err) => {
                log::debug!("{id}: ignored: {err}");
                false
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Timeline {
    id: TimelineId,
    runtime: Runtime,
}

impl Timeline {
    pub fn id(&self) -> TimelineId {
        self.id
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    fn read<R>(&self, f: impl FnOnce(&crate::model::TimelineModel) -> R) -> Option<R> {
        self.runtime
            .with_engine(|engine| engine.model(self.id).map(f))
    }

    /// `Destroyed` once the model is gone.
    pub fn state(&self) -> TimelineState {
        self.read(|m| m.state).unwrap_or(TimelineState::Destroyed)
    }

    pub fn name(&self) -> Option<String> {
        self.read(|m| m.name.clone()).flatten()
    }

    pub fn duration(&self) -> f64 {
        self.read(|m| m.duration).unwrap_or(0.0)
    }

    pub fn current_time(&self) -> f64 {
        self.read(|m| m.time).unwrap_or(0.0)
    }

    pub fn set_current_time(&self, time: f64) -> &Self {
        self.seek(time)
    }

    pub fn playback_rate(&self) -> f64 {
        self.read(|m| m.rate).unwrap_or(1.0)
    }

    pub fn set_playback_rate(&self, rate: f64) -> &Self {
        self.runtime.dispatch(self.id, Action::SetRate(rate));
        self
    }

    pub fn add(&self, opts: AddAnimationOptions) -> &Self {
        self.add_group(vec![opts])
    }

    /// Blocks that all start at the current cursor.
    pub fn add_group(&self, list: Vec<AddAnimationOptions>) -> &Self {
        self.runtime.dispatch(self.id, Action::Append(list));
        self
    }

    pub fn animate(&self, opts: AddAnimationOptions) -> &Self {
        self.add(opts)
    }

    /// Blocks pinned to `[from, to]` regardless of the cursor.
    pub fn from_to(&self, from: f64, to: f64, options: Vec<BaseAnimationOptions>) -> &Self {
        self.runtime
            .dispatch(self.id, Action::Insert { from, to, options });
        self
    }

    /// Append each block after the previous one.
    pub fn sequence(&self, list: Vec<AddAnimationOptions>) -> &Self {
        for opts in list {
            self.runtime.dispatch(self.id, Action::Append(vec![opts]));
        }
        self
    }

    pub fn set(&self, opts: SetOptions) -> &Self {
        self.runtime.dispatch(self.id, Action::Set(vec![opts]));
        self
    }

    /// Append blocks parsed from JSON (one object or an array) as a group.
    pub fn add_json(&self, json: &str) -> Result<&Self> {
        let list = parse_animations_json(json)?;
        Ok(self.add_group(list))
    }

    pub fn play(&self, opts: PlayOptions) -> &Self {
        self.runtime.dispatch(self.id, Action::Play(opts));
        self
    }

    pub fn pause(&self) -> &Self {
        self.runtime.dispatch(self.id, Action::Pause);
        self
    }

    pub fn reverse(&self) -> &Self {
        self.runtime.dispatch(self.id, Action::Reverse);
        self
    }

    pub fn seek(&self, time: f64) -> &Self {
        self.runtime.dispatch(self.id, Action::Seek(time));
        self
    }

    pub fn cancel(&self) -> &Self {
        self.runtime.dispatch(self.id, Action::Cancel);
        self
    }

    pub fn finish(&self) -> &Self {
        self.runtime.dispatch(self.id, Action::Finish);
        self
    }

    pub fn destroy(&self) {
        self.runtime.dispatch(self.id, Action::Destroy);
    }

    /// Listen for `event`. `None` when the timeline no longer exists.
    pub fn on(&self, event: TimelineEvent, listener: impl Fn(f64) + 'static) -> Option<ListenerId> {
        self.listen(event, listener, false)
    }

    /// Like `on`, but the listener is dropped after its first call.
    pub fn once(&self, event: TimelineEvent, listener: impl Fn(f64) + 'static) -> Option<ListenerId> {
        self.listen(event, listener, true)
    }

    pub fn off(&self, listener: ListenerId) -> bool {
        self.runtime
            .with_engine(|engine| engine.off(self.id, listener))
    }

    fn listen(
        &self,
        event: TimelineEvent,
        listener: impl Fn(f64) + 'static,
        once: bool,
    ) -> Option<ListenerId> {
        let result = self
            .runtime
            .with_engine(|engine| engine.on(self.id, event, Rc::new(listener), once));
        match result {
            Ok(id) => Some(id),
            Err(err) => {
                log::debug!("{}: listener not added: {err}", self.id);
                None
            }
        }
    }
}
