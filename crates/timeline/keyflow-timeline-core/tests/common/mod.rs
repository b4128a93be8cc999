#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use keyflow_timeline::{
    AnimationController, Config, Effect, ManualTime, Plugin, PropertyValue, Runtime, Target,
};

pub fn approx(a: f64, b: f64, eps: f64) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Animate {
        target: String,
        prop: String,
    },
    Update {
        target: String,
        prop: String,
        time: f64,
        rate: f64,
        active: bool,
    },
    Cancel {
        target: String,
        prop: String,
    },
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// Handles every property and records each controller call.
pub struct RecordingPlugin {
    pub calls: CallLog,
    pub start_value: Option<PropertyValue>,
}

impl RecordingPlugin {
    pub fn new() -> Self {
        Self {
            calls: CallLog::default(),
            start_value: None,
        }
    }

    pub fn updates_for(&self, prop: &str) -> Vec<(f64, f64, bool)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Update {
                    prop: p,
                    time,
                    rate,
                    active,
                    ..
                } if p == prop => Some((*time, *rate, *active)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }
}

struct Recorder {
    calls: CallLog,
    target: String,
    prop: String,
}

impl AnimationController for Recorder {
    fn cancel(&mut self) {
        self.calls.borrow_mut().push(Call::Cancel {
            target: self.target.clone(),
            prop: self.prop.clone(),
        });
    }

    fn update(&mut self, time: f64, rate: f64, is_active: bool) {
        self.calls.borrow_mut().push(Call::Update {
            target: self.target.clone(),
            prop: self.prop.clone(),
            time,
            rate,
            active: is_active,
        });
    }
}

impl Plugin for RecordingPlugin {
    fn name(&self) -> &str {
        "recording"
    }

    fn animate(&self, effect: &Effect) -> Box<dyn AnimationController> {
        self.calls.borrow_mut().push(Call::Animate {
            target: effect.target.to_string(),
            prop: effect.prop.clone(),
        });
        Box::new(Recorder {
            calls: self.calls.clone(),
            target: effect.target.to_string(),
            prop: effect.prop.clone(),
        })
    }

    fn get_value(&self, _target: &Target, _prop: &str) -> Option<PropertyValue> {
        self.start_value.clone()
    }

    fn is_handled(&self, _target: &Target, _prop: &str) -> bool {
        true
    }
}

pub fn manual_runtime() -> (Runtime, Rc<RecordingPlugin>) {
    manual_runtime_with(Config::default())
}

pub fn manual_runtime_with(config: Config) -> (Runtime, Rc<RecordingPlugin>) {
    let rt = Runtime::with_time_source(config, ManualTime::new(0.0));
    let plugin = Rc::new(RecordingPlugin::new());
    rt.register_plugin(plugin.clone());
    (rt, plugin)
}
