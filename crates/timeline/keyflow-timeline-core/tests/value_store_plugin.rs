use std::rc::Rc;

use keyflow_timeline::{
    AddAnimationOptions, BaseAnimationOptions, Config, ManualTime, PlayOptions, PropertyInput,
    PropertyValue, Runtime, TimelineOptions, TimelineState, ValueStorePlugin,
};

fn slide(target: &str, to: f64, duration: f64) -> AddAnimationOptions {
    AddAnimationOptions::new(BaseAnimationOptions::new([target]).prop("x", PropertyInput::one(to)))
        .duration(duration)
}

#[test]
fn start_value_is_read_from_the_store() {
    let rt = Runtime::with_time_source(Config::default(), ManualTime::new(0.0));
    let plugin = Rc::new(ValueStorePlugin::new());
    plugin.set("box", "x", 10.0);
    rt.register_plugin(plugin.clone());

    let tl = rt.timeline(TimelineOptions::default());
    tl.add(slide("box", 110.0, 100.0)).play(PlayOptions::default());
    rt.frame_at(0.0);
    rt.frame_at(50.0);
    assert_eq!(plugin.get("box", "x"), Some(PropertyValue::Number(60.0)));

    tl.cancel();
    assert_eq!(plugin.get("box", "x"), Some(PropertyValue::Number(10.0)));
}

#[test]
fn timelines_on_one_runtime_advance_independently() {
    let time = ManualTime::new(0.0);
    let rt = Runtime::with_time_source(Config::default(), time.clone());
    let plugin = Rc::new(ValueStorePlugin::new());
    plugin.set("a", "x", 0.0);
    plugin.set("b", "x", 0.0);
    rt.register_plugin(plugin.clone());

    let a = rt.timeline(TimelineOptions::default());
    let b = rt.timeline(TimelineOptions::default());
    a.add(slide("a", 100.0, 100.0)).play(PlayOptions::default());
    b.add(slide("b", 100.0, 400.0)).play(PlayOptions::default());

    assert!(rt.frame());
    time.advance(200.0);
    assert!(rt.frame());

    assert_eq!(a.state(), TimelineState::Finished);
    assert_eq!(plugin.get("a", "x"), Some(PropertyValue::Number(100.0)));
    assert_eq!(b.current_time(), 200.0);
    assert_eq!(plugin.get("b", "x"), Some(PropertyValue::Number(50.0)));

    b.pause();
    // One more frame commits the last unsubscribe; afterwards the loop goes idle.
    assert!(rt.frame());
    assert!(!rt.frame());
}

#[test]
fn custom_easing_is_used_by_name() {
    let rt = Runtime::with_time_source(Config::default(), ManualTime::new(0.0));
    let mut plugin = ValueStorePlugin::new();
    plugin.easings_mut().register("snap-half", |t| if t < 0.5 { 0.0 } else { 1.0 });
    plugin.set("box", "x", 0.0);
    let plugin = Rc::new(plugin);
    rt.register_plugin(plugin.clone());

    let tl = rt.timeline(TimelineOptions::default());
    tl.add(AddAnimationOptions::new(
        BaseAnimationOptions::new(["box"])
            .easing("snap-half")
            .prop("x", PropertyInput::one(8.0)),
    )
    .duration(100.0));

    tl.seek(40.0);
    assert_eq!(plugin.get("box", "x"), Some(PropertyValue::Number(0.0)));
    tl.seek(60.0);
    assert_eq!(plugin.get("box", "x"), Some(PropertyValue::Number(8.0)));
}
