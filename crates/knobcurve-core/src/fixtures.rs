use std::sync::Arc;

use uuid::Uuid;

use crate::{
    curve::{Curve, Keyframe, KeyframeInterpolation},
    holder::{KnobHolder, KnobSpec, Timeline},
    knob::{DimSpec, Knob, ParamStore, ViewIdx, ViewSpec},
    value::{KnobKind, KnobValue, ValueChangeReason},
};

pub const TRANSLATE_ID: Uuid = Uuid::from_u128(0x5c1e_7a2d_0b44_4e0f_9a61_3d2b_8e70_0001);
pub const OPACITY_ID: Uuid = Uuid::from_u128(0x5c1e_7a2d_0b44_4e0f_9a61_3d2b_8e70_0002);
pub const BLEND_ID: Uuid = Uuid::from_u128(0x5c1e_7a2d_0b44_4e0f_9a61_3d2b_8e70_0003);
pub const NOTE_ID: Uuid = Uuid::from_u128(0x5c1e_7a2d_0b44_4e0f_9a61_3d2b_8e70_0004);

/// A transform-like node with one knob of each common shape.
pub struct DemoScene {
    pub timeline: Arc<Timeline>,
    pub holder: Arc<KnobHolder>,
    /// Two static double dimensions.
    pub translate: Arc<Knob>,
    /// Animated: keys at 0 (0.0) and 48 (1.0).
    pub opacity: Arc<Knob>,
    pub blend: Arc<Knob>,
    pub note: Arc<Knob>,
}

#[must_use]
pub fn demo_scene() -> DemoScene {
    let timeline = Timeline::new(0.0);
    let holder = KnobHolder::new("Transform1", Arc::clone(&timeline));

    let translate = holder.create_knob(
        KnobSpec::new("translate", KnobKind::Double)
            .with_dimensions(2)
            .with_id(TRANSLATE_ID),
    );
    let opacity = holder.create_knob(
        KnobSpec::new("opacity", KnobKind::Double)
            .with_default(KnobValue::Double(1.0))
            .with_id(OPACITY_ID),
    );
    for (time, value) in [(0.0, 0.0), (48.0, 1.0)] {
        opacity.set_value_at_time(
            time,
            KnobValue::Double(value),
            ViewSpec::One(ViewIdx::MAIN),
            DimSpec::All,
            ValueChangeReason::PluginEdited,
        );
    }
    let blend = holder.create_knob(
        KnobSpec::new(
            "blend",
            KnobKind::Choice {
                options: vec!["over".into(), "multiply".into(), "screen".into()],
            },
        )
        .with_id(BLEND_ID),
    );
    let note = holder.create_knob(KnobSpec::new("note", KnobKind::String).with_id(NOTE_ID));

    DemoScene {
        timeline,
        holder,
        translate,
        opacity,
        blend,
        note,
    }
}

/// Smooth ramp with an overshooting middle key.
#[must_use]
pub fn ramp_curve() -> Curve {
    let mut curve = Curve::new();
    curve.set_keyframes(vec![
        Keyframe::new(0.0, 0.0),
        Keyframe::new(12.0, 4.0),
        Keyframe::new(24.0, 1.0),
        Keyframe::new(48.0, 6.0).with_interpolation(KeyframeInterpolation::Linear),
    ]);
    curve
}

/// Periodic over `[0, 10]`, one wave per period.
#[must_use]
pub fn periodic_wave_curve() -> Curve {
    let mut curve = Curve::periodic(0.0, 10.0).expect("fixture period should be valid");
    curve.set_keyframes(vec![
        Keyframe::new(0.0, 0.0),
        Keyframe::new(2.5, 1.0),
        Keyframe::new(5.0, 0.0),
        Keyframe::new(7.5, -1.0),
    ]);
    curve
}
