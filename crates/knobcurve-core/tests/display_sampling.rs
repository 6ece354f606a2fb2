use knobcurve_core::{
    Curve, DisplayContext, Keyframe, KeyframeInterpolation, SegmentHint, Viewport,
    fixtures::{periodic_wave_curve, ramp_curve},
    next_point_for_segment, sample_for_display,
};
use proptest::prelude::*;

fn context(x_min: f64, x_max: f64, width: f64) -> DisplayContext {
    DisplayContext::new(Viewport::fit(x_min, x_max, width, 1.0).expect("valid viewport"))
}

#[test]
fn empty_curve_draws_nothing() {
    let ctx = context(0.0, 10.0, 400.0);
    assert!(sample_for_display(&ctx, &Curve::new()).is_empty());
}

#[test]
fn samples_advance_and_cover_the_viewport() {
    let ctx = context(-10.0, 60.0, 700.0);
    let samples = sample_for_display(&ctx, &ramp_curve());
    assert!(samples.len() > 2);
    assert!(samples.windows(2).all(|pair| pair[1].x > pair[0].x));
    assert_eq!(samples[0].x, ctx.viewport().left_edge());
    let last = samples.last().expect("at least one sample");
    assert!(last.x >= ctx.viewport().right_edge());
}

#[test]
fn every_visible_keyframe_is_hit_exactly() {
    let ctx = context(-5.0, 55.0, 600.0);
    let curve = ramp_curve();
    let samples = sample_for_display(&ctx, &curve);
    for key in curve.keyframes() {
        assert!(
            samples
                .iter()
                .any(|s| s.is_keyframe && s.x == key.time && s.y == key.value),
            "key at {} missing",
            key.time
        );
    }
}

#[test]
fn periodic_keys_repeat_in_every_visible_period() {
    let ctx = context(0.0, 30.0, 600.0);
    let samples = sample_for_display(&ctx, &periodic_wave_curve());
    let key_xs: Vec<f64> = samples
        .iter()
        .filter(|s| s.is_keyframe)
        .map(|s| s.x)
        .collect();
    for expected in [2.5, 12.5, 22.5] {
        assert!(
            key_xs.iter().any(|x| (x - expected).abs() < 1e-9),
            "no key near {expected} in {key_xs:?}"
        );
    }
}

#[test]
fn straight_segments_take_the_largest_step() {
    let mut curve = Curve::new();
    curve.set_keyframes(vec![
        Keyframe::new(0.0, 0.0).with_interpolation(KeyframeInterpolation::Linear),
        Keyframe::new(100.0, 100.0).with_interpolation(KeyframeInterpolation::Linear),
    ]);
    let viewport = Viewport::fit(0.0, 100.0, 1000.0, 1.0).expect("valid viewport");
    let ctx = DisplayContext::with_max_step(viewport, 40.0);
    let mut hint = SegmentHint::default();
    let step = next_point_for_segment(
        &ctx,
        10.0,
        curve.keyframes(),
        false,
        curve.x_range(),
        &mut hint,
    );
    // 40 px at 10 px per unit.
    assert!((step.next_x - 14.0).abs() < 1e-9, "{}", step.next_x);
    assert!(step.keyframe.is_none());
}

#[test]
fn display_context_stays_on_its_thread() {
    let ctx = context(0.0, 10.0, 100.0);
    let curve = ramp_curve();
    let handle =
        std::thread::spawn(move || sample_for_display(&context(0.0, 10.0, 100.0), &curve).len());
    assert!(handle.join().expect("sampling thread") > 0);
    assert!(!sample_for_display(&ctx, &ramp_curve()).is_empty());
}

fn keyframes() -> impl Strategy<Value = Vec<Keyframe>> {
    prop::collection::btree_map(-200i32..200, -50.0f64..50.0, 1..16).prop_map(|keys| {
        keys.into_iter()
            .map(|(time, value)| Keyframe::new(f64::from(time) * 0.25, value))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        .. ProptestConfig::default()
    })]

    #[test]
    fn next_point_is_strictly_after_x(
        keys in keyframes(),
        periodic in any::<bool>(),
        x in -80.0f64..80.0,
        width in 50.0f64..2000.0,
    ) {
        let mut curve = if periodic {
            Curve::periodic(-50.0, 50.0).expect("valid period")
        } else {
            Curve::new()
        };
        curve.set_keyframes(keys);
        let ctx = context(-80.0, 80.0, width);
        let mut hint = SegmentHint::default();
        let step = next_point_for_segment(
            &ctx,
            x,
            curve.keyframes(),
            curve.is_periodic(),
            curve.x_range(),
            &mut hint,
        );
        prop_assert!(step.next_x > x, "{} <= {}", step.next_x, x);
    }

    #[test]
    fn a_full_pass_terminates_with_increasing_x(keys in keyframes(), width in 50.0f64..1500.0) {
        let mut curve = Curve::new();
        curve.set_keyframes(keys);
        let ctx = context(-60.0, 60.0, width);
        let samples = sample_for_display(&ctx, &curve);
        prop_assert!(samples.windows(2).all(|pair| pair[1].x > pair[0].x));
    }
}
