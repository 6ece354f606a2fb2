use std::{
    marker::PhantomData,
    thread::{self, ThreadId},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    curve::{Curve, CurveError, Keyframe, Range},
    evaluator::fold_periodic,
    interpolation::Segment,
};

pub const DEFAULT_MAX_STEP_PX: f64 = 20.0;
const MAX_DISPLAY_SAMPLES: usize = 1_000_000;
const MIN_KEYFRAME_GAP: f64 = 1e-6;

/// Maps curve space onto a device row of `width` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Curve abscissa drawn at device x = 0.
    pub x_offset: f64,
    /// Device pixels per curve unit along x.
    pub x_scale: f64,
    /// Device pixels per curve unit along y.
    pub y_scale: f64,
    pub width: f64,
}

impl Viewport {
    pub fn new(x_offset: f64, x_scale: f64, y_scale: f64, width: f64) -> Result<Self, CurveError> {
        let valid = x_offset.is_finite()
            && x_scale.is_finite()
            && x_scale > 0.0
            && y_scale.is_finite()
            && width.is_finite()
            && width > 0.0;
        if !valid {
            return Err(CurveError::InvalidViewport);
        }
        Ok(Self {
            x_offset,
            x_scale,
            y_scale,
            width,
        })
    }

    /// Shows `[x_min, x_max]` across `width` pixels.
    pub fn fit(x_min: f64, x_max: f64, width: f64, y_scale: f64) -> Result<Self, CurveError> {
        if x_min.is_nan() || x_max.is_nan() || x_max <= x_min {
            return Err(CurveError::InvalidRange {
                min: x_min,
                max: x_max,
            });
        }
        Self::new(x_min, width / (x_max - x_min), y_scale, width)
    }

    #[must_use]
    pub fn left_edge(&self) -> f64 {
        self.x_offset
    }

    #[must_use]
    pub fn right_edge(&self) -> f64 {
        self.x_offset + self.width / self.x_scale
    }

    #[must_use]
    pub fn pixel_width(&self) -> f64 {
        1.0 / self.x_scale
    }
}

/// Display calls must run on the thread that created this context. It is neither `Send` nor `Sync`.
#[derive(Debug)]
pub struct DisplayContext {
    viewport: Viewport,
    curvature_floor: f64,
    owner: ThreadId,
    _owning_thread: PhantomData<*const ()>,
}

impl DisplayContext {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self::with_max_step(viewport, DEFAULT_MAX_STEP_PX)
    }

    /// `max_step_px` bounds the step taken over a straight stretch of curve.
    #[must_use]
    pub fn with_max_step(viewport: Viewport, max_step_px: f64) -> Self {
        let max_step_px = if max_step_px.is_finite() && max_step_px >= 1.0 {
            max_step_px
        } else {
            DEFAULT_MAX_STEP_PX
        };
        Self {
            viewport,
            curvature_floor: 2.0 / max_step_px,
            owner: thread::current().id(),
            _owning_thread: PhantomData,
        }
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    fn check_owner(&self) {
        assert_eq!(
            thread::current().id(),
            self.owner,
            "display context used off its owning thread"
        );
    }
}

/// Scan position carried across one draw pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentHint {
    upper: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentStep {
    pub next_x: f64,
    /// Set when the step was clamped onto a keyframe; its time is in unfolded x.
    pub keyframe: Option<Keyframe>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySample {
    pub x: f64,
    pub y: f64,
    pub is_keyframe: bool,
}

fn strictly_after(x: f64, candidate: f64) -> f64 {
    if candidate > x {
        candidate
    } else {
        x + f64::EPSILON * x.abs().max(1.0) * 2.0
    }
}

/// Next abscissa to sample after `x` so the chord stays within about a device pixel of the curve.
#[must_use]
pub fn next_point_for_segment(
    ctx: &DisplayContext,
    x: f64,
    keyframes: &[Keyframe],
    periodic: bool,
    x_range: Range,
    hint: &mut SegmentHint,
) -> SegmentStep {
    ctx.check_owner();
    let viewport = ctx.viewport;
    let edge = SegmentStep {
        next_x: strictly_after(x, viewport.right_edge().max(x + viewport.pixel_width())),
        keyframe: None,
    };

    let (Some(first), Some(last)) = (keyframes.first(), keyframes.last()) else {
        return edge;
    };
    let period = (periodic && x_range.is_bounded() && x_range.max > x_range.min)
        .then(|| x_range.max - x_range.min);

    let Some(period) = period else {
        if x < first.time {
            return SegmentStep {
                next_x: first.time,
                keyframe: Some(*first),
            };
        }
        if x >= last.time {
            return edge;
        }
        return step_inside(ctx, x, x, keyframes, None, hint).unwrap_or(edge);
    };

    let xc = fold_periodic(x, x_range.min, period);
    step_inside(ctx, x, xc, keyframes, Some(period), hint).unwrap_or(edge)
}

fn step_inside(
    ctx: &DisplayContext,
    x: f64,
    xc: f64,
    keys: &[Keyframe],
    period: Option<f64>,
    hint: &mut SegmentHint,
) -> Option<SegmentStep> {
    let len = keys.len();
    let mut upper = hint.upper;
    if upper > len || (upper > 0 && keys[upper - 1].time > xc) {
        upper = 0;
    }
    while upper < len && keys[upper].time <= xc {
        upper += 1;
    }
    hint.upper = upper;

    let shift = |key: &Keyframe, offset: f64| Keyframe {
        time: key.time + offset,
        ..*key
    };
    let (prev, next) = match (upper, period) {
        (0, Some(p)) => (shift(&keys[len - 1], -p), keys[0]),
        (u, Some(p)) if u == len => (keys[len - 1], shift(&keys[0], p)),
        (0, None) => return None,
        (u, None) if u == len => return None,
        (u, _) => (keys[u - 1], keys[u]),
    };

    let segment = Segment::between(&prev, &next);
    if segment.span() <= 0.0 {
        return None;
    }

    let viewport = ctx.viewport;
    let x_scale_sq = viewport.x_scale * viewport.x_scale;
    let d2_device = (segment.second_derivative_at(xc) * viewport.y_scale / x_scale_sq).abs();
    let delta_px = (2.0 / d2_device.sqrt().max(ctx.curvature_floor)).max(1.0);
    let delta_x = delta_px / viewport.x_scale;

    let to_next = next.time - xc;
    if xc + delta_x >= next.time && to_next > MIN_KEYFRAME_GAP {
        let next_x = strictly_after(x, next.time + (x - xc));
        return Some(SegmentStep {
            next_x,
            keyframe: Some(Keyframe {
                time: next_x,
                ..next
            }),
        });
    }
    Some(SegmentStep {
        next_x: strictly_after(x, x + delta_x),
        keyframe: None,
    })
}

/// Samples a whole draw pass, left device edge to right, with one scan hint.
#[instrument(skip_all, fields(keyframes = curve.keyframe_count()))]
pub fn sample_for_display(ctx: &DisplayContext, curve: &Curve) -> Vec<DisplaySample> {
    ctx.check_owner();
    if !curve.is_animated() {
        return Vec::new();
    }
    let viewport = ctx.viewport;
    let right = viewport.right_edge();
    let mut hint = SegmentHint::default();
    let mut x = viewport.left_edge();
    let mut samples = vec![DisplaySample {
        x,
        y: curve.evaluate(x, 0.0),
        is_keyframe: false,
    }];

    while x < right {
        if samples.len() >= MAX_DISPLAY_SAMPLES {
            warn!(x, right, "display sampling stopped at the sample limit");
            break;
        }
        let step = next_point_for_segment(
            ctx,
            x,
            curve.keyframes(),
            curve.is_periodic(),
            curve.x_range(),
            &mut hint,
        );
        x = step.next_x;
        samples.push(match step.keyframe {
            Some(key) => DisplaySample {
                x,
                y: key.value,
                is_keyframe: true,
            },
            None => DisplaySample {
                x,
                y: curve.evaluate(x, 0.0),
                is_keyframe: false,
            },
        });
    }
    debug!(samples = samples.len(), "display pass sampled");
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::KeyframeInterpolation;

    fn linear_curve() -> Curve {
        let mut curve = Curve::new();
        for (t, v) in [(0.0, 0.0), (10.0, 10.0)] {
            curve.set_or_add_keyframe(
                Keyframe::new(t, v).with_interpolation(KeyframeInterpolation::Linear),
            );
        }
        curve
    }

    #[test]
    fn before_first_key_jumps_onto_it() {
        let ctx = DisplayContext::new(Viewport::fit(-5.0, 15.0, 200.0, 10.0).expect("viewport"));
        let curve = linear_curve();
        let mut hint = SegmentHint::default();
        let step = next_point_for_segment(
            &ctx,
            -5.0,
            curve.keyframes(),
            false,
            curve.x_range(),
            &mut hint,
        );
        assert_eq!(step.next_x, 0.0);
        assert_eq!(step.keyframe.map(|k| k.value), Some(0.0));
    }

    #[test]
    fn straight_segment_uses_the_widest_step() {
        // 100 pixels per unit: a 20 pixel step covers 0.2
        let ctx = DisplayContext::new(Viewport::fit(0.0, 10.0, 1000.0, 1.0).expect("viewport"));
        let curve = linear_curve();
        let mut hint = SegmentHint::default();
        let step = next_point_for_segment(
            &ctx,
            1.0,
            curve.keyframes(),
            false,
            curve.x_range(),
            &mut hint,
        );
        assert!((step.next_x - 1.2).abs() < 1e-9);
        assert!(step.keyframe.is_none());
    }

    #[test]
    fn overshoot_is_clamped_onto_next_key() {
        let ctx = DisplayContext::new(Viewport::fit(0.0, 100.0, 100.0, 1.0).expect("viewport"));
        let curve = linear_curve();
        let mut hint = SegmentHint::default();
        let step = next_point_for_segment(
            &ctx,
            5.0,
            curve.keyframes(),
            false,
            curve.x_range(),
            &mut hint,
        );
        assert_eq!(step.next_x, 10.0);
        assert_eq!(step.keyframe.map(|k| k.value), Some(10.0));
    }

    #[test]
    fn full_pass_lands_on_every_keyframe() {
        let ctx = DisplayContext::new(Viewport::fit(-2.0, 12.0, 140.0, 5.0).expect("viewport"));
        let mut curve = Curve::new();
        for (t, v) in [(0.0, 0.0), (3.0, 8.0), (7.5, -2.0), (10.0, 1.0)] {
            curve.set_or_add_keyframe(Keyframe::new(t, v));
        }
        let samples = sample_for_display(&ctx, &curve);
        let keyed: Vec<f64> = samples
            .iter()
            .filter(|s| s.is_keyframe)
            .map(|s| s.x)
            .collect();
        assert_eq!(keyed, vec![0.0, 3.0, 7.5, 10.0]);
        assert!(samples.windows(2).all(|w| w[1].x > w[0].x));
        assert!(samples.last().is_some_and(|s| s.x >= 12.0));
    }

    #[test]
    fn invalid_viewport_is_rejected() {
        assert_eq!(
            Viewport::new(0.0, 0.0, 1.0, 100.0),
            Err(CurveError::InvalidViewport)
        );
        assert!(Viewport::fit(3.0, 3.0, 100.0, 1.0).is_err());
    }
}
