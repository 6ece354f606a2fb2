use tracing::warn;

use crate::{
    curve::{Curve, Keyframe},
    interpolation::Segment,
};

const MAX_INTEGRATION_PIECES: usize = 1_000_000;

/// Where an abscissa lands on a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bracket {
    /// No keyframes; the caller's fallback applies.
    Empty,
    /// Flat extrapolation or a degenerate interval.
    Flat(f64),
    /// Inside a segment, `x` already folded into the parametric domain.
    Segment { segment: Segment, x: f64 },
}

/// Folds `x` into `[x_min, x_min + period)` when it lies outside the closed domain.
#[must_use]
pub fn fold_periodic(x: f64, x_min: f64, period: f64) -> f64 {
    let x_max = x_min + period;
    if x >= x_min && x <= x_max {
        return x;
    }
    let mut folded = (x - x_min) % period + x_min;
    if folded < x_min {
        folded += period;
    }
    folded
}

fn shifted(keyframe: &Keyframe, offset: f64) -> Keyframe {
    Keyframe {
        time: keyframe.time + offset,
        ..*keyframe
    }
}

impl Curve {
    #[must_use]
    pub fn bracket(&self, x: f64) -> Bracket {
        let keys = self.keyframes();
        let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
            return Bracket::Empty;
        };
        if x.is_nan() {
            return Bracket::Flat(first.value);
        }

        let Some((x_min, period)) = self.period() else {
            if x < first.time {
                return Bracket::Flat(first.value);
            }
            if x >= last.time {
                return Bracket::Flat(last.value);
            }
            let upper = keys.partition_point(|k| k.time <= x);
            return segment_or_flat(&keys[upper - 1], &keys[upper], x);
        };

        let xc = fold_periodic(x, x_min, period);
        let upper = keys.partition_point(|k| k.time <= xc);
        if upper == 0 {
            segment_or_flat(&shifted(last, -period), first, xc)
        } else if upper == keys.len() {
            segment_or_flat(last, &shifted(first, period), xc)
        } else {
            segment_or_flat(&keys[upper - 1], &keys[upper], xc)
        }
    }

    /// Value at `x`; `fallback` is returned while the curve has no keyframes.
    #[must_use]
    pub fn evaluate(&self, x: f64, fallback: f64) -> f64 {
        match self.bracket(x) {
            Bracket::Empty => fallback,
            Bracket::Flat(value) => value,
            Bracket::Segment { segment, x } => self.value_kind().quantize(segment.value_at(x)),
        }
    }

    /// Like [`Curve::evaluate`], then clamped into the y range.
    #[must_use]
    pub fn evaluate_clamped(&self, x: f64, fallback: f64) -> f64 {
        let range = self.y_range();
        self.evaluate(x, fallback).clamp(range.min, range.max)
    }

    #[must_use]
    pub fn derivative_at(&self, x: f64) -> f64 {
        match self.bracket(x) {
            Bracket::Empty | Bracket::Flat(_) => 0.0,
            Bracket::Segment { segment, x } => segment.derivative_at(x),
        }
    }

    #[must_use]
    pub fn second_derivative_at(&self, x: f64) -> f64 {
        match self.bracket(x) {
            Bracket::Empty | Bracket::Flat(_) => 0.0,
            Bracket::Segment { segment, x } => segment.second_derivative_at(x),
        }
    }

    /// Integral of the curve from `from` to `to`. Empty curves and NaN bounds integrate to zero.
    #[must_use]
    pub fn integrate(&self, from: f64, to: f64) -> f64 {
        if from.is_nan() || to.is_nan() || self.keyframe_count() == 0 {
            return 0.0;
        }
        if from > to {
            return -self.integrate(to, from);
        }
        let Some((x_min, period)) = self.period() else {
            return self.integrate_pieces(from, to);
        };

        // Every whole period contributes the same area.
        let periods = ((to - from) / period).floor();
        if periods < 1.0 {
            return self.integrate_pieces(from, to);
        }
        let per_period = self.integrate_pieces(x_min, x_min + period);
        if !periods.is_finite() {
            return if per_period.abs() < f64::EPSILON {
                0.0
            } else {
                per_period * periods
            };
        }
        per_period * periods + self.integrate_pieces(from + periods * period, to)
    }

    fn integrate_pieces(&self, from: f64, to: f64) -> f64 {
        let Ok((first_time, _)) = self.keyframe_span() else {
            return 0.0;
        };

        let mut x = from;
        let mut total = 0.0;
        for _ in 0..MAX_INTEGRATION_PIECES {
            if x >= to {
                return total;
            }
            let end = match self.bracket(x) {
                Bracket::Empty => return 0.0,
                Bracket::Flat(value) => {
                    let end = if self.period().is_none() && x < first_time {
                        first_time.min(to)
                    } else {
                        to
                    };
                    total += value * (end - x);
                    end
                }
                Bracket::Segment { segment, x: local } => {
                    let offset = x - local;
                    let end = (segment.t1 + offset).min(to);
                    total += segment.integral(local, end - offset);
                    end
                }
            };
            // Rounding in the periodic fold can stall exactly on a boundary.
            x = if end > x {
                end
            } else {
                x + f64::EPSILON * x.abs().max(1.0)
            };
        }
        warn!(from, to, "integration stopped at the piece limit");
        total
    }
}

fn segment_or_flat(prev: &Keyframe, next: &Keyframe, x: f64) -> Bracket {
    let segment = Segment::between(prev, next);
    if segment.span() <= 0.0 {
        let nearest = if (x - prev.time).abs() <= (next.time - x).abs() {
            prev
        } else {
            next
        };
        return Bracket::Flat(nearest.value);
    }
    Bracket::Segment { segment, x }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::KeyframeInterpolation;

    #[test]
    fn empty_curve_uses_fallback() {
        let curve = Curve::new();
        assert_eq!(curve.evaluate(3.0, 42.0), 42.0);
        assert_eq!(curve.integrate(0.0, 10.0), 0.0);
    }

    #[test]
    fn flat_extrapolation_outside_keys() {
        let mut curve = Curve::new();
        curve.set_or_add_keyframe(Keyframe::new(0.0, 1.0));
        curve.set_or_add_keyframe(Keyframe::new(10.0, 5.0));
        assert_eq!(curve.evaluate(-100.0, 0.0), 1.0);
        assert_eq!(curve.evaluate(10.0, 0.0), 5.0);
        assert_eq!(curve.evaluate(1e9, 0.0), 5.0);
        assert_eq!(curve.derivative_at(-1.0), 0.0);
    }

    #[test]
    fn fold_wraps_both_directions() {
        assert_eq!(fold_periodic(12.0, 0.0, 10.0), 2.0);
        assert_eq!(fold_periodic(-3.0, 0.0, 10.0), 7.0);
        assert_eq!(fold_periodic(4.0, 0.0, 10.0), 4.0);
    }

    #[test]
    fn constant_segment_holds_previous_value() {
        let mut curve = Curve::new();
        curve.set_or_add_keyframe(
            Keyframe::new(0.0, 2.0).with_interpolation(KeyframeInterpolation::Constant),
        );
        curve.set_or_add_keyframe(Keyframe::new(4.0, 8.0));
        assert_eq!(curve.evaluate(3.999, 0.0), 2.0);
        assert_eq!(curve.evaluate(4.0, 0.0), 8.0);
        assert!((curve.integrate(0.0, 4.0) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn linear_integral_with_flat_tails() {
        let mut curve = Curve::new();
        curve.set_or_add_keyframe(
            Keyframe::new(0.0, 0.0).with_interpolation(KeyframeInterpolation::Linear),
        );
        curve.set_or_add_keyframe(
            Keyframe::new(2.0, 2.0).with_interpolation(KeyframeInterpolation::Linear),
        );
        // 0 on [-1, 0], triangle 2 on [0, 2], 2 on [2, 3]
        assert!((curve.integrate(-1.0, 3.0) - 4.0).abs() < 1e-12);
        assert!((curve.integrate(3.0, -1.0) + 4.0).abs() < 1e-12);
    }
}
