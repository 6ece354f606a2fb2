use crate::curve::{Keyframe, KeyframeInterpolation};

/// One interval between two keyframes, already shifted across the wrap for periodic curves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub t0: f64,
    pub v0: f64,
    /// Right derivative of the opening keyframe.
    pub d0: f64,
    pub interpolation: KeyframeInterpolation,
    pub t1: f64,
    pub v1: f64,
    /// Left derivative of the closing keyframe.
    pub d1: f64,
}

impl Segment {
    #[must_use]
    pub fn between(prev: &Keyframe, next: &Keyframe) -> Self {
        Self {
            t0: prev.time,
            v0: prev.value,
            d0: prev.right_derivative,
            interpolation: prev.interpolation,
            t1: next.time,
            v1: next.value,
            d1: next.left_derivative,
        }
    }

    #[must_use]
    pub fn span(&self) -> f64 {
        self.t1 - self.t0
    }

    fn normalized(&self, x: f64) -> f64 {
        (x - self.t0) / self.span()
    }

    fn is_constant(&self) -> bool {
        self.interpolation == KeyframeInterpolation::Constant
    }

    #[must_use]
    pub fn value_at(&self, x: f64) -> f64 {
        let t = self.normalized(x);
        if self.is_constant() {
            return if t < 1.0 { self.v0 } else { self.v1 };
        }
        let span = self.span();
        hermite(self.v0, self.v1, self.d0 * span, self.d1 * span, t)
    }

    #[must_use]
    pub fn derivative_at(&self, x: f64) -> f64 {
        if self.is_constant() {
            return 0.0;
        }
        let t = self.normalized(x);
        let span = self.span();
        let m0 = self.d0 * span;
        let m1 = self.d1 * span;
        let dh = (6.0 * t * t - 6.0 * t) * self.v0
            + (3.0 * t * t - 4.0 * t + 1.0) * m0
            + (-6.0 * t * t + 6.0 * t) * self.v1
            + (3.0 * t * t - 2.0 * t) * m1;
        dh / span
    }

    #[must_use]
    pub fn second_derivative_at(&self, x: f64) -> f64 {
        if self.is_constant() {
            return 0.0;
        }
        let t = self.normalized(x);
        let span = self.span();
        let m0 = self.d0 * span;
        let m1 = self.d1 * span;
        let d2h = (12.0 * t - 6.0) * self.v0
            + (6.0 * t - 4.0) * m0
            + (-12.0 * t + 6.0) * self.v1
            + (6.0 * t - 2.0) * m1;
        d2h / (span * span)
    }

    /// Integral over `[from, to]`, both inside the segment. Simpson's rule is exact on a cubic.
    #[must_use]
    pub fn integral(&self, from: f64, to: f64) -> f64 {
        if self.is_constant() {
            return self.v0 * (to - from);
        }
        let mid = 0.5 * (from + to);
        (to - from) / 6.0 * (self.value_at(from) + 4.0 * self.value_at(mid) + self.value_at(to))
    }
}

/// Cubic Hermite with tangents already scaled by the interval length.
#[must_use]
pub fn hermite(p0: f64, p3: f64, m0: f64, m1: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    h00 * p0 + h10 * m0 + h01 * p3 + h11 * m1
}

fn secant(a: (f64, f64), b: (f64, f64)) -> Option<f64> {
    let dt = b.0 - a.0;
    (dt > 0.0).then(|| (b.1 - a.1) / dt)
}

/// Recomputes left/right derivatives of every key whose interpolation is derived from its neighbors.
/// `period` wraps the neighbors of the first and last keys.
pub fn refresh_derivatives(keys: &mut [Keyframe], period: Option<f64>) {
    let len = keys.len();
    if len == 0 {
        return;
    }
    let points: Vec<(f64, f64)> = keys.iter().map(|k| (k.time, k.value)).collect();
    for (index, key) in keys.iter_mut().enumerate() {
        let prev = if index > 0 {
            Some(points[index - 1])
        } else {
            period.map(|p| (points[len - 1].0 - p, points[len - 1].1))
        };
        let next = if index + 1 < len {
            Some(points[index + 1])
        } else {
            period.map(|p| (points[0].0 + p, points[0].1))
        };
        let here = points[index];
        let left = prev.and_then(|p| secant(p, here));
        let right = next.and_then(|n| secant(here, n));

        match key.interpolation {
            KeyframeInterpolation::Constant => {
                key.left_derivative = 0.0;
                key.right_derivative = 0.0;
            }
            KeyframeInterpolation::Linear => {
                key.left_derivative = left.or(right).unwrap_or(0.0);
                key.right_derivative = right.or(left).unwrap_or(0.0);
            }
            KeyframeInterpolation::Smooth => {
                let slope = match (prev, next, left, right) {
                    (Some(p), Some(n), Some(s0), Some(s1)) => smooth_slope(p, n, s0, s1),
                    _ => 0.0,
                };
                key.left_derivative = slope;
                key.right_derivative = slope;
            }
            KeyframeInterpolation::HermiteFree | KeyframeInterpolation::HermiteBroken => {}
        }
    }
}

fn smooth_slope(prev: (f64, f64), next: (f64, f64), s0: f64, s1: f64) -> f64 {
    // Local extremum: flat tangent.
    if s0 * s1 <= 0.0 {
        return 0.0;
    }
    let slope = secant(prev, next).unwrap_or(0.0);
    let limit = 3.0 * s0.abs().min(s1.abs());
    slope.clamp(-limit, limit)
}
