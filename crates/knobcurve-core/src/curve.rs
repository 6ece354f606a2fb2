use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    interpolation::refresh_derivatives,
    value::{CurveValueKind, KnobKind, ValueChangeStatus},
};

/// Two keyframe times closer than this address the same keyframe.
pub const KEYFRAME_TIME_EPSILON: f64 = 1e-8;

#[derive(Debug, Error, PartialEq)]
pub enum CurveError {
    #[error("curve has no keyframes")]
    EmptyCurve,
    #[error("invalid range [{min}, {max}]")]
    InvalidRange { min: f64, max: f64 },
    #[error("no keyframe at time {0}")]
    KeyframeNotFound(f64),
    #[error("a keyframe already exists at time {0}")]
    TimeOccupied(f64),
    #[error("time {0} lies outside the curve's x range")]
    OutsideRange(f64),
    #[error("viewport needs finite offsets and positive scale and width")]
    InvalidViewport,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyframeInterpolation {
    Constant,
    Linear,
    #[default]
    Smooth,
    HermiteFree,
    HermiteBroken,
}

impl KeyframeInterpolation {
    /// Free and broken keys keep the derivatives they were given.
    #[must_use]
    pub fn has_user_derivatives(self) -> bool {
        matches!(self, Self::HermiteFree | Self::HermiteBroken)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Keyframe {
    pub time: f64,
    pub value: f64,
    #[serde(default)]
    pub interpolation: KeyframeInterpolation,
    #[serde(default)]
    pub left_derivative: f64,
    #[serde(default)]
    pub right_derivative: f64,
}

impl Keyframe {
    #[must_use]
    pub fn new(time: f64, value: f64) -> Self {
        Self {
            time,
            value,
            interpolation: KeyframeInterpolation::default(),
            left_derivative: 0.0,
            right_derivative: 0.0,
        }
    }

    #[must_use]
    pub fn with_interpolation(mut self, interpolation: KeyframeInterpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    #[must_use]
    pub fn with_derivatives(mut self, left: f64, right: f64) -> Self {
        self.left_derivative = left;
        self.right_derivative = right;
        self
    }

    fn same_content(&self, other: &Self) -> bool {
        let same = self.value == other.value && self.interpolation == other.interpolation;
        if self.interpolation.has_user_derivatives() {
            same && self.left_derivative == other.left_derivative
                && self.right_derivative == other.right_derivative
        } else {
            same
        }
    }
}

/// Closed interval; unbounded sides are infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const UNBOUNDED: Self = Self {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    pub fn new(min: f64, max: f64) -> Result<Self, CurveError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(CurveError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    fn as_pair(self) -> Option<(f64, f64)> {
        (self != Self::UNBOUNDED).then_some((self.min, self.max))
    }

    fn from_pair(pair: Option<(f64, f64)>) -> Self {
        pair.and_then(|(min, max)| Self::new(min, max).ok())
            .unwrap_or(Self::UNBOUNDED)
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

/// Ordered, time-unique keyframe set plus the flags that shape its evaluation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "CurveData", into = "CurveData")]
pub struct Curve {
    keyframes: Vec<Keyframe>,
    periodic: bool,
    x_range: Range,
    y_range: Range,
    display_y_range: Range,
    value_kind: CurveValueKind,
    integer_times: bool,
    constant_only: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct CurveData {
    keyframes: Vec<Keyframe>,
    periodic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    x_range: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    y_range: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_y_range: Option<(f64, f64)>,
    value_kind: CurveValueKind,
    integer_times: bool,
    constant_only: bool,
}

impl From<CurveData> for Curve {
    fn from(data: CurveData) -> Self {
        let mut curve = Self {
            keyframes: Vec::new(),
            periodic: data.periodic,
            x_range: Range::from_pair(data.x_range),
            y_range: Range::from_pair(data.y_range),
            display_y_range: Range::from_pair(data.display_y_range),
            value_kind: data.value_kind,
            integer_times: data.integer_times,
            constant_only: data.constant_only,
        };
        curve.set_keyframes(data.keyframes);
        curve
    }
}

impl From<Curve> for CurveData {
    fn from(curve: Curve) -> Self {
        Self {
            keyframes: curve.keyframes,
            periodic: curve.periodic,
            x_range: curve.x_range.as_pair(),
            y_range: curve.y_range.as_pair(),
            display_y_range: curve.display_y_range.as_pair(),
            value_kind: curve.value_kind,
            integer_times: curve.integer_times,
            constant_only: curve.constant_only,
        }
    }
}

impl Curve {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Curve configured for the value kind of a knob dimension.
    #[must_use]
    pub fn for_kind(kind: &KnobKind) -> Self {
        Self {
            value_kind: kind.curve_value_kind(),
            constant_only: kind.is_constant_interpolation_only(),
            ..Self::default()
        }
    }

    /// Periodic over `[x_min, x_max]`.
    pub fn periodic(x_min: f64, x_max: f64) -> Result<Self, CurveError> {
        let mut curve = Self::default();
        curve.set_periodic(x_min, x_max)?;
        Ok(curve)
    }

    pub fn set_periodic(&mut self, x_min: f64, x_max: f64) -> Result<(), CurveError> {
        let range = Range::new(x_min, x_max)?;
        if !range.is_bounded() || x_max <= x_min {
            return Err(CurveError::InvalidRange {
                min: x_min,
                max: x_max,
            });
        }
        self.periodic = true;
        self.x_range = range;
        let keys = std::mem::take(&mut self.keyframes);
        self.set_keyframes(keys);
        Ok(())
    }

    /// Keyframes outside the new range are dropped.
    pub fn set_x_range(&mut self, min: f64, max: f64) -> Result<(), CurveError> {
        self.x_range = Range::new(min, max)?;
        let keys = std::mem::take(&mut self.keyframes);
        self.set_keyframes(keys);
        Ok(())
    }

    pub fn set_y_range(&mut self, min: f64, max: f64) -> Result<(), CurveError> {
        self.y_range = Range::new(min, max)?;
        Ok(())
    }

    pub fn set_display_y_range(&mut self, min: f64, max: f64) -> Result<(), CurveError> {
        self.display_y_range = Range::new(min, max)?;
        Ok(())
    }

    #[must_use]
    pub fn with_value_kind(mut self, value_kind: CurveValueKind) -> Self {
        self.value_kind = value_kind;
        let keys = std::mem::take(&mut self.keyframes);
        self.set_keyframes(keys);
        self
    }

    #[must_use]
    pub fn with_integer_keyframe_times(mut self, clamped: bool) -> Self {
        self.integer_times = clamped;
        let keys = std::mem::take(&mut self.keyframes);
        self.set_keyframes(keys);
        self
    }

    #[must_use]
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    #[must_use]
    pub fn keyframe_count(&self) -> usize {
        self.keyframes.len()
    }

    #[must_use]
    pub fn is_animated(&self) -> bool {
        !self.keyframes.is_empty()
    }

    #[must_use]
    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    #[must_use]
    pub fn x_range(&self) -> Range {
        self.x_range
    }

    #[must_use]
    pub fn y_range(&self) -> Range {
        self.y_range
    }

    /// Falls back to the value range when no display range was set.
    #[must_use]
    pub fn display_y_range(&self) -> Range {
        if self.display_y_range == Range::UNBOUNDED {
            self.y_range
        } else {
            self.display_y_range
        }
    }

    #[must_use]
    pub fn value_kind(&self) -> CurveValueKind {
        self.value_kind
    }

    #[must_use]
    pub fn are_keyframe_times_integer_clamped(&self) -> bool {
        self.integer_times
    }

    #[must_use]
    pub fn are_values_clamped_to_integers(&self) -> bool {
        self.value_kind == CurveValueKind::Integer
    }

    #[must_use]
    pub fn are_values_clamped_to_booleans(&self) -> bool {
        self.value_kind == CurveValueKind::Boolean
    }

    #[must_use]
    pub fn is_constant_interpolation_only(&self) -> bool {
        self.constant_only
    }

    /// `(x_min, period)` when the curve wraps.
    #[must_use]
    pub fn period(&self) -> Option<(f64, f64)> {
        (self.periodic && self.x_range.is_bounded() && self.x_range.max > self.x_range.min)
            .then(|| (self.x_range.min, self.x_range.max - self.x_range.min))
    }

    /// Times of the first and last keyframes.
    pub fn keyframe_span(&self) -> Result<(f64, f64), CurveError> {
        match (self.keyframes.first(), self.keyframes.last()) {
            (Some(first), Some(last)) => Ok((first.time, last.time)),
            _ => Err(CurveError::EmptyCurve),
        }
    }

    fn accepts_time(&self, time: f64) -> bool {
        time >= self.x_range.min && time <= self.x_range.max
    }

    fn normalize_time(&self, time: f64) -> f64 {
        if self.integer_times { time.round() } else { time }
    }

    fn normalize(&self, mut keyframe: Keyframe) -> Keyframe {
        keyframe.time = self.normalize_time(keyframe.time);
        keyframe.value = self.value_kind.quantize(keyframe.value);
        if self.constant_only {
            keyframe.interpolation = KeyframeInterpolation::Constant;
        }
        keyframe
    }

    fn refresh(&mut self) {
        let period = self.period().map(|(_, period)| period);
        refresh_derivatives(&mut self.keyframes, period);
    }

    #[must_use]
    pub fn keyframe_index(&self, time: f64) -> Option<usize> {
        let time = self.normalize_time(time);
        let index = self
            .keyframes
            .partition_point(|k| k.time < time - KEYFRAME_TIME_EPSILON);
        self.keyframes
            .get(index)
            .filter(|k| (k.time - time).abs() <= KEYFRAME_TIME_EPSILON)
            .map(|_| index)
    }

    #[must_use]
    pub fn keyframe_at_time(&self, time: f64) -> Option<Keyframe> {
        self.keyframe_index(time).map(|index| self.keyframes[index])
    }

    #[must_use]
    pub fn keyframe_at_index(&self, index: usize) -> Option<Keyframe> {
        self.keyframes.get(index).copied()
    }

    /// Inserts a keyframe, or rewrites the one already at that time.
    pub fn set_or_add_keyframe(&mut self, keyframe: Keyframe) -> ValueChangeStatus {
        if !keyframe.time.is_finite() || !keyframe.value.is_finite() {
            warn!(time = keyframe.time, value = keyframe.value, "ignoring non-finite keyframe");
            return ValueChangeStatus::NoChange;
        }
        let mut keyframe = self.normalize(keyframe);
        if !self.accepts_time(keyframe.time) {
            warn!(time = keyframe.time, "ignoring keyframe outside the x range");
            return ValueChangeStatus::NoChange;
        }

        if let Some(index) = self.keyframe_index(keyframe.time) {
            let existing = self.keyframes[index];
            keyframe.time = existing.time;
            if existing.same_content(&keyframe) {
                return ValueChangeStatus::NoChange;
            }
            self.keyframes[index] = keyframe;
            self.refresh();
            debug!(time = keyframe.time, value = keyframe.value, "keyframe modified");
            return ValueChangeStatus::KeyframeModified;
        }

        let index = self.keyframes.partition_point(|k| k.time < keyframe.time);
        self.keyframes.insert(index, keyframe);
        self.refresh();
        debug!(time = keyframe.time, value = keyframe.value, "keyframe added");
        ValueChangeStatus::KeyframeAdded
    }

    pub fn remove_keyframe_at_time(&mut self, time: f64) -> Option<Keyframe> {
        let index = self.keyframe_index(time)?;
        self.remove_keyframe_at_index(index)
    }

    pub fn remove_keyframe_at_index(&mut self, index: usize) -> Option<Keyframe> {
        if index >= self.keyframes.len() {
            return None;
        }
        let removed = self.keyframes.remove(index);
        self.refresh();
        debug!(time = removed.time, "keyframe removed");
        Some(removed)
    }

    /// Removes keyframes strictly before `time`.
    pub fn remove_keyframes_before(&mut self, time: f64) -> usize {
        let cut = self
            .keyframes
            .partition_point(|k| k.time < time - KEYFRAME_TIME_EPSILON);
        self.keyframes.drain(..cut);
        if cut > 0 {
            self.refresh();
        }
        cut
    }

    /// Removes keyframes strictly after `time`.
    pub fn remove_keyframes_after(&mut self, time: f64) -> usize {
        let keep = self
            .keyframes
            .partition_point(|k| k.time <= time + KEYFRAME_TIME_EPSILON);
        let removed = self.keyframes.len() - keep;
        self.keyframes.truncate(keep);
        if removed > 0 {
            self.refresh();
        }
        removed
    }

    #[must_use]
    pub fn nearest_keyframe(&self, time: f64) -> Option<Keyframe> {
        let upper = self.keyframes.partition_point(|k| k.time < time);
        let after = self.keyframes.get(upper);
        let before = upper.checked_sub(1).and_then(|i| self.keyframes.get(i));
        match (before, after) {
            (Some(b), Some(a)) => Some(if time - b.time <= a.time - time { *b } else { *a }),
            (Some(only), None) | (None, Some(only)) => Some(*only),
            (None, None) => None,
        }
    }

    #[must_use]
    pub fn previous_keyframe(&self, time: f64) -> Option<Keyframe> {
        let index = self
            .keyframes
            .partition_point(|k| k.time < time - KEYFRAME_TIME_EPSILON);
        index.checked_sub(1).map(|i| self.keyframes[i])
    }

    #[must_use]
    pub fn next_keyframe(&self, time: f64) -> Option<Keyframe> {
        let index = self
            .keyframes
            .partition_point(|k| k.time <= time + KEYFRAME_TIME_EPSILON);
        self.keyframes.get(index).copied()
    }

    /// Number of keyframes with `first <= time <= last`.
    #[must_use]
    pub fn keyframes_in_range(&self, first: f64, last: f64) -> usize {
        self.keyframes
            .iter()
            .filter(|k| k.time >= first && k.time <= last)
            .count()
    }

    pub fn set_keyframe_interpolation(
        &mut self,
        time: f64,
        interpolation: KeyframeInterpolation,
    ) -> ValueChangeStatus {
        let Some(index) = self.keyframe_index(time) else {
            return ValueChangeStatus::NoChange;
        };
        if self.constant_only || self.keyframes[index].interpolation == interpolation {
            return ValueChangeStatus::NoChange;
        }
        self.keyframes[index].interpolation = interpolation;
        self.refresh();
        ValueChangeStatus::KeyframeModified
    }

    /// Applies one interpolation to every keyframe; returns how many changed.
    pub fn set_curve_interpolation(&mut self, interpolation: KeyframeInterpolation) -> usize {
        if self.constant_only {
            return 0;
        }
        let mut changed = 0;
        for keyframe in &mut self.keyframes {
            if keyframe.interpolation != interpolation {
                keyframe.interpolation = interpolation;
                changed += 1;
            }
        }
        if changed > 0 {
            self.refresh();
        }
        changed
    }

    /// Pins user derivatives on a keyframe, which makes it free (equal sides) or broken.
    pub fn set_keyframe_derivatives(
        &mut self,
        time: f64,
        left: f64,
        right: f64,
    ) -> ValueChangeStatus {
        let Some(index) = self.keyframe_index(time) else {
            return ValueChangeStatus::NoChange;
        };
        if self.constant_only || !left.is_finite() || !right.is_finite() {
            return ValueChangeStatus::NoChange;
        }
        let interpolation = if left == right {
            KeyframeInterpolation::HermiteFree
        } else {
            KeyframeInterpolation::HermiteBroken
        };
        let updated = self.keyframes[index]
            .with_interpolation(interpolation)
            .with_derivatives(left, right);
        if updated.same_content(&self.keyframes[index]) {
            return ValueChangeStatus::NoChange;
        }
        self.keyframes[index] = updated;
        self.refresh();
        ValueChangeStatus::KeyframeModified
    }

    /// Moves the keyframe at `from` to `to`, keeping its value and interpolation.
    pub fn move_keyframe(&mut self, from: f64, to: f64) -> Result<Keyframe, CurveError> {
        let index = self
            .keyframe_index(from)
            .ok_or(CurveError::KeyframeNotFound(from))?;
        let to = self.normalize_time(to);
        if !self.accepts_time(to) {
            return Err(CurveError::OutsideRange(to));
        }
        if self.keyframe_index(to).is_some_and(|other| other != index) {
            return Err(CurveError::TimeOccupied(to));
        }
        let mut keyframe = self.keyframes.remove(index);
        keyframe.time = to;
        let insert_at = self.keyframes.partition_point(|k| k.time < to);
        self.keyframes.insert(insert_at, keyframe);
        self.refresh();
        Ok(keyframe)
    }

    pub fn clear(&mut self) {
        self.keyframes.clear();
    }

    /// Replaces every keyframe. Later entries win when two land on the same time.
    pub fn set_keyframes(&mut self, keyframes: Vec<Keyframe>) {
        let mut normalized: Vec<Keyframe> = keyframes
            .into_iter()
            .filter(|k| k.time.is_finite() && k.value.is_finite())
            .map(|k| self.normalize(k))
            .filter(|k| self.accepts_time(k.time))
            .collect();
        normalized.sort_by(|a, b| a.time.total_cmp(&b.time));

        let mut deduped: Vec<Keyframe> = Vec::with_capacity(normalized.len());
        for keyframe in normalized {
            match deduped.last_mut() {
                Some(last) if (keyframe.time - last.time).abs() <= KEYFRAME_TIME_EPSILON => {
                    let time = last.time;
                    *last = Keyframe { time, ..keyframe };
                }
                _ => deduped.push(keyframe),
            }
        }
        self.keyframes = deduped;
        self.refresh();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyframes_stay_sorted_and_unique() {
        let mut curve = Curve::new();
        assert_eq!(
            curve.set_or_add_keyframe(Keyframe::new(10.0, 1.0)),
            ValueChangeStatus::KeyframeAdded
        );
        assert_eq!(
            curve.set_or_add_keyframe(Keyframe::new(0.0, 2.0)),
            ValueChangeStatus::KeyframeAdded
        );
        assert_eq!(
            curve.set_or_add_keyframe(Keyframe::new(10.0 + 1e-10, 3.0)),
            ValueChangeStatus::KeyframeModified
        );
        let times: Vec<f64> = curve.keyframes().iter().map(|k| k.time).collect();
        assert_eq!(times, vec![0.0, 10.0]);
        assert_eq!(curve.keyframe_at_time(10.0).map(|k| k.value), Some(3.0));
    }

    #[test]
    fn rewriting_identical_keyframe_is_no_change() {
        let mut curve = Curve::new();
        curve.set_or_add_keyframe(Keyframe::new(1.0, 4.0));
        assert_eq!(
            curve.set_or_add_keyframe(Keyframe::new(1.0, 4.0)),
            ValueChangeStatus::NoChange
        );
    }

    #[test]
    fn non_finite_keyframes_are_ignored() {
        let mut curve = Curve::new();
        assert_eq!(
            curve.set_or_add_keyframe(Keyframe::new(f64::NAN, 1.0)),
            ValueChangeStatus::NoChange
        );
        assert_eq!(
            curve.set_or_add_keyframe(Keyframe::new(1.0, f64::INFINITY)),
            ValueChangeStatus::NoChange
        );
        assert!(!curve.is_animated());
    }

    #[test]
    fn integer_clamped_curve_rounds_times() {
        let mut curve = Curve::new().with_integer_keyframe_times(true);
        curve.set_or_add_keyframe(Keyframe::new(4.4, 1.0));
        assert_eq!(curve.keyframes()[0].time, 4.0);
        assert!(curve.remove_keyframe_at_time(3.6).is_some());
    }

    #[test]
    fn choice_curves_force_constant_keys() {
        let kind = KnobKind::Choice {
            options: vec!["a".into(), "b".into(), "c".into()],
        };
        let mut curve = Curve::for_kind(&kind);
        curve.set_or_add_keyframe(Keyframe::new(0.0, 1.4));
        let key = curve.keyframes()[0];
        assert_eq!(key.interpolation, KeyframeInterpolation::Constant);
        assert_eq!(key.value, 1.0);
        assert_eq!(
            curve.set_keyframe_interpolation(0.0, KeyframeInterpolation::Linear),
            ValueChangeStatus::NoChange
        );
    }

    #[test]
    fn move_keyframe_refuses_occupied_time() {
        let mut curve = Curve::new();
        curve.set_or_add_keyframe(Keyframe::new(0.0, 0.0));
        curve.set_or_add_keyframe(Keyframe::new(5.0, 1.0));
        assert_eq!(
            curve.move_keyframe(0.0, 5.0),
            Err(CurveError::TimeOccupied(5.0))
        );
        assert_eq!(
            curve.move_keyframe(2.0, 3.0),
            Err(CurveError::KeyframeNotFound(2.0))
        );
        let moved = curve.move_keyframe(0.0, 8.0).expect("move");
        assert_eq!(moved.time, 8.0);
        assert_eq!(curve.keyframes()[1].time, 8.0);
    }

    #[test]
    fn derivatives_switch_between_free_and_broken() {
        let mut curve = Curve::new();
        curve.set_or_add_keyframe(Keyframe::new(0.0, 0.0));
        curve.set_keyframe_derivatives(0.0, 1.0, 1.0);
        assert_eq!(
            curve.keyframes()[0].interpolation,
            KeyframeInterpolation::HermiteFree
        );
        curve.set_keyframe_derivatives(0.0, 1.0, -2.0);
        let key = curve.keyframes()[0];
        assert_eq!(key.interpolation, KeyframeInterpolation::HermiteBroken);
        assert_eq!((key.left_derivative, key.right_derivative), (1.0, -2.0));
    }

    #[test]
    fn neighbor_queries() {
        let mut curve = Curve::new();
        for t in [0.0, 10.0, 20.0] {
            curve.set_or_add_keyframe(Keyframe::new(t, t));
        }
        assert_eq!(curve.previous_keyframe(10.0).map(|k| k.time), Some(0.0));
        assert_eq!(curve.next_keyframe(10.0).map(|k| k.time), Some(20.0));
        assert_eq!(curve.nearest_keyframe(14.0).map(|k| k.time), Some(10.0));
        assert_eq!(curve.keyframes_in_range(0.0, 10.0), 2);
        assert_eq!(curve.remove_keyframes_after(10.0), 1);
        assert_eq!(curve.remove_keyframes_before(10.0), 1);
        assert_eq!(curve.keyframe_count(), 1);
    }

    #[test]
    fn serde_normalizes_unsorted_input() {
        let json = r#"{"keyframes":[{"time":5.0,"value":1.0},{"time":1.0,"value":0.0}]}"#;
        let curve: Curve = serde_json::from_str(json).expect("parse curve");
        assert_eq!(curve.keyframes()[0].time, 1.0);
        assert_eq!(curve.y_range(), Range::UNBOUNDED);
        let round = serde_json::to_string(&curve).expect("serialize curve");
        assert!(!round.contains("y_range"));
    }

    #[test]
    fn keyframes_outside_x_range_are_refused() {
        let mut curve = Curve::periodic(0.0, 10.0).expect("periodic curve");
        assert_eq!(
            curve.set_or_add_keyframe(Keyframe::new(12.0, 1.0)),
            ValueChangeStatus::NoChange
        );
        curve.set_or_add_keyframe(Keyframe::new(2.0, 1.0));
        assert_eq!(
            curve.move_keyframe(2.0, -1.0),
            Err(CurveError::OutsideRange(-1.0))
        );
    }

    #[test]
    fn periodic_requires_bounded_increasing_range() {
        assert!(Curve::periodic(0.0, 10.0).is_ok());
        assert!(Curve::periodic(5.0, 5.0).is_err());
        assert!(Curve::periodic(0.0, f64::INFINITY).is_err());
    }
}
