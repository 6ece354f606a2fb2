use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum KnobValue {
    Int(i64),
    Double(f64),
    Bool(bool),
    String(String),
    Choice(usize),
}

impl KnobValue {
    /// Numeric form stored on animation curves. Strings have none.
    #[must_use]
    pub fn as_curve_value(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Double(value) => Some(*value),
            Self::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
            Self::Choice(index) => Some(*index as f64),
            Self::String(_) => None,
        }
    }

    #[must_use]
    pub fn kind_matches(&self, kind: &KnobKind) -> bool {
        matches!(
            (self, kind),
            (Self::Int(_), KnobKind::Int)
                | (Self::Double(_), KnobKind::Double)
                | (Self::Bool(_), KnobKind::Bool)
                | (Self::String(_), KnobKind::String)
                | (Self::Choice(_), KnobKind::Choice { .. })
        )
    }

    #[must_use]
    pub fn same_variant(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::Choice(_) => "choice",
        }
    }
}

impl fmt::Display for KnobValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Choice(index) => write!(f, "#{index}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KnobKind {
    Int,
    Double,
    Bool,
    String,
    Choice { options: Vec<String> },
}

impl KnobKind {
    #[must_use]
    pub fn default_value(&self) -> KnobValue {
        match self {
            Self::Int => KnobValue::Int(0),
            Self::Double => KnobValue::Double(0.0),
            Self::Bool => KnobValue::Bool(false),
            Self::String => KnobValue::String(String::new()),
            Self::Choice { .. } => KnobValue::Choice(0),
        }
    }

    #[must_use]
    pub fn is_animatable(&self) -> bool {
        !matches!(self, Self::String)
    }

    #[must_use]
    pub fn curve_value_kind(&self) -> CurveValueKind {
        match self {
            Self::Double | Self::String => CurveValueKind::Real,
            Self::Int | Self::Choice { .. } => CurveValueKind::Integer,
            Self::Bool => CurveValueKind::Boolean,
        }
    }

    /// Discrete kinds can only hold their value between keyframes.
    #[must_use]
    pub fn is_constant_interpolation_only(&self) -> bool {
        matches!(self, Self::Bool | Self::Choice { .. })
    }

    /// Maps a curve sample back into this kind.
    #[must_use]
    pub fn value_from_curve(&self, value: f64) -> Option<KnobValue> {
        if !value.is_finite() {
            return None;
        }
        match self {
            Self::Int => Some(KnobValue::Int((value + 0.5).floor() as i64)),
            Self::Double => Some(KnobValue::Double(value)),
            Self::Bool => Some(KnobValue::Bool(value >= 0.5)),
            Self::Choice { options } => {
                let index = (value + 0.5).floor().max(0.0) as usize;
                Some(KnobValue::Choice(index.min(options.len().saturating_sub(1))))
            }
            Self::String => None,
        }
    }

    /// Returns the status a store reports when `value` cannot be held by this kind.
    #[must_use]
    pub fn reject(&self, value: &KnobValue) -> Option<ValueChangeStatus> {
        if !value.kind_matches(self) {
            return Some(ValueChangeStatus::TypeMismatch);
        }
        match (self, value) {
            (Self::Choice { options }, KnobValue::Choice(index)) => {
                (*index >= options.len()).then_some(ValueChangeStatus::BadIndex)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CurveValueKind {
    #[default]
    Real,
    Integer,
    Boolean,
}

impl CurveValueKind {
    #[must_use]
    pub fn quantize(self, value: f64) -> f64 {
        match self {
            Self::Real => value,
            Self::Integer => (value + 0.5).floor(),
            Self::Boolean => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Outcome of a value-store write. Failures are reported here rather than raised.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValueChangeStatus {
    NoChange,
    ValueChanged,
    KeyframeAdded,
    KeyframeModified,
    KeyframeRemoved,
    BadIndex,
    TypeMismatch,
    NotAnimatable,
}

impl ValueChangeStatus {
    #[must_use]
    pub fn is_change(self) -> bool {
        matches!(
            self,
            Self::ValueChanged
                | Self::KeyframeAdded
                | Self::KeyframeModified
                | Self::KeyframeRemoved
        )
    }

    #[must_use]
    pub fn is_rejection(self) -> bool {
        matches!(self, Self::BadIndex | Self::TypeMismatch | Self::NotAnimatable)
    }

    #[must_use]
    pub fn touched_keyframe(self) -> bool {
        matches!(self, Self::KeyframeAdded | Self::KeyframeModified)
    }

    /// Folds the statuses of several dimension/view writes into one.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        if self.is_rejection() {
            return self;
        }
        if other.is_rejection() {
            return other;
        }
        if self.rank() >= other.rank() { self } else { other }
    }

    fn rank(self) -> u8 {
        match self {
            Self::NoChange | Self::BadIndex | Self::TypeMismatch | Self::NotAnimatable => 0,
            Self::ValueChanged => 1,
            Self::KeyframeRemoved => 2,
            Self::KeyframeModified => 3,
            Self::KeyframeAdded => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ValueChangeReason {
    UserEdited,
    PluginEdited,
    TimeChanged,
    RestoreDefault,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_rejects_out_of_range_index() {
        let kind = KnobKind::Choice {
            options: vec!["over".to_string(), "under".to_string()],
        };
        assert_eq!(kind.reject(&KnobValue::Choice(1)), None);
        assert_eq!(
            kind.reject(&KnobValue::Choice(2)),
            Some(ValueChangeStatus::BadIndex)
        );
        assert_eq!(
            kind.reject(&KnobValue::Double(1.0)),
            Some(ValueChangeStatus::TypeMismatch)
        );
    }

    #[test]
    fn curve_samples_map_back_to_discrete_kinds() {
        assert_eq!(KnobKind::Int.value_from_curve(2.5), Some(KnobValue::Int(3)));
        assert_eq!(
            KnobKind::Bool.value_from_curve(0.49),
            Some(KnobValue::Bool(false))
        );
        assert_eq!(KnobKind::String.value_from_curve(1.0), None);
        let kind = KnobKind::Choice {
            options: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(kind.value_from_curve(7.0), Some(KnobValue::Choice(1)));
    }

    #[test]
    fn combine_prefers_keyframe_side_effects() {
        use ValueChangeStatus::{KeyframeAdded, NoChange, TypeMismatch, ValueChanged};
        assert_eq!(NoChange.combine(ValueChanged), ValueChanged);
        assert_eq!(ValueChanged.combine(KeyframeAdded), KeyframeAdded);
        assert_eq!(KeyframeAdded.combine(TypeMismatch), TypeMismatch);
    }
}
