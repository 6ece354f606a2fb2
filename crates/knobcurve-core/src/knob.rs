use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Weak},
};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{
    batch::ValueChangeNotice,
    config::CurvesConfig,
    curve::{Curve, Keyframe, KeyframeInterpolation},
    holder::{KnobHolder, KnobSpec},
    value::{KnobKind, KnobValue, ValueChangeReason, ValueChangeStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DimIdx(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ViewIdx(pub usize);

impl ViewIdx {
    pub const MAIN: Self = Self(0);
}

impl fmt::Display for ViewIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimSpec {
    One(DimIdx),
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewSpec {
    One(ViewIdx),
    All,
}

impl From<DimIdx> for DimSpec {
    fn from(dimension: DimIdx) -> Self {
        Self::One(dimension)
    }
}

impl From<ViewIdx> for ViewSpec {
    fn from(view: ViewIdx) -> Self {
        Self::One(view)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KnobError {
    #[error("dimension {dimension} out of range, knob has {count}")]
    DimensionOutOfRange { dimension: usize, count: usize },
    #[error("{0} not found")]
    ViewNotFound(ViewIdx),
    #[error("the main view cannot be removed")]
    MainViewRequired,
    #[error("dimension {dimension} of {view} is not animated")]
    NotAnimated { dimension: usize, view: ViewIdx },
}

/// Value-store capability the undo commands drive. Failures come back as statuses.
pub trait ParamStore: Send + Sync {
    fn id(&self) -> Uuid;
    fn label(&self) -> &str;
    fn kind(&self) -> &KnobKind;
    fn n_dimensions(&self) -> usize;
    fn views(&self) -> Vec<ViewIdx>;
    fn holder(&self) -> Option<Arc<KnobHolder>>;

    /// Value at the holder's current timeline time.
    fn value(&self, dimension: DimIdx, view: ViewIdx) -> Option<KnobValue>;
    fn value_at_time(&self, time: f64, dimension: DimIdx, view: ViewIdx) -> Option<KnobValue>;

    fn set_value(
        &self,
        value: KnobValue,
        view: ViewSpec,
        dimension: DimSpec,
        reason: ValueChangeReason,
    ) -> ValueChangeStatus;

    /// Writes `values[i]` into dimension `start + i`, inside one change batch.
    fn set_value_across_dimensions(
        &self,
        values: &[KnobValue],
        start: DimIdx,
        view: ViewSpec,
        reason: ValueChangeReason,
    ) -> Vec<ValueChangeStatus>;

    fn set_value_at_time(
        &self,
        time: f64,
        value: KnobValue,
        view: ViewSpec,
        dimension: DimSpec,
        reason: ValueChangeReason,
    ) -> ValueChangeStatus;

    fn delete_value_at_time(
        &self,
        time: f64,
        view: ViewSpec,
        dimension: DimSpec,
        reason: ValueChangeReason,
    ) -> ValueChangeStatus;

    fn keyframe_at_time(&self, time: f64, dimension: DimIdx, view: ViewIdx) -> Option<Keyframe>;

    /// Restores a keyframe exactly, interpolation and derivatives included.
    fn set_keyframe(
        &self,
        keyframe: Keyframe,
        view: ViewSpec,
        dimension: DimSpec,
        reason: ValueChangeReason,
    ) -> ValueChangeStatus;

    fn is_animated(&self, dimension: DimIdx, view: ViewIdx) -> bool;
    fn auto_keying_enabled(&self) -> bool;
    fn set_auto_keying_enabled(&self, enabled: bool);

    fn current_time(&self) -> f64 {
        self.holder()
            .map_or(0.0, |holder| holder.timeline_current_time())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct DimViewData {
    value: KnobValue,
    curve: Option<Curve>,
}

impl DimViewData {
    fn animated_curve(&self) -> Option<&Curve> {
        self.curve.as_ref().filter(|curve| curve.is_animated())
    }
}

#[derive(Debug)]
struct KnobState {
    views: BTreeMap<ViewIdx, Vec<DimViewData>>,
    auto_keying: bool,
}

/// Values of every dimension and view at one time, read under a single lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnobSnapshot {
    pub knob: Uuid,
    pub time: f64,
    pub views: BTreeMap<ViewIdx, Vec<KnobValue>>,
}

/// Concrete parameter: per (dimension, view) a static value and an optional curve.
#[derive(Debug)]
pub struct Knob {
    id: Uuid,
    label: String,
    kind: KnobKind,
    dimensions: usize,
    default_interpolation: KeyframeInterpolation,
    holder: Weak<KnobHolder>,
    state: RwLock<KnobState>,
}

impl Knob {
    pub(crate) fn new(spec: KnobSpec, holder: Weak<KnobHolder>, settings: &CurvesConfig) -> Self {
        let dimensions = if spec.dimensions == 0 {
            warn!(label = %spec.label, "knob declared with zero dimensions, using one");
            1
        } else {
            spec.dimensions
        };
        let default_value = spec
            .default_value
            .filter(|value| spec.kind.reject(value).is_none())
            .unwrap_or_else(|| spec.kind.default_value());
        let dims = vec![
            DimViewData {
                value: default_value,
                curve: None,
            };
            dimensions
        ];
        Self {
            id: spec.id.unwrap_or_else(Uuid::new_v4),
            label: spec.label,
            kind: spec.kind,
            dimensions,
            default_interpolation: settings.default_interpolation,
            holder,
            state: RwLock::new(KnobState {
                views: BTreeMap::from([(ViewIdx::MAIN, dims)]),
                auto_keying: settings.auto_keying,
            }),
        }
    }

    fn resolve_view(state: &KnobState, view: ViewIdx) -> ViewIdx {
        if state.views.contains_key(&view) {
            view
        } else {
            ViewIdx::MAIN
        }
    }

    fn targets(
        &self,
        state: &KnobState,
        dimension: DimSpec,
        view: ViewSpec,
    ) -> Option<Vec<(DimIdx, ViewIdx)>> {
        let dims: Vec<DimIdx> = match dimension {
            DimSpec::One(dim) if dim.0 < self.dimensions => vec![dim],
            DimSpec::One(_) => return None,
            DimSpec::All => (0..self.dimensions).map(DimIdx).collect(),
        };
        let views: Vec<ViewIdx> = match view {
            ViewSpec::One(view) => vec![Self::resolve_view(state, view)],
            ViewSpec::All => state.views.keys().copied().collect(),
        };
        Some(
            views
                .iter()
                .flat_map(|view| dims.iter().map(move |dim| (*dim, *view)))
                .collect(),
        )
    }

    /// Runs `write` on every targeted dimension/view under the write lock, then raises notices.
    fn apply<F>(
        &self,
        dimension: DimSpec,
        view: ViewSpec,
        reason: ValueChangeReason,
        mut write: F,
    ) -> ValueChangeStatus
    where
        F: FnMut(&mut DimViewData, bool) -> ValueChangeStatus,
    {
        let holder = self.holder.upgrade();
        let _batch = holder.as_deref().map(KnobHolder::begin_changes);

        let mut notices = Vec::new();
        let status = {
            let mut state = self.state.write();
            let Some(targets) = self.targets(&state, dimension, view) else {
                warn!(knob = %self.label, ?dimension, "dimension out of range");
                return ValueChangeStatus::BadIndex;
            };
            let auto_keying = state.auto_keying;
            let mut status = ValueChangeStatus::NoChange;
            for (dim, view) in targets {
                let Some(data) = state
                    .views
                    .get_mut(&view)
                    .and_then(|dims| dims.get_mut(dim.0))
                else {
                    continue;
                };
                let outcome = write(data, auto_keying);
                if outcome.is_change() {
                    notices.push(ValueChangeNotice {
                        knob: self.id,
                        dimension: dim,
                        view,
                        reason,
                    });
                }
                status = status.combine(outcome);
            }
            status
        };

        if let Some(holder) = &holder {
            for notice in notices {
                holder.notify(notice);
            }
        }
        status
    }

    fn read(&self, data: &DimViewData, time: f64) -> KnobValue {
        match data.animated_curve() {
            Some(curve) => {
                let fallback = data.value.as_curve_value().unwrap_or(0.0);
                self.kind
                    .value_from_curve(curve.evaluate(time, fallback))
                    .unwrap_or_else(|| data.value.clone())
            }
            None => data.value.clone(),
        }
    }

    fn write_keyframe(&self, data: &mut DimViewData, time: f64, value: f64) -> ValueChangeStatus {
        let curve = data.curve.get_or_insert_with(|| Curve::for_kind(&self.kind));
        let keyframe = match curve.keyframe_at_time(time) {
            Some(existing) => Keyframe {
                time,
                value,
                ..existing
            },
            None => Keyframe::new(time, value).with_interpolation(self.default_interpolation),
        };
        curve.set_or_add_keyframe(keyframe)
    }

    fn write_static(data: &mut DimViewData, value: &KnobValue) -> ValueChangeStatus {
        if data.value == *value {
            ValueChangeStatus::NoChange
        } else {
            data.value = value.clone();
            ValueChangeStatus::ValueChanged
        }
    }

    /// Status to report before touching state, if `value` cannot be stored at all.
    fn precheck(&self, value: &KnobValue) -> Option<ValueChangeStatus> {
        if let Some(status) = self.kind.reject(value) {
            warn!(knob = %self.label, value_type = value.type_name(), ?status, "value rejected");
            return Some(status);
        }
        if matches!(value, KnobValue::Double(v) if !v.is_finite()) {
            warn!(knob = %self.label, "ignored non-finite value");
            return Some(ValueChangeStatus::NoChange);
        }
        None
    }

    fn check(&self, dimension: DimIdx, view: ViewIdx) -> Result<(), KnobError> {
        if dimension.0 >= self.dimensions {
            return Err(KnobError::DimensionOutOfRange {
                dimension: dimension.0,
                count: self.dimensions,
            });
        }
        if !self.state.read().views.contains_key(&view) {
            return Err(KnobError::ViewNotFound(view));
        }
        Ok(())
    }

    #[must_use]
    pub fn dimension_count(&self) -> usize {
        self.dimensions
    }

    /// Copy of the curve behind one dimension/view.
    pub fn curve(&self, dimension: DimIdx, view: ViewIdx) -> Result<Curve, KnobError> {
        self.check(dimension, view)?;
        let state = self.state.read();
        state
            .views
            .get(&view)
            .and_then(|dims| dims.get(dimension.0))
            .and_then(DimViewData::animated_curve)
            .cloned()
            .ok_or(KnobError::NotAnimated {
                dimension: dimension.0,
                view,
            })
    }

    #[instrument(skip(self), fields(knob = %self.label))]
    pub fn set_keyframe_interpolation(
        &self,
        time: f64,
        interpolation: KeyframeInterpolation,
        dimension: DimIdx,
        view: ViewIdx,
    ) -> Result<ValueChangeStatus, KnobError> {
        self.check(dimension, view)?;
        if !self.is_animated(dimension, view) {
            return Err(KnobError::NotAnimated {
                dimension: dimension.0,
                view,
            });
        }
        Ok(self.apply(
            DimSpec::One(dimension),
            ViewSpec::One(view),
            ValueChangeReason::UserEdited,
            |data, _| match data.curve.as_mut() {
                Some(curve) => curve.set_keyframe_interpolation(time, interpolation),
                None => ValueChangeStatus::NoChange,
            },
        ))
    }

    /// Splits a new view off the main one. Returns false if it already exists.
    #[instrument(skip(self), fields(knob = %self.label))]
    pub fn add_view(&self, view: ViewIdx) -> bool {
        let mut state = self.state.write();
        if state.views.contains_key(&view) {
            return false;
        }
        let main = state.views.get(&ViewIdx::MAIN).cloned().unwrap_or_default();
        state.views.insert(view, main);
        debug!("view split off main");
        true
    }

    #[instrument(skip(self), fields(knob = %self.label))]
    pub fn remove_view(&self, view: ViewIdx) -> Result<(), KnobError> {
        if view == ViewIdx::MAIN {
            return Err(KnobError::MainViewRequired);
        }
        self.state
            .write()
            .views
            .remove(&view)
            .map(|_| ())
            .ok_or(KnobError::ViewNotFound(view))
    }

    /// Consistent copy of every value at `time`, for a render thread.
    #[must_use]
    pub fn snapshot(&self, time: f64) -> KnobSnapshot {
        let state = self.state.read();
        let views = state
            .views
            .iter()
            .map(|(view, dims)| (*view, dims.iter().map(|d| self.read(d, time)).collect()))
            .collect();
        KnobSnapshot {
            knob: self.id,
            time,
            views,
        }
    }
}

impl ParamStore for Knob {
    fn id(&self) -> Uuid {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> &KnobKind {
        &self.kind
    }

    fn n_dimensions(&self) -> usize {
        self.dimensions
    }

    fn views(&self) -> Vec<ViewIdx> {
        self.state.read().views.keys().copied().collect()
    }

    fn holder(&self) -> Option<Arc<KnobHolder>> {
        self.holder.upgrade()
    }

    fn value(&self, dimension: DimIdx, view: ViewIdx) -> Option<KnobValue> {
        self.value_at_time(self.current_time(), dimension, view)
    }

    fn value_at_time(&self, time: f64, dimension: DimIdx, view: ViewIdx) -> Option<KnobValue> {
        let state = self.state.read();
        let view = Self::resolve_view(&state, view);
        state
            .views
            .get(&view)
            .and_then(|dims| dims.get(dimension.0))
            .map(|data| self.read(data, time))
    }

    #[instrument(skip(self, value), fields(knob = %self.label, value = %value))]
    fn set_value(
        &self,
        value: KnobValue,
        view: ViewSpec,
        dimension: DimSpec,
        reason: ValueChangeReason,
    ) -> ValueChangeStatus {
        if let Some(status) = self.precheck(&value) {
            return status;
        }
        let time = self.current_time();
        let curve_value = value.as_curve_value();
        let status = self.apply(dimension, view, reason, |data, auto_keying| {
            let auto_key = auto_keying
                && reason == ValueChangeReason::UserEdited
                && data.animated_curve().is_some();
            match curve_value {
                Some(curve_value) if auto_key => self.write_keyframe(data, time, curve_value),
                _ => Self::write_static(data, &value),
            }
        });
        debug!(?status, "value set");
        status
    }

    fn set_value_across_dimensions(
        &self,
        values: &[KnobValue],
        start: DimIdx,
        view: ViewSpec,
        reason: ValueChangeReason,
    ) -> Vec<ValueChangeStatus> {
        let holder = self.holder.upgrade();
        let _batch = holder.as_deref().map(KnobHolder::begin_changes);
        values
            .iter()
            .enumerate()
            .map(|(offset, value)| {
                self.set_value(
                    value.clone(),
                    view,
                    DimSpec::One(DimIdx(start.0 + offset)),
                    reason,
                )
            })
            .collect()
    }

    #[instrument(skip(self, value), fields(knob = %self.label, value = %value))]
    fn set_value_at_time(
        &self,
        time: f64,
        value: KnobValue,
        view: ViewSpec,
        dimension: DimSpec,
        reason: ValueChangeReason,
    ) -> ValueChangeStatus {
        if !self.kind.is_animatable() {
            return ValueChangeStatus::NotAnimatable;
        }
        if let Some(status) = self.precheck(&value) {
            return status;
        }
        let Some(curve_value) = value.as_curve_value() else {
            return ValueChangeStatus::NotAnimatable;
        };
        if !time.is_finite() {
            warn!(time, "ignored non-finite keyframe time");
            return ValueChangeStatus::NoChange;
        }
        self.apply(dimension, view, reason, |data, _| {
            self.write_keyframe(data, time, curve_value)
        })
    }

    #[instrument(skip(self), fields(knob = %self.label))]
    fn delete_value_at_time(
        &self,
        time: f64,
        view: ViewSpec,
        dimension: DimSpec,
        reason: ValueChangeReason,
    ) -> ValueChangeStatus {
        self.apply(dimension, view, reason, |data, _| {
            let Some(curve) = data.curve.as_mut() else {
                return ValueChangeStatus::NoChange;
            };
            let Some(removed) = curve.remove_keyframe_at_time(time) else {
                return ValueChangeStatus::NoChange;
            };
            // The last keyframe's value survives as the static value.
            if !curve.is_animated() {
                if let Some(value) = self.kind.value_from_curve(removed.value) {
                    data.value = value;
                }
            }
            ValueChangeStatus::KeyframeRemoved
        })
    }

    fn keyframe_at_time(&self, time: f64, dimension: DimIdx, view: ViewIdx) -> Option<Keyframe> {
        let state = self.state.read();
        let view = Self::resolve_view(&state, view);
        state
            .views
            .get(&view)
            .and_then(|dims| dims.get(dimension.0))
            .and_then(|data| data.curve.as_ref())
            .and_then(|curve| curve.keyframe_at_time(time))
    }

    #[instrument(skip(self), fields(knob = %self.label))]
    fn set_keyframe(
        &self,
        keyframe: Keyframe,
        view: ViewSpec,
        dimension: DimSpec,
        reason: ValueChangeReason,
    ) -> ValueChangeStatus {
        if !self.kind.is_animatable() {
            return ValueChangeStatus::NotAnimatable;
        }
        self.apply(dimension, view, reason, |data, _| {
            data.curve
                .get_or_insert_with(|| Curve::for_kind(&self.kind))
                .set_or_add_keyframe(keyframe)
        })
    }

    fn is_animated(&self, dimension: DimIdx, view: ViewIdx) -> bool {
        let state = self.state.read();
        let view = Self::resolve_view(&state, view);
        state
            .views
            .get(&view)
            .and_then(|dims| dims.get(dimension.0))
            .is_some_and(|data| data.animated_curve().is_some())
    }

    fn auto_keying_enabled(&self) -> bool {
        self.state.read().auto_keying
    }

    fn set_auto_keying_enabled(&self, enabled: bool) {
        self.state.write().auto_keying = enabled;
    }
}
