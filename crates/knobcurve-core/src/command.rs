use std::{
    any::Any,
    sync::{Arc, Weak},
};

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    holder::KnobHolder,
    knob::{DimIdx, DimSpec, ParamStore, ViewIdx, ViewSpec},
    value::{KnobValue, ValueChangeReason, ValueChangeStatus},
};

/// Entry of an undo stack.
pub trait UndoCommand {
    fn text(&self) -> String;
    fn undo(&mut self);
    fn redo(&mut self);

    /// Absorbs `other`, which was just applied on top of this command. Returns false to keep both.
    fn merge_with(&mut self, _other: &dyn UndoCommand) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
}

/// One dimension/view a redo actually wrote, with what the store answered.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Slot {
    dimension: DimIdx,
    view: ViewIdx,
    value_index: usize,
    status: ValueChangeStatus,
}

/// Before/after values of one knob edit, over a single dimension or all of them.
pub struct ValueChangeCommand {
    param: Weak<dyn ParamStore>,
    param_id: Uuid,
    label: String,
    dimension: DimSpec,
    view: ViewSpec,
    reason: ValueChangeReason,
    old_values: Vec<KnobValue>,
    new_values: Vec<KnobValue>,
    slots: Vec<Slot>,
    mergeable: bool,
    transaction_time: Option<f64>,
}

impl ValueChangeCommand {
    pub fn single<P: ParamStore + 'static>(
        param: &Arc<P>,
        dimension: DimIdx,
        view: ViewSpec,
        old_value: KnobValue,
        new_value: KnobValue,
        reason: ValueChangeReason,
    ) -> Self {
        let weak: Weak<P> = Arc::downgrade(param);
        let weak: Weak<dyn ParamStore> = weak;
        Self {
            param: weak,
            param_id: param.id(),
            label: param.label().to_string(),
            dimension: DimSpec::One(dimension),
            view,
            reason,
            old_values: vec![old_value],
            new_values: vec![new_value],
            slots: Vec::new(),
            mergeable: true,
            transaction_time: None,
        }
    }

    /// # Panics
    /// When `old_values` and `new_values` are not both sized to the knob's dimension count.
    pub fn all_dimensions<P: ParamStore + 'static>(
        param: &Arc<P>,
        view: ViewIdx,
        old_values: Vec<KnobValue>,
        new_values: Vec<KnobValue>,
        reason: ValueChangeReason,
    ) -> Self {
        assert_eq!(
            old_values.len(),
            new_values.len(),
            "old and new value counts differ"
        );
        assert_eq!(
            old_values.len(),
            param.n_dimensions(),
            "value count does not match the knob's dimensions"
        );
        let weak: Weak<P> = Arc::downgrade(param);
        let weak: Weak<dyn ParamStore> = weak;
        Self {
            param: weak,
            param_id: param.id(),
            label: param.label().to_string(),
            dimension: DimSpec::All,
            view: ViewSpec::One(view),
            reason,
            old_values,
            new_values,
            slots: Vec::new(),
            mergeable: true,
            transaction_time: None,
        }
    }

    #[must_use]
    pub fn param_id(&self) -> Uuid {
        self.param_id
    }

    #[must_use]
    pub fn old_values(&self) -> &[KnobValue] {
        &self.old_values
    }

    #[must_use]
    pub fn new_values(&self) -> &[KnobValue] {
        &self.new_values
    }

    /// Per dimension/view statuses of the latest redo.
    #[must_use]
    pub fn statuses(&self) -> Vec<ValueChangeStatus> {
        self.slots.iter().map(|slot| slot.status).collect()
    }

    #[must_use]
    pub fn is_mergeable(&self) -> bool {
        self.mergeable
    }

    /// Timeline time captured by the first redo.
    #[must_use]
    pub fn transaction_time(&self) -> Option<f64> {
        self.transaction_time
    }

    fn views(&self, param: &dyn ParamStore) -> Vec<ViewIdx> {
        match self.view {
            ViewSpec::One(view) => vec![view],
            ViewSpec::All => param.views(),
        }
    }

    fn first_redo(&mut self, param: &dyn ParamStore) {
        let mut slots = Vec::new();
        for view in self.views(param) {
            match self.dimension {
                DimSpec::All if self.new_values.len() > 1 => {
                    let statuses = param.set_value_across_dimensions(
                        &self.new_values,
                        DimIdx(0),
                        ViewSpec::One(view),
                        self.reason,
                    );
                    slots.extend(statuses.into_iter().enumerate().map(|(index, status)| Slot {
                        dimension: DimIdx(index),
                        view,
                        value_index: index,
                        status,
                    }));
                }
                spec => {
                    let dimension = match spec {
                        DimSpec::One(dimension) => dimension,
                        DimSpec::All => DimIdx(0),
                    };
                    let status = param.set_value(
                        self.new_values[0].clone(),
                        ViewSpec::One(view),
                        DimSpec::One(dimension),
                        self.reason,
                    );
                    slots.push(Slot {
                        dimension,
                        view,
                        value_index: 0,
                        status,
                    });
                }
            }
        }
        self.slots = slots;
    }

    /// Replays the recorded slots; keyed slots go back to the transaction time, not the current one.
    fn replay(&mut self, param: &dyn ParamStore, time: f64) {
        for slot in &mut self.slots {
            let value = self.new_values[slot.value_index].clone();
            let view = ViewSpec::One(slot.view);
            let dimension = DimSpec::One(slot.dimension);
            slot.status = if slot.status.touched_keyframe() {
                param.set_value_at_time(time, value, view, dimension, self.reason)
            } else {
                param.set_value(value, view, dimension, self.reason)
            };
        }
    }
}

impl UndoCommand for ValueChangeCommand {
    fn text(&self) -> String {
        format!("Set {}", self.label)
    }

    #[instrument(skip(self), fields(knob = %self.label))]
    fn redo(&mut self) {
        let Some(param) = self.param.upgrade() else {
            debug!("knob gone, redo skipped");
            return;
        };
        let holder = param.holder();
        let _batch = holder.as_deref().map(KnobHolder::begin_changes);

        match self.transaction_time {
            None => {
                self.transaction_time = Some(param.current_time());
                self.first_redo(param.as_ref());
            }
            Some(time) => self.replay(param.as_ref(), time),
        }
        if self
            .slots
            .iter()
            .any(|slot| slot.status == ValueChangeStatus::KeyframeAdded)
        {
            self.mergeable = false;
        }
        info!(statuses = ?self.statuses(), "value change applied");
    }

    #[instrument(skip(self), fields(knob = %self.label))]
    fn undo(&mut self) {
        let Some(param) = self.param.upgrade() else {
            debug!("knob gone, undo skipped");
            return;
        };
        let Some(time) = self.transaction_time else {
            return;
        };
        let holder = param.holder();
        let _batch = holder.as_deref().map(KnobHolder::begin_changes);

        for slot in &self.slots {
            if slot.status == ValueChangeStatus::KeyframeAdded {
                param.delete_value_at_time(
                    time,
                    ViewSpec::One(slot.view),
                    DimSpec::One(slot.dimension),
                    ValueChangeReason::UserEdited,
                );
            }
        }

        let auto_keying = param.auto_keying_enabled();
        param.set_auto_keying_enabled(false);
        for slot in &self.slots {
            let old = self.old_values[slot.value_index].clone();
            let view = ViewSpec::One(slot.view);
            let dimension = DimSpec::One(slot.dimension);
            // A still-animated slot keeps its hidden static value unless redo wrote it.
            if slot.status == ValueChangeStatus::ValueChanged
                || !param.is_animated(slot.dimension, slot.view)
            {
                param.set_value(old.clone(), view, dimension, self.reason);
            }
            if slot.status == ValueChangeStatus::KeyframeModified {
                param.set_value_at_time(time, old, view, dimension, self.reason);
            }
        }
        param.set_auto_keying_enabled(auto_keying);
        info!("value change undone");
    }

    fn merge_with(&mut self, other: &dyn UndoCommand) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        if !self.mergeable || !other.mergeable {
            return false;
        }
        if self.param_id != other.param_id || self.param.strong_count() == 0 {
            return false;
        }
        if self.dimension != other.dimension || self.view != other.view {
            return false;
        }
        let same_types = self.new_values.len() == other.new_values.len()
            && self
                .new_values
                .iter()
                .zip(&other.new_values)
                .all(|(ours, theirs)| ours.same_variant(theirs));
        if !same_types {
            return false;
        }
        // Undo restores keys at one time only.
        let keyed = self
            .slots
            .iter()
            .chain(&other.slots)
            .any(|slot| slot.status.touched_keyframe());
        if keyed && self.transaction_time != other.transaction_time {
            return false;
        }

        self.new_values.clone_from(&other.new_values);
        if self.slots.len() == other.slots.len() {
            for (ours, theirs) in self.slots.iter_mut().zip(&other.slots) {
                ours.status = ours.status.combine(theirs.status);
            }
        }
        debug!(knob = %self.label, "value change merged");
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        holder::{KnobSpec, Timeline},
        value::KnobKind,
    };

    #[test]
    fn first_redo_captures_transaction_time() {
        let timeline = Timeline::new(12.0);
        let holder = KnobHolder::new("Grade", timeline.clone());
        let gain = holder.create_knob(KnobSpec::new("gain", KnobKind::Double));
        let mut command = ValueChangeCommand::single(
            &gain,
            DimIdx(0),
            ViewSpec::One(ViewIdx::MAIN),
            KnobValue::Double(0.0),
            KnobValue::Double(1.0),
            ValueChangeReason::UserEdited,
        );
        assert_eq!(command.transaction_time(), None);
        command.redo();
        timeline.set_current_time(30.0);
        command.undo();
        command.redo();
        assert_eq!(command.transaction_time(), Some(12.0));
        assert_eq!(command.statuses(), vec![ValueChangeStatus::ValueChanged]);
    }

    #[test]
    fn merge_refuses_other_value_types() {
        let holder = KnobHolder::new("Grade", Timeline::new(0.0));
        let gain = holder.create_knob(KnobSpec::new("gain", KnobKind::Double));
        let view = ViewSpec::One(ViewIdx::MAIN);
        let mut first = ValueChangeCommand::single(
            &gain,
            DimIdx(0),
            view,
            KnobValue::Double(0.0),
            KnobValue::Double(1.0),
            ValueChangeReason::UserEdited,
        );
        let odd = ValueChangeCommand::single(
            &gain,
            DimIdx(0),
            view,
            KnobValue::Double(1.0),
            KnobValue::Int(2),
            ValueChangeReason::UserEdited,
        );
        assert!(!first.merge_with(&odd));
        assert_eq!(first.new_values(), &[KnobValue::Double(1.0)]);
    }

    #[test]
    #[should_panic(expected = "value count does not match")]
    fn all_dimensions_checks_sizes() {
        let holder = KnobHolder::new("Transform", Timeline::new(0.0));
        let translate =
            holder.create_knob(KnobSpec::new("translate", KnobKind::Double).with_dimensions(2));
        let _ = ValueChangeCommand::all_dimensions(
            &translate,
            ViewIdx::MAIN,
            vec![KnobValue::Double(0.0)],
            vec![KnobValue::Double(1.0)],
            ValueChangeReason::UserEdited,
        );
    }
}
