use std::{
    any::Any,
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Weak},
};

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    command::UndoCommand,
    curve::Keyframe,
    history::UndoStack,
    holder::KnobHolder,
    knob::{DimIdx, DimSpec, ParamStore, ViewIdx, ViewSpec},
    value::{KnobValue, ValueChangeReason, ValueChangeStatus},
};

/// What one dimension/view held before an edit, at the edit's time.
#[derive(Debug, Clone, PartialEq)]
pub struct OldDimViewValue {
    pub value: KnobValue,
    /// Keyframe that sat at the edit time, if any.
    pub keyframe: Option<Keyframe>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnobEdit {
    pub new_value: KnobValue,
    pub time: f64,
    pub old_values: BTreeMap<(DimIdx, ViewIdx), OldDimViewValue>,
    pub dimension: DimSpec,
    pub view: ViewSpec,
    pub set_keyframe: bool,
    pub status: ValueChangeStatus,
    pub reason: ValueChangeReason,
}

impl KnobEdit {
    /// Writes the new value again. Edits that produced a keyframe are re-keyed at their own time.
    fn apply(&mut self, param: &dyn ParamStore) {
        self.status = if self.set_keyframe || self.status.touched_keyframe() {
            param.set_value_at_time(
                self.time,
                self.new_value.clone(),
                self.view,
                self.dimension,
                self.reason,
            )
        } else {
            param.set_value(self.new_value.clone(), self.view, self.dimension, self.reason)
        };
    }

    fn revert(&self, param: &dyn ParamStore) {
        if self.status == ValueChangeStatus::KeyframeAdded {
            param.delete_value_at_time(self.time, self.view, self.dimension, self.reason);
        }
        for (&(dim, dim_view), old) in &self.old_values {
            let view = ViewSpec::One(dim_view);
            let dimension = DimSpec::One(dim);
            if self.status == ValueChangeStatus::ValueChanged
                || !param.is_animated(dim, dim_view)
            {
                param.set_value(old.value.clone(), view, dimension, self.reason);
            }
            if let Some(keyframe) = old.keyframe {
                param.set_keyframe(keyframe, view, dimension, self.reason);
            }
        }
    }
}

struct KnobEdits {
    param: Weak<dyn ParamStore>,
    param_id: Uuid,
    label: String,
    edits: Vec<KnobEdit>,
}

/// Edits made to several knobs of one holder during a single gesture, undone as one step.
pub struct MultipleKnobEditsCommand {
    holder_id: Option<Uuid>,
    holder_name: String,
    knobs: Vec<KnobEdits>,
    create_new: bool,
    first_redo_done: bool,
}

impl MultipleKnobEditsCommand {
    /// `create_new` keeps this command from being folded into the entry below it on the stack.
    pub fn new<P: ParamStore + 'static>(param: &Arc<P>, edit: KnobEdit, create_new: bool) -> Self {
        let holder = param.holder();
        let weak: Weak<P> = Arc::downgrade(param);
        let weak: Weak<dyn ParamStore> = weak;
        Self {
            holder_id: holder.as_ref().map(|holder| holder.id()),
            holder_name: holder
                .as_ref()
                .map(|holder| holder.name().to_string())
                .unwrap_or_default(),
            knobs: vec![KnobEdits {
                param: weak,
                param_id: param.id(),
                label: param.label().to_string(),
                edits: vec![edit],
            }],
            create_new,
            first_redo_done: false,
        }
    }

    #[must_use]
    pub fn knob_ids(&self) -> Vec<Uuid> {
        self.knobs.iter().map(|knob| knob.param_id).collect()
    }

    #[must_use]
    pub fn edits_for(&self, knob: Uuid) -> &[KnobEdit] {
        self.knobs
            .iter()
            .find(|entry| entry.param_id == knob)
            .map_or(&[], |entry| entry.edits.as_slice())
    }

    #[must_use]
    pub fn create_new(&self) -> bool {
        self.create_new
    }

    fn knob_set(&self) -> BTreeSet<Uuid> {
        self.knobs.iter().map(|knob| knob.param_id).collect()
    }
}

impl UndoCommand for MultipleKnobEditsCommand {
    fn text(&self) -> String {
        match self.knobs.as_slice() {
            [only] => format!("{}: {}", self.holder_name, only.label),
            _ => format!("{}: Multiple Parameters Edits", self.holder_name),
        }
    }

    #[instrument(skip(self), fields(knobs = self.knobs.len()))]
    fn redo(&mut self) {
        // The creating code path already applied the values.
        if !self.first_redo_done {
            self.first_redo_done = true;
            return;
        }
        for entry in &mut self.knobs {
            let Some(param) = entry.param.upgrade() else {
                debug!(knob = %entry.label, "knob gone, redo skipped");
                continue;
            };
            let holder = param.holder();
            let _batch = holder.as_deref().map(KnobHolder::begin_changes);
            for edit in &mut entry.edits {
                edit.apply(param.as_ref());
            }
        }
        info!("knob edits reapplied");
    }

    #[instrument(skip(self), fields(knobs = self.knobs.len()))]
    fn undo(&mut self) {
        for entry in &self.knobs {
            let Some(param) = entry.param.upgrade() else {
                debug!(knob = %entry.label, "knob gone, undo skipped");
                continue;
            };
            let holder = param.holder();
            let _batch = holder.as_deref().map(KnobHolder::begin_changes);
            let auto_keying = param.auto_keying_enabled();
            param.set_auto_keying_enabled(false);
            for edit in entry.edits.iter().rev() {
                edit.revert(param.as_ref());
            }
            param.set_auto_keying_enabled(auto_keying);
        }
        info!("knob edits undone");
    }

    fn merge_with(&mut self, other: &dyn UndoCommand) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        if self.holder_id.is_none() || self.holder_id != other.holder_id {
            return false;
        }
        // An identical knob set keeps accumulating even when a new entry was requested.
        if self.knob_set() != other.knob_set() && other.create_new {
            return false;
        }
        for incoming in &other.knobs {
            match self
                .knobs
                .iter_mut()
                .find(|entry| entry.param_id == incoming.param_id)
            {
                Some(entry) => entry.edits.extend(incoming.edits.iter().cloned()),
                None => self.knobs.push(KnobEdits {
                    param: incoming.param.clone(),
                    param_id: incoming.param_id,
                    label: incoming.label.clone(),
                    edits: incoming.edits.clone(),
                }),
            }
        }
        debug!(knobs = self.knobs.len(), "knob edits merged");
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A UI edit to route through the undo stack.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEdit {
    pub value: KnobValue,
    pub dimension: DimSpec,
    pub view: ViewSpec,
    pub reason: ValueChangeReason,
    /// `Some(time)` writes a keyframe there; `None` is a plain set at the current time.
    pub keyframe_time: Option<f64>,
    pub create_new: bool,
}

impl TrackedEdit {
    #[must_use]
    pub fn set(value: KnobValue, dimension: DimSpec, view: ViewSpec) -> Self {
        Self {
            value,
            dimension,
            view,
            reason: ValueChangeReason::UserEdited,
            keyframe_time: None,
            create_new: false,
        }
    }

    #[must_use]
    pub fn at_time(mut self, time: f64) -> Self {
        self.keyframe_time = Some(time);
        self
    }

    #[must_use]
    pub fn starting_new_entry(mut self) -> Self {
        self.create_new = true;
        self
    }
}

fn capture_old_values(
    param: &dyn ParamStore,
    time: f64,
    dimension: DimSpec,
    view: ViewSpec,
) -> BTreeMap<(DimIdx, ViewIdx), OldDimViewValue> {
    let dims: Vec<DimIdx> = match dimension {
        DimSpec::One(dim) => vec![dim],
        DimSpec::All => (0..param.n_dimensions()).map(DimIdx).collect(),
    };
    let views = match view {
        ViewSpec::One(view) => vec![view],
        ViewSpec::All => param.views(),
    };
    let mut old_values = BTreeMap::new();
    for view in views {
        for dim in &dims {
            if let Some(value) = param.value_at_time(time, *dim, view) {
                let keyframe = param.keyframe_at_time(time, *dim, view);
                old_values.insert((*dim, view), OldDimViewValue { value, keyframe });
            }
        }
    }
    old_values
}

/// Applies `edit` to `param` and records it on `stack`. Edits that change nothing are not recorded.
#[instrument(skip(stack, param, edit), fields(knob = %param.label()))]
pub fn record_knob_edit<P: ParamStore + 'static>(
    stack: &mut UndoStack,
    param: &Arc<P>,
    edit: TrackedEdit,
) -> ValueChangeStatus {
    let time = edit.keyframe_time.unwrap_or_else(|| param.current_time());
    let old_values = capture_old_values(param.as_ref(), time, edit.dimension, edit.view);

    let status = match edit.keyframe_time {
        Some(time) => param.set_value_at_time(
            time,
            edit.value.clone(),
            edit.view,
            edit.dimension,
            edit.reason,
        ),
        None => param.set_value(edit.value.clone(), edit.view, edit.dimension, edit.reason),
    };
    if !status.is_change() {
        debug!(?status, "edit not recorded");
        return status;
    }

    let record = KnobEdit {
        new_value: edit.value,
        time,
        old_values,
        dimension: edit.dimension,
        view: edit.view,
        set_keyframe: edit.keyframe_time.is_some(),
        status,
        reason: edit.reason,
    };
    stack.push(Box::new(MultipleKnobEditsCommand::new(
        param,
        record,
        edit.create_new,
    )));
    status
}
