use std::{fmt, sync::Arc};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    batch::{ChangeBatch, ChangeListener, ChangeQueue, ValueChangeNotice},
    config::CurvesConfig,
    knob::{Knob, ParamStore},
    value::{KnobKind, KnobValue},
};

/// Current time shared by every holder of a project.
#[derive(Debug)]
pub struct Timeline {
    current: RwLock<f64>,
}

impl Timeline {
    #[must_use]
    pub fn new(time: f64) -> Arc<Self> {
        Arc::new(Self {
            current: RwLock::new(time),
        })
    }

    #[must_use]
    pub fn current_time(&self) -> f64 {
        *self.current.read()
    }

    pub fn set_current_time(&self, time: f64) {
        if !time.is_finite() {
            warn!(time, "ignored non-finite timeline time");
            return;
        }
        *self.current.write() = time;
    }
}

/// Description of a knob to create on a holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnobSpec {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub label: String,
    pub kind: KnobKind,
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default)]
    pub default_value: Option<KnobValue>,
}

fn default_dimensions() -> usize {
    1
}

impl KnobSpec {
    #[must_use]
    pub fn new(label: impl Into<String>, kind: KnobKind) -> Self {
        Self {
            id: None,
            label: label.into(),
            kind,
            dimensions: 1,
            default_value: None,
        }
    }

    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    #[must_use]
    pub fn with_default(mut self, value: KnobValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Fixed id, for fixtures and restored projects.
    #[must_use]
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }
}

/// Owner of a set of knobs (a node, typically). Knobs point back at it weakly.
pub struct KnobHolder {
    id: Uuid,
    name: String,
    timeline: Arc<Timeline>,
    settings: CurvesConfig,
    knobs: RwLock<Vec<Arc<Knob>>>,
    changes: ChangeQueue,
}

impl fmt::Debug for KnobHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnobHolder")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("knobs", &self.knobs.read().len())
            .finish_non_exhaustive()
    }
}

impl KnobHolder {
    #[must_use]
    pub fn new(name: impl Into<String>, timeline: Arc<Timeline>) -> Arc<Self> {
        Self::with_settings(name, timeline, CurvesConfig::default())
    }

    #[must_use]
    pub fn with_settings(
        name: impl Into<String>,
        timeline: Arc<Timeline>,
        settings: CurvesConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            timeline,
            settings,
            knobs: RwLock::new(Vec::new()),
            changes: ChangeQueue::default(),
        })
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    #[must_use]
    pub fn timeline_current_time(&self) -> f64 {
        self.timeline.current_time()
    }

    #[instrument(
        skip(self, spec),
        fields(holder = %self.name, label = %spec.label, kind = ?spec.kind)
    )]
    pub fn create_knob(self: &Arc<Self>, spec: KnobSpec) -> Arc<Knob> {
        let knob = Arc::new(Knob::new(spec, Arc::downgrade(self), &self.settings));
        self.knobs.write().push(Arc::clone(&knob));
        info!(knob_id = %knob.id(), dimensions = knob.dimension_count(), "knob created");
        knob
    }

    #[must_use]
    pub fn knob(&self, id: Uuid) -> Option<Arc<Knob>> {
        self.knobs.read().iter().find(|knob| knob.id() == id).cloned()
    }

    #[must_use]
    pub fn knob_by_label(&self, label: &str) -> Option<Arc<Knob>> {
        self.knobs
            .read()
            .iter()
            .find(|knob| knob.label() == label)
            .cloned()
    }

    #[must_use]
    pub fn knobs(&self) -> Vec<Arc<Knob>> {
        self.knobs.read().clone()
    }

    /// Detaches a knob. Commands still pointing at it become inert once the last handle drops.
    #[instrument(skip(self), fields(holder = %self.name, knob_id = %id))]
    pub fn remove_knob(&self, id: Uuid) -> Option<Arc<Knob>> {
        let mut knobs = self.knobs.write();
        let index = knobs.iter().position(|knob| knob.id() == id)?;
        let knob = knobs.remove(index);
        info!("knob removed");
        Some(knob)
    }

    /// Defers change notices until the returned token (and any enclosing one) drops.
    pub fn begin_changes(&self) -> ChangeBatch<'_> {
        self.changes.begin()
    }

    pub fn add_listener(&self, listener: Arc<dyn ChangeListener>) {
        self.changes.add_listener(listener);
    }

    /// Downstream re-evaluations triggered so far.
    #[must_use]
    pub fn evaluation_count(&self) -> u64 {
        self.changes.evaluation_count()
    }

    #[must_use]
    pub fn batch_depth(&self) -> usize {
        self.changes.depth()
    }

    pub(crate) fn notify(&self, notice: ValueChangeNotice) {
        self.changes.notify(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeline_ignores_non_finite_time() {
        let timeline = Timeline::new(3.0);
        timeline.set_current_time(f64::NAN);
        assert_eq!(timeline.current_time(), 3.0);
        timeline.set_current_time(12.0);
        assert_eq!(timeline.current_time(), 12.0);
    }

    #[test]
    fn knobs_are_found_and_removed() {
        let holder = KnobHolder::new("Blur", Timeline::new(0.0));
        let size = holder.create_knob(KnobSpec::new("size", KnobKind::Double).with_dimensions(2));
        assert_eq!(holder.knob_by_label("size").map(|k| k.id()), Some(size.id()));
        assert!(holder.remove_knob(size.id()).is_some());
        assert!(holder.knob(size.id()).is_none());
        assert!(holder.remove_knob(size.id()).is_none());
    }
}
