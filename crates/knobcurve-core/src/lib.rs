pub mod batch;
pub mod command;
pub mod config;
pub mod curve;
pub mod diagnostics;
pub mod display;
pub mod evaluator;
pub mod fixtures;
pub mod history;
pub mod holder;
pub mod interpolation;
pub mod knob;
pub mod multi_edit;
pub mod persistence;
pub mod value;

pub use batch::{ChangeBatch, ChangeListener, ValueChangeNotice};
pub use command::{UndoCommand, ValueChangeCommand};
pub use config::EngineConfig;
pub use curve::{Curve, CurveError, KEYFRAME_TIME_EPSILON, Keyframe, KeyframeInterpolation, Range};
pub use diagnostics::{
    TelemetryGuard, init_tracing, init_tracing_from_config, init_tracing_with_options,
};
pub use display::{
    DisplayContext, DisplaySample, SegmentHint, SegmentStep, Viewport, next_point_for_segment,
    sample_for_display,
};
pub use evaluator::Bracket;
pub use history::UndoStack;
pub use holder::{KnobHolder, KnobSpec, Timeline};
pub use knob::{DimIdx, DimSpec, Knob, KnobError, KnobSnapshot, ParamStore, ViewIdx, ViewSpec};
pub use multi_edit::{
    KnobEdit, MultipleKnobEditsCommand, OldDimViewValue, TrackedEdit, record_knob_edit,
};
pub use value::{CurveValueKind, KnobKind, KnobValue, ValueChangeReason, ValueChangeStatus};
