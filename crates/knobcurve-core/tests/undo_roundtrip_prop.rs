use knobcurve_core::{
    DimIdx, DimSpec, KnobValue, ParamStore, TrackedEdit, UndoStack, ValueChangeCommand,
    ValueChangeReason, ViewIdx, ViewSpec, fixtures::demo_scene, record_knob_edit,
};
use proptest::prelude::*;

const MAIN: ViewIdx = ViewIdx::MAIN;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn static_edits_undo_and_redo_exactly(
        edits in prop::collection::vec((0usize..2, -100i32..100, any::<bool>()), 1..24),
    ) {
        let scene = demo_scene();
        let mut stack = UndoStack::new(0);
        let initial = scene.translate.snapshot(0.0);

        for (dim, value, fresh) in edits {
            let edit = TrackedEdit::set(
                KnobValue::Double(f64::from(value)),
                DimSpec::One(DimIdx(dim)),
                ViewSpec::One(MAIN),
            );
            let edit = if fresh { edit.starting_new_entry() } else { edit };
            record_knob_edit(&mut stack, &scene.translate, edit);
        }
        let edited = scene.translate.snapshot(0.0);

        while stack.undo() {}
        prop_assert_eq!(scene.translate.snapshot(0.0), initial);
        while stack.redo() {}
        prop_assert_eq!(scene.translate.snapshot(0.0), edited);
    }

    #[test]
    fn keyframe_edits_undo_to_the_original_curve(
        edits in prop::collection::vec((0i32..=60, -20i32..20), 1..16),
    ) {
        let scene = demo_scene();
        let mut stack = UndoStack::new(0);
        let original = scene.opacity.curve(DimIdx(0), MAIN).expect("animated");

        for (time, value) in edits {
            record_knob_edit(
                &mut stack,
                &scene.opacity,
                TrackedEdit::set(
                    KnobValue::Double(f64::from(value) * 0.1),
                    DimSpec::One(DimIdx(0)),
                    ViewSpec::One(MAIN),
                )
                .at_time(f64::from(time)),
            );
        }
        let edited = scene.opacity.curve(DimIdx(0), MAIN).expect("animated");

        while stack.undo() {}
        prop_assert_eq!(scene.opacity.curve(DimIdx(0), MAIN), Ok(original));
        while stack.redo() {}
        prop_assert_eq!(scene.opacity.curve(DimIdx(0), MAIN), Ok(edited));
    }

    #[test]
    fn auto_keyed_commands_leave_no_keys_behind(
        times in prop::collection::vec(1i32..47, 1..10),
    ) {
        let scene = demo_scene();
        let mut stack = UndoStack::new(0);
        for time in &times {
            scene.timeline.set_current_time(f64::from(*time));
            let before = scene.opacity.value(DimIdx(0), MAIN).expect("main view");
            stack.push(Box::new(ValueChangeCommand::single(
                &scene.opacity,
                DimIdx(0),
                ViewSpec::One(MAIN),
                before,
                KnobValue::Double(0.5),
                ValueChangeReason::UserEdited,
            )));
        }
        scene.timeline.set_current_time(100.0);
        while stack.undo() {}
        let curve = scene.opacity.curve(DimIdx(0), MAIN).expect("animated");
        prop_assert_eq!(curve.keyframe_count(), 2);
    }
}
