use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use knobcurve_core::{
    DimIdx, DimSpec, DisplayContext, EngineConfig, KnobValue, ParamStore, TrackedEdit, UndoStack,
    ValueChangeCommand, ValueChangeReason, ViewIdx, ViewSpec, Viewport,
    diagnostics::init_tracing_from_config,
    fixtures::demo_scene,
    persistence::{load_curve, save_curve},
    record_knob_edit, sample_for_display,
};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "knobcurve-cli")]
#[command(about = "Headless tools for evaluating curves and exercising knob undo history")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Overrides the configured log directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Config file; otherwise KNOBCURVE_CONFIG_PATH, then knobcurve.config.toml in cwd or its parent.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Prints the curve value at each abscissa.
    Evaluate {
        #[arg(long)]
        curve: PathBuf,

        #[arg(long, num_args = 1.., required = true, allow_negative_numbers = true)]
        at: Vec<f64>,

        /// Value printed while the curve has no keyframes.
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        fallback: f64,
    },
    /// Prints one display pass over the curve as JSON.
    Sample {
        #[arg(long)]
        curve: PathBuf,

        #[arg(long)]
        width: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        x_min: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        x_max: Option<f64>,

        #[arg(long, default_value_t = 1.0)]
        y_scale: f64,
    },
    /// Runs an auto-keyed edit, undo and redo on the demo scene and logs each step.
    Demo {
        /// Also writes the resulting opacity curve here.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct EvaluatedPoint {
    x: f64,
    y: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::load_or_default(),
    };
    if let Some(log_dir) = cli.log_dir {
        config.diagnostics.log_dir = log_dir;
    }
    let _telemetry = init_tracing_from_config(&config.diagnostics)?;

    match cli.command {
        Commands::Evaluate {
            curve,
            at,
            fallback,
        } => {
            let curve = load_curve(&curve)?;
            let points: Vec<EvaluatedPoint> = at
                .into_iter()
                .map(|x| EvaluatedPoint {
                    x,
                    y: curve.evaluate(x, fallback),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&points)?);
        }
        Commands::Sample {
            curve,
            width,
            x_min,
            x_max,
            y_scale,
        } => {
            let curve = load_curve(&curve)?;
            let (first, last) = curve
                .keyframe_span()
                .context("cannot pick a sampling range")?;
            let x_min = x_min.unwrap_or(first);
            let x_max = x_max.unwrap_or(if last > first { last } else { first + 1.0 });
            let width = width.unwrap_or(config.display.default_width);
            let viewport = Viewport::fit(x_min, x_max, width, y_scale)?;
            let ctx = DisplayContext::with_max_step(viewport, config.display.max_step_px);
            let samples = sample_for_display(&ctx, &curve);
            println!("{}", serde_json::to_string_pretty(&samples)?);
        }
        Commands::Demo { out } => run_demo(&config, out)?,
    }

    Ok(())
}

fn run_demo(config: &EngineConfig, out: Option<PathBuf>) -> anyhow::Result<()> {
    let scene = demo_scene();
    let mut stack = UndoStack::new(config.undo.limit);
    let main = ViewIdx::MAIN;

    scene.timeline.set_current_time(24.0);
    let before = scene
        .opacity
        .value(DimIdx(0), main)
        .context("opacity has a main view")?;
    let command = ValueChangeCommand::single(
        &scene.opacity,
        DimIdx(0),
        ViewSpec::One(main),
        before.clone(),
        KnobValue::Double(0.9),
        ValueChangeReason::UserEdited,
    );
    stack.push(Box::new(command));
    info!(
        keyframes = scene.opacity.curve(DimIdx(0), main)?.keyframe_count(),
        "auto-keyed opacity at frame 24"
    );

    record_knob_edit(
        &mut stack,
        &scene.translate,
        TrackedEdit::set(KnobValue::Double(15.0), DimSpec::One(DimIdx(0)), ViewSpec::All),
    );

    scene.timeline.set_current_time(50.0);
    while stack.undo() {}
    info!(
        opacity = %scene.opacity.value_at_time(24.0, DimIdx(0), main).context("opacity value")?,
        keyframes = scene.opacity.curve(DimIdx(0), main)?.keyframe_count(),
        "history fully undone at frame 50"
    );
    while stack.redo() {}
    info!(
        undo_entries = stack.len(),
        evaluations = scene.holder.evaluation_count(),
        "history replayed"
    );

    if let Some(path) = out {
        save_curve(&path, &scene.opacity.curve(DimIdx(0), main)?)?;
    }
    Ok(())
}
