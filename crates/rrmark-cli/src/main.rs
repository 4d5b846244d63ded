use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use rrmark_lib::{
    coords::PlotRange,
    intervals::{interval_stats, IntervalPoint, IntervalSeries, IntervalStats},
    io::text as text_io,
    markers::MarkerSet,
    plot::{figure_from_frame, figure_from_intervals, Color as FigureColor, Figure, Series},
    EditorConfig, Input, Outcome, PanDirection, SampleWindow, Session, Surface, ViewPreferences,
};
use serde::{Deserialize, Serialize};
use std::{
    cell::Cell,
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    rc::Rc,
};

const RENDER_SIZE: (u32, u32) = (1080, 720);
const RENDER_MAX_POINTS: usize = 4096;
const RENDER_MARKER_RADIUS: f32 = 4.0;

#[derive(Parser)]
#[command(
    name = "rrmark",
    version,
    about = "rrmark: edit event markers on sampled signals"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SessionArgs {
    /// Comma-separated signal samples
    #[arg(long)]
    signal: PathBuf,
    /// Comma-separated 1-based marker indices
    #[arg(long)]
    annotations: Option<PathBuf>,
    /// TOML editor settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Sampling rate in Hz (overrides the config file)
    #[arg(long)]
    fs: Option<f64>,
    /// Visible frame length in seconds
    #[arg(long)]
    frame_s: Option<f64>,
    /// Window start in seconds
    #[arg(long)]
    start_s: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an interaction script and export the edited markers
    Annotate {
        #[command(flatten)]
        session: SessionArgs,
        /// Newline-delimited JSON steps: clicks, keys and preference edits
        #[arg(long)]
        script: Option<PathBuf>,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print the visible window after applying the viewport preferences
    Window {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// RR intervals and summary statistics from an annotation file or stdin
    Intervals {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, default_value_t = 250.0)]
        fs: f64,
    },
    /// Render the primary window and the interval view to a PNG via plotters
    Render {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long)]
        out: PathBuf,
    },
}

/// One line of an interaction script.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ScriptStep {
    Click { surface: Surface, x: f64 },
    Key(PanDirection),
    Preferences(PreferenceEdit),
}

/// Partial preference change; absent fields keep their current value.
#[derive(Debug, Default, Deserialize)]
struct PreferenceEdit {
    sampling_rate: Option<f64>,
    frame_seconds: Option<f64>,
    start_seconds: Option<f64>,
}

impl PreferenceEdit {
    fn over(&self, current: ViewPreferences) -> ViewPreferences {
        ViewPreferences {
            sampling_rate: self.sampling_rate.unwrap_or(current.sampling_rate),
            frame_seconds: self.frame_seconds.unwrap_or(current.frame_seconds),
            start_seconds: self.start_seconds.unwrap_or(current.start_seconds),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
enum StepReport {
    Input { outcome: Outcome },
    Preferences { applied: ViewPreferences },
}

#[derive(Serialize)]
struct AnnotateSummary {
    source: Option<String>,
    markers: usize,
    intervals: usize,
    changes: usize,
    export: PathBuf,
    preferences: ViewPreferences,
    window: SampleWindow,
    stats: IntervalStats,
    steps: Vec<StepReport>,
}

#[derive(Serialize)]
struct WindowReport<'a> {
    window: SampleWindow,
    preferences: ViewPreferences,
    samples: usize,
    markers: &'a [usize],
    value_range: Option<PlotRange>,
}

#[derive(Serialize)]
struct IntervalReport {
    points: Vec<IntervalPoint>,
    stats: IntervalStats,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Annotate {
            session,
            script,
            out_dir,
        } => cmd_annotate(&session, script.as_deref(), &out_dir)?,
        Commands::Window { session } => cmd_window(&session)?,
        Commands::Intervals { input, fs } => cmd_intervals(input.as_deref(), fs)?,
        Commands::Render { session, out } => cmd_render(&session, &out)?,
    }
    Ok(())
}

fn load_config(args: &SessionArgs) -> Result<EditorConfig> {
    let mut config = match args.config.as_deref() {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EditorConfig::default(),
    };
    if let Some(fs) = args.fs {
        config.sampling_rate = fs;
    }
    if let Some(frame_s) = args.frame_s {
        config.frame_seconds = frame_s;
    }
    if let Some(start_s) = args.start_s {
        config.start_seconds = start_s;
    }
    Ok(config)
}

fn open_session(args: &SessionArgs) -> Result<Session> {
    let config = load_config(args)?;
    Session::from_files(&args.signal, args.annotations.as_deref(), &config)
        .with_context(|| format!("opening session on {}", args.signal.display()))
}

fn read_script(path: &Path) -> Result<Vec<ScriptStep>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut steps = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let step = serde_json::from_str(trimmed)
            .with_context(|| format!("script line {} is not a valid step: {}", idx + 1, trimmed))?;
        steps.push(step);
    }
    Ok(steps)
}

fn cmd_annotate(args: &SessionArgs, script: Option<&Path>, out_dir: &Path) -> Result<()> {
    let mut session = open_session(args)?;
    let steps = match script {
        Some(path) => read_script(path)?,
        None => Vec::new(),
    };

    let changes = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&changes);
    session.subscribe(move |_| counter.set(counter.get() + 1));

    let mut reports = Vec::with_capacity(steps.len());
    for step in steps {
        let report = match step {
            ScriptStep::Click { surface, x } => StepReport::Input {
                outcome: session.apply(Input::Click { surface, x }),
            },
            ScriptStep::Key(direction) => StepReport::Input {
                outcome: session.apply(Input::Key(direction)),
            },
            ScriptStep::Preferences(edit) => {
                let requested = edit.over(session.viewport().preferences());
                StepReport::Preferences {
                    applied: session.apply_preferences(requested),
                }
            }
        };
        reports.push(report);
    }

    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let summary = AnnotateSummary {
        source: session.source_name().map(str::to_owned),
        markers: session.markers().len(),
        intervals: session.intervals().len(),
        changes: changes.get(),
        export: PathBuf::new(),
        preferences: session.viewport().preferences(),
        window: session.viewport().window(),
        stats: session.interval_stats(),
        steps: reports,
    };
    let export = session.finish();
    let path = export.write_to_dir(out_dir)?;
    info!("wrote {} markers to {}", export.indices.len(), path.display());

    let summary = AnnotateSummary {
        export: path,
        ..summary
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn cmd_window(args: &SessionArgs) -> Result<()> {
    let session = open_session(args)?;
    let frame = session.render_frame();
    let report = WindowReport {
        window: frame.window,
        preferences: session.viewport().preferences(),
        samples: frame.samples.len(),
        markers: frame.markers,
        value_range: frame.value_range(),
    };
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn read_annotation_input(input: Option<&Path>) -> Result<Vec<usize>> {
    match input {
        Some(path) => Ok(text_io::read_annotations(path)?),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(text_io::parse_annotations(&buf)?)
        }
    }
}

fn cmd_intervals(input: Option<&Path>, fs: f64) -> Result<()> {
    anyhow::ensure!(fs > 0.0, "sampling rate must be positive, got {fs}");
    let markers = MarkerSet::from_indices(read_annotation_input(input)?);
    let series = IntervalSeries::from_markers(&markers);
    let stats = interval_stats(&series, fs);
    let report = IntervalReport {
        points: series.points,
        stats,
    };
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn cmd_render(args: &SessionArgs, out: &Path) -> Result<()> {
    let session = open_session(args)?;
    let frame_fig = figure_from_frame(
        &session.render_frame(),
        RENDER_MAX_POINTS,
        RENDER_MARKER_RADIUS,
    );
    let viewport = session.viewport();
    let interval_fig = figure_from_intervals(
        &session.intervals(),
        viewport.signal_length(),
        viewport.sampling_rate(),
    );

    let root = BitMapBackend::new(out, RENDER_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let (upper, lower) = root.split_vertically((RENDER_SIZE.1 * 2 / 3) as i32);
    draw_figure(&upper, &frame_fig)?;
    draw_figure(&lower, &interval_fig)?;
    root.present()
        .with_context(|| format!("writing {}", out.display()))?;
    info!("rendered {}", out.display());
    Ok(())
}

fn rgb(color: FigureColor) -> RGBColor {
    let [r, g, b] = color.rgb();
    RGBColor(r, g, b)
}

fn draw_figure(area: &DrawingArea<BitMapBackend<'_>, Shift>, fig: &Figure) -> Result<()> {
    let x = fig.x.range.unwrap_or(PlotRange::exact(0.0, 1.0));
    let y = fig.y.range.unwrap_or(PlotRange::exact(0.0, 1.0));
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 20),
        )
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x.min..x.max, y.min..y.max)?;
    chart
        .configure_mesh()
        .x_desc(fig.x.label.clone().unwrap_or_default())
        .y_desc(fig.y.label.clone().unwrap_or_default())
        .draw()?;
    for series in &fig.series {
        match series {
            Series::Line(line) => {
                chart.draw_series(LineSeries::new(
                    line.points.iter().map(|p| (p[0], p[1])),
                    &rgb(line.style.color),
                ))?;
            }
            Series::Markers(markers) => {
                let style = rgb(markers.style.color).filled();
                let radius = markers.style.width.round() as i32;
                chart.draw_series(
                    markers
                        .points
                        .iter()
                        .map(|p| Circle::new((p[0], p[1]), radius, style)),
                )?;
            }
        }
    }
    Ok(())
}
