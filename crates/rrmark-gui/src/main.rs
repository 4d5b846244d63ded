use eframe::{egui, egui::ViewportBuilder};
use log::{info, warn};
use rfd::FileDialog;
use rrmark_lib::{
    coords::{sample_to_pixel, value_to_pixel, PlotRange},
    plot::{Color, Figure, Series, Style},
    EditorConfig, Input, Outcome, PanDirection, SampleWindow, Surface, SurfaceLayout,
    ViewPreferences,
};
use std::env;
use std::path::{Path, PathBuf};

mod store;

use store::Store;

/// Pixel distances in the editor config are given for a canvas drawn at five
/// device pixels per point; the surfaces here are drawn at one.
const CANVAS_SCALE: f64 = 5.0;
const PRIMARY_HEIGHT: f32 = 320.0;
const INTERVAL_HEIGHT: f32 = 160.0;

fn main() -> eframe::Result<()> {
    env_logger::init();
    let config = match env::args_os().nth(1) {
        Some(path) => match EditorConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(err) => {
                warn!("{err}; using default settings");
                EditorConfig::default()
            }
        },
        None => EditorConfig::default(),
    };
    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default().with_inner_size([1120.0, 720.0]),
        ..Default::default()
    };
    eframe::run_native(
        "rrmark",
        native_options,
        Box::new(move |_cc| Ok(Box::new(MarkerApp::new(config)))),
    )
}

struct MarkerApp {
    store: Store,
    config: EditorConfig,
    signal_path: Option<PathBuf>,
    annotation_path: Option<PathBuf>,
    prefs: ViewPreferences,
    status: String,
}

impl MarkerApp {
    fn new(mut config: EditorConfig) -> Self {
        config.hit_threshold_px /= CANVAS_SCALE;
        config.marker_radius_px /= CANVAS_SCALE;
        let prefs = config.preferences();
        Self {
            store: Store::new(config.marker_radius_px as f32),
            config,
            signal_path: None,
            annotation_path: None,
            prefs,
            status: "No signal loaded".into(),
        }
    }

    fn open_session(&mut self) {
        let Some(signal) = self.signal_path.clone() else {
            self.status = "Pick a signal file first".into();
            return;
        };
        let mut config = self.config.clone();
        config.sampling_rate = self.prefs.sampling_rate;
        config.frame_seconds = self.prefs.frame_seconds;
        config.start_seconds = self.prefs.start_seconds;
        match self
            .store
            .open(&signal, self.annotation_path.as_deref(), &config)
        {
            Ok(()) => {
                if let Some(session) = self.store.session() {
                    self.prefs = session.viewport().preferences();
                    self.status = format!(
                        "Loaded {} samples, {} markers",
                        session.signal().len(),
                        session.markers().len()
                    );
                }
            }
            Err(err) => {
                warn!("open failed: {err}");
                self.status = err.to_string();
            }
        }
    }

    fn apply_preferences(&mut self) {
        match self.store.apply_preferences(self.prefs) {
            Some(applied) => {
                self.prefs = applied;
                self.status = format!(
                    "{:.1} Hz, {:.2} s frame from {:.2} s",
                    applied.sampling_rate, applied.frame_seconds, applied.start_seconds
                );
            }
            None => self.status = "Load a signal before updating the view".into(),
        }
    }

    fn save_annotations(&mut self) {
        let Some(session) = self.store.session() else {
            self.status = "Nothing to save".into();
            return;
        };
        let export = session.export();
        if let Some(path) = FileDialog::new()
            .add_filter("Annotations", &["csv", "txt"])
            .set_file_name(&export.file_name)
            .save_file()
        {
            match export.write_to(&path) {
                Ok(()) => {
                    info!("saved {} markers to {}", export.indices.len(), path.display());
                    self.status = format!("Saved {} markers", export.indices.len());
                }
                Err(err) => self.status = err.to_string(),
            }
        }
    }

    fn handle_input(&mut self, input: Input) {
        if let Some(outcome) = self.store.apply(input) {
            if let Outcome::Marker { edit } = outcome {
                self.status = format!("{edit:?}");
            }
            if let Some(session) = self.store.session() {
                self.prefs = session.viewport().preferences();
            }
        }
    }

    fn show_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Files");
        if ui.button("Pick signal").clicked() {
            if let Some(path) = FileDialog::new()
                .add_filter("Signal", &["csv", "txt"])
                .pick_file()
            {
                self.signal_path = Some(path);
                self.open_session();
            }
        }
        if ui.button("Pick annotations").clicked() {
            if let Some(path) = FileDialog::new()
                .add_filter("Annotations", &["csv", "txt"])
                .pick_file()
            {
                self.annotation_path = Some(path);
                self.open_session();
            }
        }
        for path in [&self.signal_path, &self.annotation_path].into_iter().flatten() {
            ui.small(path.display().to_string());
        }

        ui.separator();
        ui.heading("View");
        ui.add(
            egui::DragValue::new(&mut self.prefs.sampling_rate)
                .speed(1.0)
                .suffix(" Hz"),
        );
        ui.add(
            egui::DragValue::new(&mut self.prefs.frame_seconds)
                .speed(0.1)
                .suffix(" s frame"),
        );
        ui.add(
            egui::DragValue::new(&mut self.prefs.start_seconds)
                .speed(0.1)
                .suffix(" s start"),
        );
        if ui.button("Update").clicked() {
            self.apply_preferences();
        }

        ui.separator();
        let can_save = self.store.session().is_some();
        if ui
            .add_enabled(can_save, egui::Button::new("Save annotations"))
            .clicked()
        {
            self.save_annotations();
        }

        if let Some(stats) = self.store.stats() {
            ui.separator();
            ui.label(format!("Intervals: {}", stats.n));
            ui.label(format!("Mean RR: {:.3}s", stats.mean_s));
            ui.label(format!("SDNN: {:.3}s", stats.sdnn_s));
            ui.label(format!("RMSSD: {:.3}s", stats.rmssd_s));
        }
    }

    fn show_surfaces(&mut self, ui: &mut egui::Ui) {
        let Some(session) = self.store.session() else {
            ui.centered_and_justified(|ui| {
                ui.label("Pick a signal to start annotating.");
            });
            return;
        };
        let window = session.viewport().window();
        let full = session.viewport().full_window();

        let width = ui.available_width().max(2.0);
        let (primary_rect, primary) =
            ui.allocate_exact_size(egui::vec2(width, PRIMARY_HEIGHT), egui::Sense::click());
        ui.add_space(8.0);
        let interval = self.config.interval_view.then(|| {
            ui.allocate_exact_size(egui::vec2(width, INTERVAL_HEIGHT), egui::Sense::click())
        });

        let layout = SurfaceLayout {
            primary_width_px: primary_rect.width().round() as u32,
            interval_width_px: interval.as_ref().map(|(rect, _)| rect.width().round() as u32),
        };
        self.store.set_layout(layout);

        let hovered = primary.hover_pos().and_then(|pos| {
            let session = self.store.session()?;
            session.resolver().hovered_marker(
                f64::from(pos.x - primary_rect.left()),
                session.markers(),
                session.viewport(),
            )
        });

        if let Some(fig) = self.store.frame_figure() {
            let painter = ui.painter_at(primary_rect);
            paint_frame(&painter, primary_rect, fig, window, hovered);
        }
        if let (Some((rect, _)), Some(fig)) = (interval.as_ref(), self.store.interval_figure()) {
            let painter = ui.painter_at(*rect);
            paint_intervals(&painter, *rect, fig, full, window);
        }

        let mut inputs = Vec::new();
        if let Some(pos) = primary.interact_pointer_pos().filter(|_| primary.clicked()) {
            inputs.push(Input::Click {
                surface: Surface::Primary,
                x: f64::from(pos.x - primary_rect.left()),
            });
        }
        if let Some((rect, response)) = interval.as_ref() {
            if let Some(pos) = response.interact_pointer_pos().filter(|_| response.clicked()) {
                inputs.push(Input::Click {
                    surface: Surface::Interval,
                    x: f64::from(pos.x - rect.left()),
                });
            }
        }
        for input in inputs {
            self.handle_input(input);
        }
    }
}

impl eframe::App for MarkerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !ctx.wants_keyboard_input() {
            let (left, right) = ctx.input(|i| {
                (
                    i.key_pressed(egui::Key::ArrowLeft),
                    i.key_pressed(egui::Key::ArrowRight),
                )
            });
            if left {
                self.handle_input(Input::Key(PanDirection::Left));
            }
            if right {
                self.handle_input(Input::Key(PanDirection::Right));
            }
        }

        self.store.prepare();

        egui::SidePanel::left("controls").show(ctx, |ui| self.show_controls(ui));
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(&self.status);
        });
        egui::CentralPanel::default().show(ctx, |ui| self.show_surfaces(ui));
    }
}

fn to_screen(rect: egui::Rect, x: PlotRange, y: PlotRange, point: [f64; 2]) -> egui::Pos2 {
    let px = sample_to_pixel(point[0], x.min, x.max, rect.width().round() as u32);
    let py = value_to_pixel(point[1], y, rect.height().round() as u32);
    egui::pos2(rect.left() + px as f32, rect.top() + py as f32)
}

// Clicks map through `window.length`, so the drawn domain is one sample wider
// than the last visible index.
fn window_range(window: SampleWindow) -> PlotRange {
    PlotRange::exact(
        window.start as f64,
        (window.start + window.length) as f64,
    )
}

fn paint_figure(painter: &egui::Painter, rect: egui::Rect, fig: &Figure, x: PlotRange) {
    let y = fig.y.range.unwrap_or(PlotRange::exact(0.0, 1.0));
    for series in &fig.series {
        match series {
            Series::Line(line) => {
                let points = line
                    .points
                    .iter()
                    .map(|&p| to_screen(rect, x, y, p))
                    .collect();
                painter.add(egui::Shape::line(points, stroke_from_style(&line.style)));
            }
            Series::Markers(markers) => {
                for &p in &markers.points {
                    painter.circle_filled(
                        to_screen(rect, x, y, p),
                        markers.style.width,
                        color_from_u32(markers.style.color),
                    );
                }
            }
        }
    }
}

fn paint_frame(
    painter: &egui::Painter,
    rect: egui::Rect,
    fig: &Figure,
    window: SampleWindow,
    hovered: Option<usize>,
) {
    painter.rect_filled(rect, 0.0, egui::Color32::WHITE);
    let x = window_range(window);
    paint_figure(painter, rect, fig, x);
    if let (Some(sample), Some(y)) = (hovered, fig.y.range) {
        let marker = fig.series.iter().find_map(|series| match series {
            Series::Markers(m) => m.points.iter().find(|p| p[0] as usize == sample).copied(),
            Series::Line(_) => None,
        });
        if let Some(point) = marker {
            painter.circle_stroke(
                to_screen(rect, x, y, point),
                6.0,
                egui::Stroke::new(2.0, egui::Color32::YELLOW),
            );
        }
    }
    painter.rect_stroke(rect, 0.0, egui::Stroke::new(1.0, egui::Color32::GRAY));
}

fn paint_intervals(
    painter: &egui::Painter,
    rect: egui::Rect,
    fig: &Figure,
    full: SampleWindow,
    window: SampleWindow,
) {
    painter.rect_filled(rect, 0.0, egui::Color32::WHITE);
    let x = window_range(full);
    let width = rect.width().round() as u32;
    let left = sample_to_pixel(window.start as f64, x.min, x.max, width) as f32;
    let right = sample_to_pixel((window.start + window.length) as f64, x.min, x.max, width) as f32;
    painter.rect_filled(
        egui::Rect::from_x_y_ranges(
            (rect.left() + left)..=(rect.left() + right),
            rect.y_range(),
        ),
        0.0,
        egui::Color32::from_gray(235),
    );
    paint_figure(painter, rect, fig, x);
    painter.rect_stroke(rect, 0.0, egui::Stroke::new(1.0, egui::Color32::GRAY));
}

fn stroke_from_style(style: &Style) -> egui::Stroke {
    egui::Stroke::new(style.width, color_from_u32(style.color))
}

fn color_from_u32(color: Color) -> egui::Color32 {
    let [r, g, b] = color.rgb();
    egui::Color32::from_rgb(r, g, b)
}
