use crate::config::EditorConfig;
use crate::coords::PlotRange;
use crate::error::{AnnotateError, Result};
use crate::intervals::{interval_stats, IntervalSeries, IntervalStats};
use crate::io::export::AnnotationExport;
use crate::io::text::{parse_annotations, parse_signal, read_annotations, read_signal};
use crate::markers::MarkerSet;
use crate::resolver::{Input, InteractionResolver, Outcome, SurfaceLayout};
use crate::signal::Signal;
use crate::viewport::{SampleWindow, ViewPreferences, Viewport};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What a mutation touched, so observers know what to redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    Markers,
    Viewport,
}

type Observer = Box<dyn FnMut(Change)>;

/// Everything a renderer needs for the primary surface.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RenderFrame<'a> {
    pub window: SampleWindow,
    pub samples: &'a [f64],
    pub markers: &'a [usize],
}

impl RenderFrame<'_> {
    pub fn value_range(&self) -> Option<PlotRange> {
        PlotRange::padded(self.samples.iter().copied())
    }

    /// Signal value under a marker inside this frame.
    pub fn value_at(&self, sample: usize) -> Option<f64> {
        sample
            .checked_sub(self.window.start)
            .and_then(|offset| self.samples.get(offset))
            .copied()
    }

    /// `[sample, value]` for every visible marker.
    pub fn marker_points(&self) -> Vec<[f64; 2]> {
        self.markers
            .iter()
            .filter_map(|&m| self.value_at(m).map(|v| [m as f64, v]))
            .collect()
    }
}

/// One editing session: a signal, its markers and the current view.
///
/// Loading a new recording means building a new `Session`; nothing is
/// carried over from the previous one.
pub struct Session {
    signal: Signal,
    markers: MarkerSet,
    viewport: Viewport,
    resolver: InteractionResolver,
    source_name: Option<String>,
    export_tag: String,
    observers: Vec<Observer>,
}

impl Session {
    pub fn open(
        signal: Signal,
        annotations: Vec<usize>,
        source_name: Option<String>,
        config: &EditorConfig,
    ) -> Result<Self> {
        let viewport = Viewport::new(signal.len(), config.preferences())?;
        let markers = normalize_markers(annotations, signal.len());
        let resolver = InteractionResolver::new(config.layout())
            .with_hit_threshold(config.hit_threshold_px)
            .with_marker_radius(config.marker_radius_px);
        info!(
            "opened {} ({} samples, {} markers)",
            source_name.as_deref().unwrap_or("<unnamed signal>"),
            signal.len(),
            markers.len()
        );
        Ok(Self {
            signal,
            markers,
            viewport,
            resolver,
            source_name,
            export_tag: config.export_tag.clone(),
            observers: Vec::new(),
        })
    }

    /// Parse the signal, then the annotations, then build the session.
    pub fn from_text(
        signal_text: &str,
        annotation_text: Option<&str>,
        source_name: Option<String>,
        config: &EditorConfig,
    ) -> Result<Self> {
        let signal = parse_signal(signal_text)?;
        let annotations = recover_annotations(annotation_text.map(parse_annotations))?;
        Self::open(signal, annotations, source_name, config)
    }

    pub fn from_files(
        signal_path: &Path,
        annotation_path: Option<&Path>,
        config: &EditorConfig,
    ) -> Result<Self> {
        let signal = read_signal(signal_path)?;
        let annotations = recover_annotations(annotation_path.map(read_annotations))?;
        let source_name = signal_path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_owned);
        Self::open(signal, annotations, source_name, config)
    }

    /// Register a callback run after every observable mutation.
    pub fn subscribe(&mut self, observer: impl FnMut(Change) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn apply(&mut self, input: Input) -> Outcome {
        let outcome = self
            .resolver
            .resolve(input, &mut self.markers, &mut self.viewport);
        if let Some(change) = outcome.change() {
            self.notify(change);
        }
        outcome
    }

    /// Apply display preferences and return the values actually in force.
    pub fn apply_preferences(&mut self, prefs: ViewPreferences) -> ViewPreferences {
        let before = self.viewport.clone();
        let applied =
            self.viewport
                .apply_preferences(prefs.sampling_rate, prefs.frame_seconds, prefs.start_seconds);
        if self.viewport != before {
            self.notify(Change::Viewport);
        }
        applied
    }

    /// Update surface widths after the host resized its views.
    pub fn set_surface_layout(&mut self, layout: SurfaceLayout) {
        self.resolver.set_layout(layout);
    }

    pub fn render_frame(&self) -> RenderFrame<'_> {
        let window = self.viewport.window();
        RenderFrame {
            window,
            samples: self.signal.window(window),
            markers: self.markers.in_window(window),
        }
    }

    pub fn intervals(&self) -> IntervalSeries {
        IntervalSeries::from_markers(&self.markers)
    }

    pub fn interval_stats(&self) -> IntervalStats {
        interval_stats(&self.intervals(), self.viewport.sampling_rate())
    }

    pub fn export(&self) -> AnnotationExport {
        AnnotationExport::new(
            self.source_name.as_deref(),
            &self.export_tag,
            self.markers.export_sequence().to_vec(),
        )
    }

    /// End the session, handing the markers off as an export.
    pub fn finish(self) -> AnnotationExport {
        let export = self.export();
        info!(
            "finished session with {} markers as {}",
            export.indices.len(),
            export.file_name
        );
        export
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn resolver(&self) -> &InteractionResolver {
        &self.resolver
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    fn notify(&mut self, change: Change) {
        for observer in self.observers.iter_mut() {
            observer(change);
        }
    }
}

fn recover_annotations(parsed: Option<Result<Vec<usize>>>) -> Result<Vec<usize>> {
    match parsed {
        None => Ok(Vec::new()),
        Some(Ok(indices)) => Ok(indices),
        Some(Err(err @ AnnotateError::MalformedAnnotation { .. })) => {
            warn!("ignoring annotation input, starting without markers: {err}");
            Ok(Vec::new())
        }
        Some(Err(err)) => Err(err),
    }
}

fn normalize_markers(indices: Vec<usize>, signal_length: usize) -> MarkerSet {
    let supplied = indices.len();
    let in_range: Vec<usize> = indices
        .into_iter()
        .filter(|&m| m >= 1 && m <= signal_length)
        .collect();
    let dropped = supplied - in_range.len();
    if dropped > 0 {
        warn!("dropped {dropped} annotation(s) outside 1..={signal_length}");
    }
    let was_sorted = in_range.windows(2).all(|w| w[0] < w[1]);
    let markers = MarkerSet::from_indices(in_range);
    if !was_sorted {
        warn!("annotations were unsorted or duplicated; using {} markers", markers.len());
    }
    markers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::MarkerEdit;
    use crate::resolver::Surface;
    use crate::viewport::PanDirection;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn config() -> EditorConfig {
        EditorConfig {
            sampling_rate: 200.0,
            ..EditorConfig::default()
        }
    }

    fn signal_text(len: usize) -> String {
        (0..len)
            .map(|i| format!("{:.3}", (i as f64 * 0.05).sin()))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn session(markers: &str) -> Session {
        Session::from_text(&signal_text(2000), Some(markers), Some("ecg.csv".into()), &config())
            .unwrap()
    }

    fn primary_x(session: &Session, sample: usize) -> f64 {
        let window = session.viewport().window();
        let width = f64::from(session.resolver().layout().primary_width_px);
        (sample - window.start) as f64 * (width - 1.0) / window.length as f64
    }

    fn click_sample(session: &mut Session, sample: usize) -> Outcome {
        let x = primary_x(session, sample);
        session.apply(Input::Click {
            surface: Surface::Primary,
            x,
        })
    }

    #[test]
    fn click_adds_then_removes_marker() {
        let mut s = session("");
        click_sample(&mut s, 500);
        assert_eq!(s.markers().as_slice(), &[500]);
        click_sample(&mut s, 500);
        assert!(s.markers().is_empty());
    }

    #[test]
    fn click_left_of_first_marker_prepends() {
        let mut s = session("100,300,500");
        click_sample(&mut s, 50);
        assert_eq!(s.markers().as_slice(), &[50, 100, 300, 500]);
    }

    #[test]
    fn click_near_marker_removes_it() {
        let mut s = session("100,300,500");
        let outcome = click_sample(&mut s, 305);
        assert_eq!(s.markers().as_slice(), &[100, 500]);
        assert!(matches!(
            outcome,
            Outcome::Marker {
                edit: MarkerEdit::Removed { sample: 300, .. }
            }
        ));
        assert_eq!(s.intervals().len(), 1);
    }

    #[test]
    fn oversized_frame_request_resets_start() {
        let mut s = session("");
        let applied = s.apply_preferences(ViewPreferences {
            sampling_rate: 200.0,
            frame_seconds: 30.0,
            start_seconds: 4.0,
        });
        assert_eq!(s.viewport().frame_length(), 2000);
        assert_eq!(applied.start_seconds, 0.0);
        assert_eq!(applied.frame_seconds, 10.0);
    }

    #[test]
    fn malformed_annotations_fall_back_to_empty() {
        let s = session("100,abc,300");
        assert!(s.markers().is_empty());
    }

    #[test]
    fn unreadable_signal_is_fatal() {
        let err = Session::from_text("1.0,two", None, None, &config()).err();
        assert!(matches!(err, Some(AnnotateError::InvalidSignal(_))));
    }

    #[test]
    fn initial_markers_are_normalized() {
        let s = session("500,0,100,100,2001,300");
        assert_eq!(s.markers().as_slice(), &[100, 300, 500]);
    }

    #[test]
    fn observers_see_each_change() {
        let mut s = session("100,300,500");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        s.subscribe(move |change| sink.borrow_mut().push(change));

        s.apply_preferences(ViewPreferences {
            sampling_rate: 200.0,
            frame_seconds: 2.0,
            start_seconds: 0.0,
        });
        click_sample(&mut s, 200);
        s.apply(Input::Key(PanDirection::Left));
        s.apply(Input::Key(PanDirection::Right));
        s.apply(Input::Click {
            surface: Surface::Interval,
            x: 0.0,
        });

        assert_eq!(
            *seen.borrow(),
            vec![
                Change::Viewport,
                Change::Markers,
                Change::Viewport,
                Change::Viewport
            ]
        );
    }

    #[test]
    fn render_frame_follows_viewport() {
        let mut s = session("100,300,500,900");
        s.apply_preferences(ViewPreferences {
            sampling_rate: 200.0,
            frame_seconds: 2.0,
            start_seconds: 1.0,
        });
        let frame = s.render_frame();
        assert_eq!(frame.window, SampleWindow::new(201, 400));
        assert_eq!(frame.samples.len(), 400);
        assert_eq!(frame.markers, &[300, 500]);
        let points = frame.marker_points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0][1], s.signal().value_at(300).unwrap());
    }

    #[test]
    fn export_uses_tag_and_source_name() {
        let mut s = session("100,300");
        click_sample(&mut s, 700);
        let export = s.finish();
        assert_eq!(export.file_name, "annoecg.csv");
        assert_eq!(export.indices, vec![100, 300, 700]);
    }

    #[test]
    fn loads_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let signal = dir.path().join("rec.csv");
        let anno = dir.path().join("rec_anno.csv");
        std::fs::write(&signal, signal_text(600)).unwrap();
        std::fs::write(&anno, "50,150,250").unwrap();
        let s = Session::from_files(&signal, Some(&anno), &config()).unwrap();
        assert_eq!(s.markers().len(), 3);
        assert_eq!(s.source_name(), Some("rec.csv"));
        assert!(Session::from_files(&signal, Some(&dir.path().join("missing")), &config()).is_err());
    }

    #[test]
    fn undecodable_annotation_file_opens_without_markers() {
        let dir = tempfile::tempdir().unwrap();
        let signal = dir.path().join("rec.csv");
        let anno = dir.path().join("rec_anno.csv");
        std::fs::write(&signal, signal_text(600)).unwrap();
        std::fs::write(&anno, [0x31, 0x2c, 0xff, 0xfe]).unwrap();
        let s = Session::from_files(&signal, Some(&anno), &config()).unwrap();
        assert!(s.markers().is_empty());
        assert_eq!(s.signal().len(), 600);
    }
}
