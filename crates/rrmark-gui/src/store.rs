use rrmark_lib::{
    intervals::IntervalStats,
    plot::{figure_from_frame, figure_from_intervals, Figure},
    AnnotateError, Change, EditorConfig, Input, Outcome, Session, SurfaceLayout, ViewPreferences,
};
use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

const MAX_FRAME_POINTS: usize = 4096;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct DirtyFlags {
    frame: bool,
    intervals: bool,
    stats: bool,
}

impl DirtyFlags {
    fn all() -> Self {
        Self {
            frame: true,
            intervals: true,
            stats: true,
        }
    }

    fn mark(&mut self, change: Change) {
        self.frame = true;
        if change == Change::Markers {
            self.intervals = true;
            self.stats = true;
        }
    }

    fn mark_rate(&mut self) {
        self.intervals = true;
        self.stats = true;
    }
}

#[derive(Default)]
struct Snapshot {
    frame_figure: Option<Figure>,
    interval_figure: Option<Figure>,
    stats: Option<IntervalStats>,
}

/// Owns the editing session and the figures derived from it. Figures are
/// rebuilt lazily, only after the session reported a relevant change.
pub struct Store {
    session: Option<Session>,
    dirty: Rc<Cell<DirtyFlags>>,
    snapshot: Snapshot,
    marker_radius: f32,
}

impl Store {
    pub fn new(marker_radius: f32) -> Self {
        Self {
            session: None,
            dirty: Rc::new(Cell::new(DirtyFlags::all())),
            snapshot: Snapshot::default(),
            marker_radius,
        }
    }

    pub fn open(
        &mut self,
        signal: &Path,
        annotations: Option<&Path>,
        config: &EditorConfig,
    ) -> Result<(), AnnotateError> {
        let session = Session::from_files(signal, annotations, config)?;
        self.replace_session(session);
        Ok(())
    }

    fn replace_session(&mut self, mut session: Session) {
        // A fresh flag cell detaches whatever the previous session held.
        let dirty = Rc::new(Cell::new(DirtyFlags::all()));
        let observer = Rc::clone(&dirty);
        session.subscribe(move |change| {
            let mut flags = observer.get();
            flags.mark(change);
            observer.set(flags);
        });
        self.dirty = dirty;
        self.snapshot = Snapshot::default();
        self.session = Some(session);
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn apply(&mut self, input: Input) -> Option<Outcome> {
        self.session.as_mut().map(|session| session.apply(input))
    }

    pub fn apply_preferences(&mut self, prefs: ViewPreferences) -> Option<ViewPreferences> {
        let session = self.session.as_mut()?;
        let rate_before = session.viewport().sampling_rate();
        let applied = session.apply_preferences(prefs);
        if session.viewport().sampling_rate() != rate_before {
            let mut flags = self.dirty.get();
            flags.mark_rate();
            self.dirty.set(flags);
        }
        Some(applied)
    }

    pub fn set_layout(&mut self, layout: SurfaceLayout) {
        if let Some(session) = self.session.as_mut() {
            session.set_surface_layout(layout);
        }
    }

    pub fn prepare(&mut self) {
        self.ensure_frame_figure();
        self.ensure_interval_figure();
        self.ensure_stats();
    }

    pub fn frame_figure(&self) -> Option<&Figure> {
        self.snapshot.frame_figure.as_ref()
    }

    pub fn interval_figure(&self) -> Option<&Figure> {
        self.snapshot.interval_figure.as_ref()
    }

    pub fn stats(&self) -> Option<&IntervalStats> {
        self.snapshot.stats.as_ref()
    }

    fn ensure_frame_figure(&mut self) {
        let mut flags = self.dirty.get();
        if !flags.frame {
            return;
        }
        self.snapshot.frame_figure = self.session.as_ref().map(|session| {
            figure_from_frame(&session.render_frame(), MAX_FRAME_POINTS, self.marker_radius)
        });
        flags.frame = false;
        self.dirty.set(flags);
    }

    fn ensure_interval_figure(&mut self) {
        let mut flags = self.dirty.get();
        if !flags.intervals {
            return;
        }
        self.snapshot.interval_figure = self.session.as_ref().map(|session| {
            let viewport = session.viewport();
            figure_from_intervals(
                &session.intervals(),
                viewport.signal_length(),
                viewport.sampling_rate(),
            )
        });
        flags.intervals = false;
        self.dirty.set(flags);
    }

    fn ensure_stats(&mut self) {
        let mut flags = self.dirty.get();
        if !flags.stats {
            return;
        }
        self.snapshot.stats = self.session.as_ref().map(Session::interval_stats);
        flags.stats = false;
        self.dirty.set(flags);
    }

    #[cfg(test)]
    fn with_session(session: Session) -> Self {
        let mut store = Self::new(4.0);
        store.replace_session(session);
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rrmark_lib::{PanDirection, Surface};

    fn session() -> Session {
        let signal: Vec<String> = (0..1000).map(|i| ((i % 50) as f64).to_string()).collect();
        let config = EditorConfig {
            sampling_rate: 100.0,
            frame_seconds: 2.0,
            ..EditorConfig::default()
        };
        Session::from_text(&signal.join(","), Some("50,150"), Some("ecg.csv".into()), &config)
            .unwrap()
    }

    #[test]
    fn prepare_builds_every_figure() {
        let mut store = Store::with_session(session());
        store.prepare();
        assert!(store.frame_figure().is_some());
        assert!(store.interval_figure().is_some());
        assert_eq!(store.stats().map(|s| s.n), Some(1));
        assert_eq!(store.dirty.get(), DirtyFlags::default());
    }

    #[test]
    fn panning_only_invalidates_the_frame() {
        let mut store = Store::with_session(session());
        store.prepare();
        store.apply(Input::Key(PanDirection::Right));
        let flags = store.dirty.get();
        assert!(flags.frame);
        assert!(!flags.intervals);
        assert!(!flags.stats);
    }

    #[test]
    fn marker_edits_invalidate_intervals() {
        let mut store = Store::with_session(session());
        store.prepare();
        // far from both markers: adds one
        let outcome = store.apply(Input::Click {
            surface: Surface::Primary,
            x: 5399.0,
        });
        assert!(matches!(outcome, Some(Outcome::Marker { .. })));
        assert!(store.dirty.get().intervals);
        store.prepare();
        assert_eq!(store.stats().map(|s| s.n), Some(2));
    }

    #[test]
    fn rate_change_refreshes_interval_seconds() {
        let mut store = Store::with_session(session());
        store.prepare();
        let prefs = store.session().unwrap().viewport().preferences();
        let applied = store
            .apply_preferences(ViewPreferences {
                sampling_rate: 200.0,
                ..prefs
            })
            .unwrap();
        assert_eq!(applied.sampling_rate, 200.0);
        assert!(store.dirty.get().stats);
        store.prepare();
        let stats = store.stats().unwrap();
        assert!((stats.mean_s - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_store_ignores_input() {
        let mut store = Store::new(4.0);
        assert_eq!(store.apply(Input::Key(PanDirection::Left)), None);
        store.prepare();
        assert!(store.frame_figure().is_none());
    }
}
