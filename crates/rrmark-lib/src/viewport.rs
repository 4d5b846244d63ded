use crate::error::{AnnotateError, Result};
use log::debug;
use serde::{Deserialize, Serialize};

/// Sampling rate used until a valid one is supplied (Hz).
pub const DEFAULT_SAMPLING_RATE: f64 = 250.0;

/// Contiguous, inclusive range of 1-based sample indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleWindow {
    pub start: usize,
    pub length: usize,
}

impl SampleWindow {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// Last sample inside the window.
    pub fn end(&self) -> usize {
        (self.start + self.length).saturating_sub(1)
    }
}

/// Display preferences in seconds, as typed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewPreferences {
    pub sampling_rate: f64,
    pub frame_seconds: f64,
    pub start_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanDirection {
    Left,
    Right,
}

/// Visible window over a signal of fixed length.
///
/// Invariant: `1 <= frame_length <= signal_length` and
/// `1 <= start_index <= signal_length - frame_length + 1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Viewport {
    sampling_rate: f64,
    frame_length: usize,
    start_index: usize,
    signal_length: usize,
}

impl Viewport {
    pub fn new(signal_length: usize, prefs: ViewPreferences) -> Result<Self> {
        if signal_length < 1 {
            return Err(AnnotateError::InvalidSignal(
                "viewport needs at least one sample".into(),
            ));
        }
        let mut viewport = Self {
            sampling_rate: DEFAULT_SAMPLING_RATE,
            frame_length: signal_length,
            start_index: 1,
            signal_length,
        };
        viewport.apply_preferences(prefs.sampling_rate, prefs.frame_seconds, prefs.start_seconds);
        Ok(viewport)
    }

    /// Clamp a preference request into a valid window and return the
    /// preferences that are actually in force.
    pub fn apply_preferences(
        &mut self,
        sampling_rate: f64,
        frame_seconds: f64,
        start_seconds: f64,
    ) -> ViewPreferences {
        if sampling_rate.is_finite() && sampling_rate > 0.0 {
            self.sampling_rate = sampling_rate;
        } else {
            debug!(
                "ignoring sampling rate {sampling_rate}, keeping {}",
                self.sampling_rate
            );
        }
        let rate = self.sampling_rate;
        let min_frame = round_to_i64(rate).max(1);
        let frame = round_to_i64(frame_seconds * rate)
            .max(min_frame)
            .min(self.signal_length as i64);
        self.frame_length = frame as usize;
        self.start_index = self.clamp_start(round_to_i64(start_seconds * rate).saturating_add(1));
        self.preferences()
    }

    /// Shift the window by `delta` samples; returns whether it moved.
    pub fn pan_by(&mut self, delta: i64) -> bool {
        let next = self.clamp_start((self.start_index as i64).saturating_add(delta));
        let moved = next != self.start_index;
        self.start_index = next;
        moved
    }

    pub fn shift_half_frame(&mut self, direction: PanDirection) -> bool {
        let half = self.half_frame();
        match direction {
            PanDirection::Left => self.pan_by(-half),
            PanDirection::Right => self.pan_by(half),
        }
    }

    /// Recenter so that `sample` sits half a frame from the window start.
    pub fn center_on(&mut self, sample: usize) -> bool {
        let target = sample as i64 - self.half_frame();
        self.pan_by(target - self.start_index as i64)
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn signal_length(&self) -> usize {
        self.signal_length
    }

    pub fn window(&self) -> SampleWindow {
        SampleWindow::new(self.start_index, self.frame_length)
    }

    /// The whole recording as a window.
    pub fn full_window(&self) -> SampleWindow {
        SampleWindow::new(1, self.signal_length)
    }

    pub fn preferences(&self) -> ViewPreferences {
        ViewPreferences {
            sampling_rate: self.sampling_rate,
            frame_seconds: self.frame_length as f64 / self.sampling_rate,
            start_seconds: (self.start_index - 1) as f64 / self.sampling_rate,
        }
    }

    fn max_start(&self) -> i64 {
        (self.signal_length - self.frame_length + 1) as i64
    }

    fn clamp_start(&self, start: i64) -> usize {
        start.clamp(1, self.max_start()) as usize
    }

    fn half_frame(&self) -> i64 {
        round_to_i64(self.frame_length as f64 / 2.0)
    }
}

// `as` saturates and maps NaN to zero, which the callers clamp anyway.
fn round_to_i64(value: f64) -> i64 {
    value.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs(sampling_rate: f64, frame_seconds: f64, start_seconds: f64) -> ViewPreferences {
        ViewPreferences {
            sampling_rate,
            frame_seconds,
            start_seconds,
        }
    }

    #[test]
    fn empty_signal_cannot_be_viewed() {
        assert!(matches!(
            Viewport::new(0, prefs(200.0, 10.0, 0.0)),
            Err(AnnotateError::InvalidSignal(_))
        ));
    }

    #[test]
    fn frame_longer_than_signal_is_clamped() {
        let mut vp = Viewport::new(2000, prefs(200.0, 5.0, 3.0)).unwrap();
        let applied = vp.apply_preferences(200.0, 60.0, 3.0);
        assert_eq!(vp.frame_length(), 2000);
        assert_eq!(vp.start_index(), 1);
        assert_eq!(applied.frame_seconds, 10.0);
        assert_eq!(applied.start_seconds, 0.0);
    }

    #[test]
    fn frame_is_at_least_one_second() {
        let mut vp = Viewport::new(2000, prefs(200.0, 5.0, 0.0)).unwrap();
        vp.apply_preferences(200.0, 0.1, 0.0);
        assert_eq!(vp.frame_length(), 200);
    }

    #[test]
    fn one_second_floor_never_exceeds_signal() {
        let vp = Viewport::new(50, prefs(200.0, 0.1, 0.0)).unwrap();
        assert_eq!(vp.frame_length(), 50);
        assert_eq!(vp.start_index(), 1);
    }

    #[test]
    fn start_past_the_end_is_clamped() {
        let mut vp = Viewport::new(2000, prefs(200.0, 2.0, 0.0)).unwrap();
        let applied = vp.apply_preferences(200.0, 2.0, 100.0);
        assert_eq!(vp.start_index(), 2000 - 400 + 1);
        assert_eq!(vp.window().end(), 2000);
        assert_eq!(applied.start_seconds, 1600.0 / 200.0);
    }

    #[test]
    fn negative_start_is_clamped_to_first_sample() {
        let vp = Viewport::new(2000, prefs(200.0, 2.0, -4.0)).unwrap();
        assert_eq!(vp.start_index(), 1);
    }

    #[test]
    fn apply_preferences_is_idempotent() {
        let mut vp = Viewport::new(2000, prefs(200.0, 1.0, 0.0)).unwrap();
        let first = vp.apply_preferences(173.0, 3.3, 4.71);
        let state = vp.clone();
        let second = vp.apply_preferences(173.0, 3.3, 4.71);
        assert_eq!(first, second);
        assert_eq!(state, vp);
        let third = vp.apply_preferences(first.sampling_rate, first.frame_seconds, first.start_seconds);
        assert_eq!(third, first);
    }

    #[test]
    fn invalid_sampling_rate_keeps_previous() {
        let mut vp = Viewport::new(2000, prefs(200.0, 2.0, 0.0)).unwrap();
        vp.apply_preferences(-1.0, 2.0, 0.0);
        assert_eq!(vp.sampling_rate(), 200.0);
        vp.apply_preferences(f64::NAN, 2.0, 0.0);
        assert_eq!(vp.sampling_rate(), 200.0);
    }

    #[test]
    fn half_frame_shifts_stop_at_boundaries() {
        let mut vp = Viewport::new(1000, prefs(100.0, 3.0, 0.0)).unwrap();
        assert!(!vp.shift_half_frame(PanDirection::Left));
        assert!(vp.shift_half_frame(PanDirection::Right));
        assert_eq!(vp.start_index(), 151);
        for _ in 0..10 {
            vp.shift_half_frame(PanDirection::Right);
        }
        assert_eq!(vp.start_index(), 701);
        assert!(!vp.shift_half_frame(PanDirection::Right));
    }

    #[test]
    fn center_on_places_sample_mid_window() {
        let mut vp = Viewport::new(2000, prefs(200.0, 2.0, 0.0)).unwrap();
        assert!(vp.center_on(1000));
        assert_eq!(vp.start_index(), 800);
        vp.center_on(10);
        assert_eq!(vp.start_index(), 1);
        vp.center_on(1990);
        assert_eq!(vp.start_index(), 1601);
    }

    #[test]
    fn window_end_is_inclusive() {
        let window = SampleWindow::new(10, 5);
        assert_eq!(window.end(), 14);
        assert_eq!(SampleWindow::new(1, 0).end(), 0);
    }
}
