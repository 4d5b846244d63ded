use crate::coords::{clamp_sample, pixel_to_sample};
use crate::markers::{MarkerEdit, MarkerSet, Nearest};
use crate::session::Change;
use crate::viewport::{PanDirection, Viewport};
use log::debug;
use serde::{Deserialize, Serialize};

/// Pixel distance within which a click targets an existing marker.
pub const HIT_THRESHOLD_PX: f64 = 30.0;
/// Radius of a drawn marker, used for hover hit tests.
pub const MARKER_RADIUS_PX: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    /// The zoomed signal view; clicks edit markers.
    Primary,
    /// The whole-recording RR view; clicks navigate.
    Interval,
}

/// Raw user input as delivered by the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Input {
    /// Click at horizontal offset `x` (pixels from the surface's left edge).
    Click { surface: Surface, x: f64 },
    Key(PanDirection),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Marker { edit: MarkerEdit },
    View { start_index: usize, moved: bool },
    Ignored,
}

impl Outcome {
    /// Change to broadcast, if anything observable happened.
    pub fn change(&self) -> Option<Change> {
        match self {
            Outcome::Marker { .. } => Some(Change::Markers),
            Outcome::View { moved: true, .. } => Some(Change::Viewport),
            Outcome::View { moved: false, .. } | Outcome::Ignored => None,
        }
    }
}

/// Pixel widths of the clickable surfaces. Without an interval width the
/// interval surface is considered absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceLayout {
    pub primary_width_px: u32,
    pub interval_width_px: Option<u32>,
}

/// Turns clicks and key presses into marker edits or viewport moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionResolver {
    hit_threshold_px: f64,
    marker_radius_px: f64,
    layout: SurfaceLayout,
}

impl InteractionResolver {
    pub fn new(layout: SurfaceLayout) -> Self {
        Self {
            hit_threshold_px: HIT_THRESHOLD_PX,
            marker_radius_px: MARKER_RADIUS_PX,
            layout,
        }
    }

    pub fn with_hit_threshold(mut self, pixels: f64) -> Self {
        self.hit_threshold_px = pixels.max(0.0);
        self
    }

    pub fn with_marker_radius(mut self, pixels: f64) -> Self {
        self.marker_radius_px = pixels.max(0.0);
        self
    }

    pub fn set_layout(&mut self, layout: SurfaceLayout) {
        self.layout = layout;
    }

    pub fn layout(&self) -> SurfaceLayout {
        self.layout
    }

    pub fn hit_threshold_px(&self) -> f64 {
        self.hit_threshold_px
    }

    pub fn marker_radius_px(&self) -> f64 {
        self.marker_radius_px
    }

    pub fn resolve(&self, input: Input, markers: &mut MarkerSet, viewport: &mut Viewport) -> Outcome {
        let outcome = match input {
            Input::Click {
                surface: Surface::Primary,
                x,
            } => {
                let sample = self.primary_sample(x, viewport);
                let edit = markers.toggle(
                    sample,
                    self.hit_threshold_px,
                    viewport.window(),
                    self.layout.primary_width_px,
                );
                Outcome::Marker { edit }
            }
            Input::Click {
                surface: Surface::Interval,
                x,
            } => match self.interval_sample(x, viewport) {
                Some(sample) => {
                    let moved = viewport.center_on(sample);
                    Outcome::View {
                        start_index: viewport.start_index(),
                        moved,
                    }
                }
                None => Outcome::Ignored,
            },
            Input::Key(direction) => {
                let moved = viewport.shift_half_frame(direction);
                Outcome::View {
                    start_index: viewport.start_index(),
                    moved,
                }
            }
        };
        debug!("{input:?} -> {outcome:?}");
        outcome
    }

    /// Sample under `x` on the primary surface, clamped into the signal.
    pub fn primary_sample(&self, x: f64, viewport: &Viewport) -> usize {
        let raw = pixel_to_sample(x, viewport.window(), self.layout.primary_width_px);
        clamp_sample(raw, viewport.signal_length())
    }

    /// Sample under `x` on the interval surface, which always spans the
    /// whole recording. `None` when the layout has no interval surface.
    pub fn interval_sample(&self, x: f64, viewport: &Viewport) -> Option<usize> {
        let Some(width) = self.layout.interval_width_px else {
            debug!("interval surface absent, ignoring click at {x}");
            return None;
        };
        let raw = pixel_to_sample(x, viewport.full_window(), width);
        Some(clamp_sample(raw, viewport.signal_length()))
    }

    /// Marker drawn under the pointer at `x` on the primary surface.
    pub fn hovered_marker(&self, x: f64, markers: &MarkerSet, viewport: &Viewport) -> Option<usize> {
        let sample = self.primary_sample(x, viewport);
        match markers.find_nearest(
            sample,
            self.marker_radius_px,
            viewport.window(),
            self.layout.primary_width_px,
        ) {
            Nearest::Hit { sample, .. } => Some(sample),
            Nearest::Miss { .. } => None,
        }
    }
}
