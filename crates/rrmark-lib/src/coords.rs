//! Pure mappings between sample indices, surface pixels and plot values.

use crate::viewport::SampleWindow;
use serde::{Deserialize, Serialize};

/// Whitespace added above and below a plotted range, as a fraction of it.
pub const PADDING_FRACTION: f64 = 0.04;
/// Absolute padding applied when a range collapses to a single value.
pub const FLAT_PADDING: f64 = 0.5;

// Largest pixel offset on a surface; surfaces narrower than two pixels are
// treated as two pixels wide.
fn pixel_span(pixel_extent: u32) -> f64 {
    f64::from(pixel_extent.max(2) - 1)
}

/// Horizontal position of `sample` on a surface spanning
/// `[domain_min, domain_max]`.
///
/// Callers keep `domain_max > domain_min` (see [`PlotRange::exact`]); a
/// degenerate domain maps everything to pixel 0.
pub fn sample_to_pixel(sample: f64, domain_min: f64, domain_max: f64, pixel_extent: u32) -> i64 {
    let width = domain_max - domain_min;
    if width.is_nan() || width <= 0.0 {
        return 0;
    }
    ((sample - domain_min) / width * pixel_span(pixel_extent)).round() as i64
}

/// Sample index under `pixel` when `window` is stretched over the surface.
/// The result may fall outside the signal; see [`clamp_sample`].
pub fn pixel_to_sample(pixel: f64, window: SampleWindow, pixel_extent: u32) -> i64 {
    let offset = (pixel / pixel_span(pixel_extent) * window.length as f64).round();
    offset as i64 + window.start as i64
}

pub fn clamp_sample(sample: i64, signal_length: usize) -> usize {
    sample.clamp(1, signal_length.max(1) as i64) as usize
}

/// Vertical position of `value`, larger values towards pixel 0.
pub fn value_to_pixel(value: f64, range: PlotRange, pixel_extent: u32) -> i64 {
    ((1.0 - range.normalize(value)) * pixel_span(pixel_extent)).round() as i64
}

/// A value range with `max > min`, safe to divide by.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotRange {
    pub min: f64,
    pub max: f64,
}

impl PlotRange {
    /// Range spanning exactly `[min, max]`, widened by [`FLAT_PADDING`] when
    /// the two coincide.
    pub fn exact(min: f64, max: f64) -> Self {
        if max > min {
            Self { min, max }
        } else {
            Self {
                min: min - FLAT_PADDING,
                max: min + FLAT_PADDING,
            }
        }
    }

    /// Bounds of the finite `values`, padded on both sides.
    pub fn padded<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let (lo, hi) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if lo > hi {
            return None;
        }
        let pad = (hi - lo) * PADDING_FRACTION;
        if pad > 0.0 {
            Some(Self {
                min: lo - pad,
                max: hi + pad,
            })
        } else {
            Some(Self::exact(lo, hi))
        }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.min) / self.width()
    }
}
