use crate::viewport::SampleWindow;
use serde::{Deserialize, Serialize};

/// Where an added marker landed relative to the existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// The set was empty.
    First,
    Prepend,
    Append,
    Insert,
}

/// Mutation performed by [`MarkerSet::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MarkerEdit {
    Added {
        sample: usize,
        position: usize,
        placement: Placement,
    },
    Removed {
        sample: usize,
        position: usize,
    },
}

/// Result of a threshold hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nearest {
    Hit { position: usize, sample: usize },
    Miss { insert_at: usize },
}

/// Convert a pixel distance into a sample distance at the current zoom.
pub fn sample_threshold(pixel_threshold: f64, window: SampleWindow, pixel_extent: u32) -> f64 {
    let span = f64::from(pixel_extent.max(2) - 1);
    pixel_threshold.max(0.0) * window.length as f64 / span
}

/// Strictly increasing list of 1-based marker sample indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MarkerSet {
    indices: Vec<usize>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an arbitrary list, sorting and dropping duplicates.
    pub fn from_indices(mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    pub fn first(&self) -> Option<usize> {
        self.indices.first().copied()
    }

    pub fn last(&self) -> Option<usize> {
        self.indices.last().copied()
    }

    /// First marker (scanning left to right) within `pixel_threshold` of
    /// `sample`, or the position where `sample` would be inserted.
    pub fn find_nearest(
        &self,
        sample: usize,
        pixel_threshold: f64,
        window: SampleWindow,
        pixel_extent: u32,
    ) -> Nearest {
        self.scan(sample, sample_threshold(pixel_threshold, window, pixel_extent))
    }

    /// Resolve a click at `sample` into an add or a remove.
    ///
    /// Clicks beyond either end of the set (by more than the threshold)
    /// always add. Anywhere else the first marker within the threshold is
    /// removed, or the sample is inserted before the first larger marker.
    pub fn toggle(
        &mut self,
        sample: usize,
        pixel_threshold: f64,
        window: SampleWindow,
        pixel_extent: u32,
    ) -> MarkerEdit {
        let radius = sample_threshold(pixel_threshold, window, pixel_extent);
        let (Some(first), Some(last)) = (self.first(), self.last()) else {
            self.indices.push(sample);
            return MarkerEdit::Added {
                sample,
                position: 0,
                placement: Placement::First,
            };
        };

        if first as f64 - sample as f64 > radius {
            self.indices.insert(0, sample);
            return MarkerEdit::Added {
                sample,
                position: 0,
                placement: Placement::Prepend,
            };
        }
        if sample as f64 - last as f64 > radius {
            self.indices.push(sample);
            return MarkerEdit::Added {
                sample,
                position: self.indices.len() - 1,
                placement: Placement::Append,
            };
        }

        match self.scan(sample, radius) {
            Nearest::Hit { position, sample } => {
                self.indices.remove(position);
                MarkerEdit::Removed { sample, position }
            }
            Nearest::Miss { insert_at } => {
                let placement = if insert_at == self.indices.len() {
                    Placement::Append
                } else {
                    Placement::Insert
                };
                self.indices.insert(insert_at, sample);
                MarkerEdit::Added {
                    sample,
                    position: insert_at,
                    placement,
                }
            }
        }
    }

    /// Insert at the sorted position; `None` if already present.
    pub fn insert(&mut self, sample: usize) -> Option<usize> {
        match self.indices.binary_search(&sample) {
            Ok(_) => None,
            Err(position) => {
                self.indices.insert(position, sample);
                Some(position)
            }
        }
    }

    /// Remove an exact sample; `None` if absent.
    pub fn remove(&mut self, sample: usize) -> Option<usize> {
        let position = self.indices.binary_search(&sample).ok()?;
        self.indices.remove(position);
        Some(position)
    }

    /// Markers inside the inclusive `window`.
    pub fn in_window(&self, window: SampleWindow) -> &[usize] {
        let lo = self.indices.partition_point(|&m| m < window.start);
        let hi = self.indices.partition_point(|&m| m <= window.end());
        &self.indices[lo..hi.max(lo)]
    }

    /// The markers in export order.
    pub fn export_sequence(&self) -> &[usize] {
        &self.indices
    }

    fn scan(&self, sample: usize, radius: f64) -> Nearest {
        for (position, &marker) in self.indices.iter().enumerate() {
            if (marker as f64 - sample as f64).abs() <= radius {
                return Nearest::Hit {
                    position,
                    sample: marker,
                };
            }
            if marker > sample {
                return Nearest::Miss {
                    insert_at: position,
                };
            }
        }
        Nearest::Miss {
            insert_at: self.indices.len(),
        }
    }
}
