use crate::coords::PlotRange;
use crate::markers::MarkerSet;
use serde::{Deserialize, Serialize};

/// Gap between a marker and its predecessor, placed at the later marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalPoint {
    pub position: usize,
    pub gap: usize,
}

/// RR intervals in samples. Derived from a [`MarkerSet`]; rebuild it after
/// every edit rather than keeping one around.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalSeries {
    pub points: Vec<IntervalPoint>,
}

impl IntervalSeries {
    pub fn from_markers(markers: &MarkerSet) -> Self {
        let points = markers
            .as_slice()
            .windows(2)
            .map(|w| IntervalPoint {
                position: w[1],
                gap: w[1] - w[0],
            })
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn gaps_seconds(&self, fs: f64) -> Vec<f64> {
        self.points.iter().map(|p| p.gap as f64 / fs).collect()
    }

    /// Padded range of the gaps in seconds, `None` when there are none.
    pub fn gap_range(&self, fs: f64) -> Option<PlotRange> {
        PlotRange::padded(self.gaps_seconds(fs))
    }
}

/// Time-domain summary of an interval series, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalStats {
    pub n: usize,
    pub mean_s: f64,
    pub sdnn_s: f64,
    pub rmssd_s: f64,
    pub pnn50: f64,
}

/// Successive RR differences larger than this count towards pNN50.
const PNN50_THRESHOLD_S: f64 = 0.050;

pub fn interval_stats(series: &IntervalSeries, fs: f64) -> IntervalStats {
    let rr = series.gaps_seconds(fs);
    if rr.is_empty() {
        return IntervalStats::default();
    }
    let n = rr.len();
    let mean_s = rr.iter().sum::<f64>() / n as f64;
    let successive: Vec<f64> = rr.windows(2).map(|w| w[1] - w[0]).collect();
    if successive.is_empty() {
        return IntervalStats {
            n,
            mean_s,
            ..IntervalStats::default()
        };
    }
    // n - 1 for both the sample deviation and the successive differences
    let dof = successive.len() as f64;
    let sum_sq_dev: f64 = rr.iter().map(|x| (x - mean_s).powi(2)).sum();
    let sum_sq_diff: f64 = successive.iter().map(|d| d * d).sum();
    let large = successive
        .iter()
        .filter(|d| d.abs() > PNN50_THRESHOLD_S)
        .count();
    IntervalStats {
        n,
        mean_s,
        sdnn_s: (sum_sq_dev / dof).sqrt(),
        rmssd_s: (sum_sq_diff / dof).sqrt(),
        pnn50: large as f64 / dof,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn length_is_marker_count_minus_one() {
        for n in 0..6usize {
            let markers = MarkerSet::from_indices((1..=n).map(|i| i * 100).collect());
            assert_eq!(IntervalSeries::from_markers(&markers).len(), n.saturating_sub(1));
        }
    }

    #[test]
    fn gaps_are_placed_at_later_marker() {
        let markers = MarkerSet::from_indices(vec![100, 300, 550]);
        let series = IntervalSeries::from_markers(&markers);
        assert_eq!(
            series.points,
            vec![
                IntervalPoint {
                    position: 300,
                    gap: 200
                },
                IntervalPoint {
                    position: 550,
                    gap: 250
                },
            ]
        );
        assert_eq!(series.gaps_seconds(250.0), vec![0.8, 1.0]);
    }

    #[test]
    fn single_interval_range_is_widened() {
        let series = IntervalSeries::from_markers(&MarkerSet::from_indices(vec![10, 20]));
        let range = series.gap_range(100.0).unwrap();
        assert!(range.min < 0.1 && range.max > 0.1);
        assert!(IntervalSeries::default().gap_range(100.0).is_none());
    }

    #[test]
    fn stats_match_hand_computation() {
        // gaps of 0.6 s, 0.8 s and 0.6 s at 100 Hz
        let markers = MarkerSet::from_indices(vec![1, 61, 141, 201]);
        let stats = interval_stats(&IntervalSeries::from_markers(&markers), 100.0);
        assert_eq!(stats.n, 3);
        assert_close(stats.mean_s, 2.0 / 3.0);
        assert_close(stats.sdnn_s, 0.11547005383792516);
        assert_close(stats.rmssd_s, 0.2);
        assert_close(stats.pnn50, 1.0);
    }

    #[test]
    fn single_interval_has_mean_only() {
        let markers = MarkerSet::from_indices(vec![100, 300]);
        let stats = interval_stats(&IntervalSeries::from_markers(&markers), 200.0);
        assert_eq!(stats.n, 1);
        assert_close(stats.mean_s, 1.0);
        assert_eq!(stats.sdnn_s, 0.0);
        assert_eq!(stats.rmssd_s, 0.0);
        assert_eq!(stats.pnn50, 0.0);
    }

    #[test]
    fn stats_of_empty_series_are_zero() {
        let stats = interval_stats(&IntervalSeries::default(), 250.0);
        assert_eq!(stats.n, 0);
        assert_eq!(stats.mean_s, 0.0);
        assert_eq!(stats.sdnn_s, 0.0);
    }
}
