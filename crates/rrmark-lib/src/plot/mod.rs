use crate::coords::PlotRange;
use crate::intervals::IntervalSeries;
use crate::session::RenderFrame;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
    pub range: Option<PlotRange>,
}

impl Axis {
    fn new(label: &str, range: Option<PlotRange>) -> Self {
        Self {
            label: Some(label.into()),
            range,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(&self) -> [u8; 3] {
        [
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        ]
    }
}

pub const SIGNAL_COLOR: Color = Color(0x000000);
pub const MARKER_COLOR: Color = Color(0x0E47D6);
pub const INTERVAL_COLOR: Color = Color(0x860010);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

/// Filled circles; `style.width` is the radius.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Markers(MarkerSeries),
}

/// Backend-neutral plot description. Axis ranges are always set by the
/// builders in this module so backends never have to derive them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis {
                label: None,
                range: None,
            },
            y: Axis {
                label: None,
                range: None,
            },
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points || max_points == 0 {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

/// Primary view: the visible slice against sample index, plus its markers.
pub fn figure_from_frame(frame: &RenderFrame<'_>, max_points: usize, marker_radius: f32) -> Figure {
    let points: Vec<[f64; 2]> = frame
        .samples
        .iter()
        .enumerate()
        .map(|(i, &value)| [(frame.window.start + i) as f64, value])
        .collect();
    let mut fig = Figure::new(Some("Signal".to_string()));
    fig.x = Axis::new(
        "sample",
        Some(PlotRange::exact(
            frame.window.start as f64,
            frame.window.end() as f64,
        )),
    );
    fig.y = Axis::new("amplitude", frame.value_range());
    fig.add_series(Series::Line(LineSeries {
        name: "signal".into(),
        points: decimate_points(&points, max_points),
        style: Style {
            width: 1.0,
            color: SIGNAL_COLOR,
        },
    }));
    fig.add_series(Series::Markers(MarkerSeries {
        name: "markers".into(),
        points: frame.marker_points(),
        style: Style {
            width: marker_radius,
            color: MARKER_COLOR,
        },
    }));
    fig
}

/// Interval view: RR gaps in seconds over the whole recording.
pub fn figure_from_intervals(series: &IntervalSeries, signal_length: usize, fs: f64) -> Figure {
    let points: Vec<[f64; 2]> = series
        .points
        .iter()
        .map(|p| [p.position as f64, p.gap as f64 / fs])
        .collect();
    let mut fig = Figure::new(Some("RR intervals".to_string()));
    fig.x = Axis::new("sample", Some(PlotRange::exact(1.0, signal_length as f64)));
    fig.y = Axis::new("RR (s)", series.gap_range(fs));
    fig.add_series(Series::Line(LineSeries {
        name: "RR".into(),
        points,
        style: Style {
            width: 1.0,
            color: INTERVAL_COLOR,
        },
    }));
    fig
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::MarkerSet;
    use crate::viewport::SampleWindow;

    #[test]
    fn decimation_caps_point_count() {
        let points: Vec<[f64; 2]> = (0..1000).map(|i| [i as f64, 0.0]).collect();
        assert_eq!(decimate_points(&points, 100).len(), 100);
        assert_eq!(decimate_points(&points, 5000).len(), 1000);
    }

    #[test]
    fn frame_figure_positions_points_by_sample() {
        let samples = [1.0, 2.0, 3.0, 2.0];
        let markers = [12];
        let frame = RenderFrame {
            window: SampleWindow::new(10, 4),
            samples: &samples,
            markers: &markers,
        };
        let fig = figure_from_frame(&frame, 100, 20.0);
        let x = fig.x.range.unwrap();
        assert_eq!((x.min, x.max), (10.0, 13.0));
        match &fig.series[1] {
            Series::Markers(m) => assert_eq!(m.points, vec![[12.0, 3.0]]),
            other => panic!("unexpected series {other:?}"),
        }
    }

    #[test]
    fn interval_figure_spans_recording() {
        let series = IntervalSeries::from_markers(&MarkerSet::from_indices(vec![1, 201, 451]));
        let fig = figure_from_intervals(&series, 1000, 250.0);
        let x = fig.x.range.unwrap();
        assert_eq!((x.min, x.max), (1.0, 1000.0));
        match &fig.series[0] {
            Series::Line(line) => assert_eq!(line.points, vec![[201.0, 0.8], [451.0, 1.0]]),
            other => panic!("unexpected series {other:?}"),
        }
        let y = fig.y.range.unwrap();
        assert!(y.min < 0.8 && y.max > 1.0);
    }

    #[test]
    fn color_splits_channels() {
        assert_eq!(MARKER_COLOR.rgb(), [0x0E, 0x47, 0xD6]);
    }
}
