use crate::error::{AnnotateError, Result};
use crate::viewport::SampleWindow;
use serde::Serialize;

/// Immutable sample sequence, addressed 1-based by the rest of the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    samples: Vec<f64>,
}

impl Signal {
    pub fn new(samples: Vec<f64>) -> Result<Self> {
        if samples.is_empty() {
            return Err(AnnotateError::InvalidSignal("no samples".into()));
        }
        if let Some(pos) = samples.iter().position(|v| !v.is_finite()) {
            return Err(AnnotateError::InvalidSignal(format!(
                "sample {} is not a finite number",
                pos + 1
            )));
        }
        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Value at a 1-based sample index.
    pub fn value_at(&self, sample: usize) -> Option<f64> {
        sample
            .checked_sub(1)
            .and_then(|idx| self.samples.get(idx))
            .copied()
    }

    /// Samples covered by `window`, truncated at the signal end.
    pub fn window(&self, window: SampleWindow) -> &[f64] {
        let lo = window.start.saturating_sub(1).min(self.samples.len());
        let hi = window.end().min(self.samples.len()).max(lo);
        &self.samples[lo..hi]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_non_finite() {
        assert!(matches!(
            Signal::new(Vec::new()),
            Err(AnnotateError::InvalidSignal(_))
        ));
        assert!(matches!(
            Signal::new(vec![1.0, f64::NAN]),
            Err(AnnotateError::InvalidSignal(_))
        ));
    }

    #[test]
    fn window_is_one_based() {
        let signal = Signal::new(vec![10.0, 11.0, 12.0, 13.0, 14.0]).unwrap();
        assert_eq!(signal.window(SampleWindow::new(2, 3)), &[11.0, 12.0, 13.0]);
        assert_eq!(signal.value_at(1), Some(10.0));
        assert_eq!(signal.value_at(0), None);
        assert_eq!(signal.value_at(6), None);
    }
}
