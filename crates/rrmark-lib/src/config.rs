use crate::error::{AnnotateError, Result};
use crate::io::export::DEFAULT_EXPORT_TAG;
use crate::resolver::{SurfaceLayout, HIT_THRESHOLD_PX, MARKER_RADIUS_PX};
use crate::viewport::{ViewPreferences, DEFAULT_SAMPLING_RATE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Editor settings, typically read from a TOML file. Missing keys fall back
/// to [`EditorConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub sampling_rate: f64,
    pub frame_seconds: f64,
    pub start_seconds: f64,
    pub hit_threshold_px: f64,
    pub marker_radius_px: f64,
    pub primary_width_px: u32,
    pub interval_view: bool,
    pub interval_width_px: u32,
    pub export_tag: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            sampling_rate: DEFAULT_SAMPLING_RATE,
            frame_seconds: 10.0,
            start_seconds: 0.0,
            hit_threshold_px: HIT_THRESHOLD_PX,
            marker_radius_px: MARKER_RADIUS_PX,
            primary_width_px: 5400,
            interval_view: true,
            interval_width_px: 5400,
            export_tag: DEFAULT_EXPORT_TAG.into(),
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| AnnotateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| AnnotateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn preferences(&self) -> ViewPreferences {
        ViewPreferences {
            sampling_rate: self.sampling_rate,
            frame_seconds: self.frame_seconds,
            start_seconds: self.start_seconds,
        }
    }

    pub fn layout(&self) -> SurfaceLayout {
        SurfaceLayout {
            primary_width_px: self.primary_width_px,
            interval_width_px: self.interval_view.then_some(self.interval_width_px),
        }
    }

    // Viewport values are clamped later; only the settings that have no
    // sensible clamp are rejected here.
    fn validate(&self) -> Result<()> {
        if self.primary_width_px < 2 {
            return Err(AnnotateError::Config(
                "primary_width_px must be at least 2".into(),
            ));
        }
        if self.interval_view && self.interval_width_px < 2 {
            return Err(AnnotateError::Config(
                "interval_width_px must be at least 2".into(),
            ));
        }
        if !(self.hit_threshold_px.is_finite() && self.hit_threshold_px >= 0.0) {
            return Err(AnnotateError::Config(
                "hit_threshold_px must be a non-negative number".into(),
            ));
        }
        if self.export_tag.contains(['/', '\\']) {
            return Err(AnnotateError::Config(
                "export_tag must not contain path separators".into(),
            ));
        }
        Ok(())
    }
}
