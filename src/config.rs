//! Configuration for the hands-free pipelines
//!
//! Loaded from a TOML file; every section falls back to its defaults so a
//! partial file (or none at all) is valid.

use crate::error::Result;
use crate::types::ScreenSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DWELL_RANGE: RangeInclusive<f64> = 0.2..=3.0;
pub const MOVE_THRESHOLD_RANGE: RangeInclusive<u32> = 1..=100;
pub const ALPHA_RANGE: RangeInclusive<f64> = 0.01..=0.99;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f64 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandsfreeConfig {
    pub capture: CaptureConfig,
    pub feed: FeedConfig,
    pub screen: ScreenConfig,
    pub gaze: GazeSettings,
    pub hand: HandSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device index
    pub camera_index: i32,
    /// Pipeline tick period
    pub tick_ms: u64,
    /// Frame size used when no camera is attached
    pub frame_width: u32,
    pub frame_height: u32,
    /// Open a real camera (needs the `vision` feature)
    pub use_camera: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            tick_ms: 30,
            frame_width: 640,
            frame_height: 480,
            use_camera: false,
        }
    }
}

impl CaptureConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Where the external landmark estimator publishes its results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub face_addr: SocketAddr,
    pub hand_addr: SocketAddr,
    /// Landmark sets older than this count as "nothing detected"
    pub stale_after_ms: u64,
    /// Flip x when the estimator ran on un-mirrored frames
    pub mirror_x: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            face_addr: SocketAddr::from(([127, 0, 0, 1], 5005)),
            hand_addr: SocketAddr::from(([127, 0, 0, 1], 5006)),
            stale_after_ms: 150,
            mirror_x: false,
        }
    }
}

/// Optional override of the display size reported by the pointer driver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ScreenConfig {
    pub fn resolve(&self, reported: ScreenSize) -> ScreenSize {
        ScreenSize {
            width: self.width.unwrap_or(reported.width),
            height: self.height.unwrap_or(reported.height),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeSettings {
    /// Seconds the gaze has to settle before a dwell click
    pub dwell_secs: f64,
    /// Pixel distance under which the gaze counts as settled
    pub move_threshold_px: u32,
    /// Floor of the adaptive smoothing factor
    pub smoothing_alpha: f64,
    /// EAR below which the eyes count as closed
    pub blink_threshold: f64,
    /// Max gap between two blinks of a double blink
    pub double_blink_window_secs: f64,
    /// Gaze updates are suppressed this long after any blink
    pub ignore_after_blink_secs: f64,
    /// Single blink clicks once calibrated
    pub blink_click: bool,
    /// Animation time of smoothed cursor moves
    pub move_duration_ms: u64,
}

impl Default for GazeSettings {
    fn default() -> Self {
        Self {
            dwell_secs: 1.0,
            move_threshold_px: 20,
            smoothing_alpha: 0.3,
            blink_threshold: 0.21,
            double_blink_window_secs: 0.5,
            ignore_after_blink_secs: 0.3,
            blink_click: true,
            move_duration_ms: 80,
        }
    }
}

impl GazeSettings {
    pub fn set_dwell(&mut self, secs: f64) {
        self.dwell_secs = secs.clamp(*DWELL_RANGE.start(), *DWELL_RANGE.end());
    }

    pub fn set_move_threshold(&mut self, px: u32) {
        self.move_threshold_px = px.clamp(*MOVE_THRESHOLD_RANGE.start(), *MOVE_THRESHOLD_RANGE.end());
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.smoothing_alpha = alpha.clamp(*ALPHA_RANGE.start(), *ALPHA_RANGE.end());
    }

    pub fn move_duration(&self) -> Duration {
        Duration::from_millis(self.move_duration_ms)
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        check_range("gaze.dwell_secs", self.dwell_secs, &DWELL_RANGE)?;
        check_range(
            "gaze.move_threshold_px",
            self.move_threshold_px as f64,
            &(*MOVE_THRESHOLD_RANGE.start() as f64..=*MOVE_THRESHOLD_RANGE.end() as f64),
        )?;
        check_range("gaze.smoothing_alpha", self.smoothing_alpha, &ALPHA_RANGE)?;
        check_positive("gaze.blink_threshold", self.blink_threshold)?;
        check_positive("gaze.double_blink_window_secs", self.double_blink_window_secs)?;
        if self.ignore_after_blink_secs < 0.0 {
            return Err(ConfigError::NotPositive {
                field: "gaze.ignore_after_blink_secs",
                value: self.ignore_after_blink_secs,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandSettings {
    /// Thumb-index pixel distance below which the button is held
    pub click_threshold_px: f64,
    /// Normalized index-middle distance below which scrolling is active
    pub scroll_pinch_threshold: f64,
    /// Wheel clicks per unit of normalized vertical motion
    pub scroll_gain: f64,
    /// Hands reported below this score are ignored
    pub min_hand_score: f32,
}

impl Default for HandSettings {
    fn default() -> Self {
        Self {
            click_threshold_px: 40.0,
            scroll_pinch_threshold: 0.05,
            scroll_gain: 100.0,
            min_hand_score: 0.5,
        }
    }
}

impl HandSettings {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        check_positive("hand.click_threshold_px", self.click_threshold_px)?;
        check_positive("hand.scroll_pinch_threshold", self.scroll_pinch_threshold)?;
        check_positive("hand.scroll_gain", self.scroll_gain)?;
        check_range("hand.min_hand_score", self.min_hand_score as f64, &(0.0..=1.0))
    }
}

impl HandsfreeConfig {
    /// Read and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: HandsfreeConfig = toml::from_str(&raw)?;
        config.validate()?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        check_positive("capture.tick_ms", self.capture.tick_ms as f64)?;
        check_positive("capture.frame_width", self.capture.frame_width as f64)?;
        check_positive("capture.frame_height", self.capture.frame_height as f64)?;
        self.gaze.validate()?;
        self.hand.validate()
    }

    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn check_range(
    field: &'static str,
    value: f64,
    range: &RangeInclusive<f64>,
) -> std::result::Result<(), ConfigError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

fn check_positive(field: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = HandsfreeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture.tick_ms, 30);
        assert_eq!(config.gaze.move_threshold_px, 20);
        assert!((config.hand.scroll_pinch_threshold - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gaze]\ndwell_secs = 1.5\n\n[hand]\nclick_threshold_px = 30.0").unwrap();

        let config = HandsfreeConfig::load(file.path()).unwrap();
        assert!((config.gaze.dwell_secs - 1.5).abs() < 1e-12);
        assert!((config.gaze.smoothing_alpha - 0.3).abs() < 1e-12);
        assert!((config.hand.click_threshold_px - 30.0).abs() < 1e-12);
        assert_eq!(config.capture, CaptureConfig::default());
    }

    #[test]
    fn test_out_of_range_dwell_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gaze]\ndwell_secs = 5.0").unwrap();

        let err = HandsfreeConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("gaze.dwell_secs"));
    }

    #[test]
    fn test_setters_clamp_into_range() {
        let mut gaze = GazeSettings::default();
        gaze.set_dwell(10.0);
        gaze.set_move_threshold(0);
        gaze.set_alpha(1.5);
        assert!((gaze.dwell_secs - 3.0).abs() < 1e-12);
        assert_eq!(gaze.move_threshold_px, 1);
        assert!((gaze.smoothing_alpha - 0.99).abs() < 1e-12);
    }

    #[test]
    fn test_screen_override() {
        let screen = ScreenConfig {
            width: Some(2560),
            height: None,
        };
        let resolved = screen.resolve(ScreenSize::default());
        assert_eq!(resolved, ScreenSize { width: 2560, height: 1080 });
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let config = HandsfreeConfig::default();
        let text = config.to_toml().unwrap();
        let parsed: HandsfreeConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
