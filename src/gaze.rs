//! Gaze to cursor: calibrated mapping, adaptive smoothing and dwell clicks

use crate::blink::{face_ear, BlinkDetector};
use crate::calibration::{CalibrationManager, CalibrationPoint, CalibrationUpdate};
use crate::config::GazeSettings;
use crate::types::{FaceLandmarks, GazeControl, GazeEvent, LandmarkFrame, Point2, PointerCommand, ScreenSize};
use serde::{Deserialize, Serialize};

const ALPHA_CEILING: f64 = 0.85;
/// Distance (px) at which smoothing reaches alpha 1.0 before the ceiling
const ALPHA_SPAN_PX: f64 = 300.0;

/// Iris bounding box spanned by the four corner calibration points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeMapping {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl GazeMapping {
    /// Build from calibration points; only the first four (the corners) count.
    /// Returns `None` with fewer than four points.
    pub fn from_points(points: &[CalibrationPoint]) -> Option<Self> {
        let corners = points.get(..4)?;
        let mut mapping = Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for p in corners {
            mapping.min_x = mapping.min_x.min(p.iris.x);
            mapping.max_x = mapping.max_x.max(p.iris.x);
            mapping.min_y = mapping.min_y.min(p.iris.y);
            mapping.max_y = mapping.max_y.max(p.iris.y);
        }
        Some(mapping)
    }

    /// Map a normalized iris position to integer screen pixels
    pub fn map(&self, iris: Point2, screen: ScreenSize) -> (i32, i32) {
        let ix = iris.x.max(self.min_x).min(self.max_x);
        let iy = iris.y.max(self.min_y).min(self.max_y);
        let rx = axis_ratio(ix, self.min_x, self.max_x);
        let ry = axis_ratio(iy, self.min_y, self.max_y);
        (
            (rx * screen.width.saturating_sub(1) as f64) as i32,
            (ry * screen.height.saturating_sub(1) as f64) as i32,
        )
    }
}

fn axis_ratio(v: f64, min: f64, max: f64) -> f64 {
    if max == min {
        0.5
    } else {
        (v - min) / (max - min)
    }
}

/// Smoothed cursor estimate plus dwell bookkeeping
#[derive(Debug, Clone, Default)]
pub struct GazeSmoother {
    position: Option<(i32, i32)>,
    dwell_start: f64,
    last_click: Option<f64>,
}

impl GazeSmoother {
    pub fn position(&self) -> Option<(i32, i32)> {
        self.position
    }

    pub fn reset(&mut self) {
        self.position = None;
    }

    /// Advance with a new mapped target. Returns the command to issue, if any.
    pub fn step(&mut self, target: (i32, i32), now: f64, settings: &GazeSettings) -> Option<PointerCommand> {
        let Some((sx, sy)) = self.position else {
            self.position = Some(target);
            self.dwell_start = now;
            return None;
        };

        let dx = (target.0 - sx) as f64;
        let dy = (target.1 - sy) as f64;
        let dist = dx.hypot(dy);
        let dwell = settings.dwell_secs;

        if dist < settings.move_threshold_px as f64 {
            // settled: the cursor stays frozen while the dwell timer runs
            let since_click = self.last_click.map_or(f64::INFINITY, |t| now - t);
            if now - self.dwell_start > dwell && since_click > dwell {
                self.last_click = Some(now);
                log::debug!("Dwell click at ({}, {})", sx, sy);
                return Some(PointerCommand::Click);
            }
            return None;
        }

        self.dwell_start = now;
        let alpha = (dist / ALPHA_SPAN_PX).max(settings.smoothing_alpha).min(ALPHA_CEILING);
        let nx = (alpha * target.0 as f64 + (1.0 - alpha) * sx as f64) as i32;
        let ny = (alpha * target.1 as f64 + (1.0 - alpha) * sy as f64) as i32;
        self.position = Some((nx, ny));
        Some(PointerCommand::MoveTo {
            x: nx,
            y: ny,
            duration: Some(settings.move_duration()),
        })
    }
}

/// Output of one gaze frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GazeStep {
    pub commands: Vec<PointerCommand>,
    pub events: Vec<GazeEvent>,
}

/// Eye-tracking control state: blink detector, calibration and smoothing
pub struct GazeController {
    settings: GazeSettings,
    screen: ScreenSize,
    blink: BlinkDetector,
    calibration: CalibrationManager,
    smoother: GazeSmoother,
    last_blink: Option<f64>,
}

impl GazeController {
    pub fn new(settings: GazeSettings, screen: ScreenSize) -> Self {
        Self {
            blink: BlinkDetector::new(settings.blink_threshold),
            calibration: CalibrationManager::new(settings.double_blink_window_secs),
            smoother: GazeSmoother::default(),
            last_blink: None,
            settings,
            screen,
        }
    }

    pub fn settings(&self) -> &GazeSettings {
        &self.settings
    }

    pub fn calibration(&self) -> &CalibrationManager {
        &self.calibration
    }

    pub fn smoother(&self) -> &GazeSmoother {
        &self.smoother
    }

    /// Instruction to show before the first frame
    pub fn prompt(&self) -> &'static str {
        self.calibration.prompt()
    }

    /// Apply a runtime control message; may publish a prompt
    pub fn apply(&mut self, control: GazeControl) -> Option<GazeEvent> {
        match control {
            GazeControl::Recalibrate => {
                self.recalibrate();
                return Some(GazeEvent::Prompt(self.prompt().to_string()));
            }
            GazeControl::SetDwell(secs) => self.settings.set_dwell(secs),
            GazeControl::SetMoveThreshold(px) => self.settings.set_move_threshold(px),
            GazeControl::SetAlpha(alpha) => self.settings.set_alpha(alpha),
        }
        log::info!(
            "Gaze settings: dwell {:.2}s, threshold {}px, alpha {:.2}",
            self.settings.dwell_secs,
            self.settings.move_threshold_px,
            self.settings.smoothing_alpha
        );
        None
    }

    pub fn recalibrate(&mut self) {
        log::info!("Re-calibration requested");
        self.calibration.reset();
        self.smoother.reset();
    }

    /// Run one frame of landmarks through blink, calibration and gaze logic
    pub fn process(&mut self, frame: &LandmarkFrame<Option<FaceLandmarks>>) -> GazeStep {
        let mut step = GazeStep::default();
        let now = frame.timestamp;

        let Some(face) = frame.landmarks.as_ref().filter(|f| f.is_complete()) else {
            return step;
        };
        let (Some(iris), Some(ear)) = (face.iris(), face_ear(face)) else {
            return step;
        };

        if let Some(blink) = self.blink.update(ear, now) {
            self.last_blink = Some(now);
            if self.calibration.is_calibrated() {
                if self.settings.blink_click {
                    step.commands.push(PointerCommand::Click);
                }
            } else {
                match self.calibration.on_blink(blink, iris) {
                    Some(CalibrationUpdate::Captured { prompt, .. }) => {
                        step.events.push(GazeEvent::Prompt(prompt.to_string()));
                    }
                    Some(CalibrationUpdate::Complete(_)) => {
                        log::info!("Calibration complete");
                        step.events.push(GazeEvent::Prompt(self.calibration.prompt().to_string()));
                        step.events.push(GazeEvent::CalibrationComplete);
                    }
                    None => {}
                }
            }
        }

        let settled_after_blink = self
            .last_blink
            .map_or(true, |t| now - t > self.settings.ignore_after_blink_secs);
        if !settled_after_blink {
            return step;
        }

        if !self.calibration.is_calibrated() {
            return step;
        }
        if let Some(mapping) = GazeMapping::from_points(self.calibration.points()) {
            let target = mapping.map(iris, self.screen);
            if let Some(cmd) = self.smoother.step(target, now, &self.settings) {
                step.commands.push(cmd);
            }
        }

        step
    }
}
