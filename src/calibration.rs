//! Double-blink calibration
//!
//! The user looks at each screen corner (and finally the centre) and
//! double-blinks. Every double blink captures the current iris position as
//! the next calibration point.

use crate::types::{BlinkEvent, Point2};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const CALIBRATION_POINTS: usize = 5;

const PROMPTS: [&str; CALIBRATION_POINTS] = [
    "Look at TOP-LEFT and double-blink",
    "Look at TOP-RIGHT and double-blink",
    "Look at BOTTOM-RIGHT and double-blink",
    "Look at BOTTOM-LEFT and double-blink",
    "Look at CENTER and double-blink",
];

pub const COMPLETE_PROMPT: &str = "Calibration complete!";

/// Calibration targets, in capture order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationTarget {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
    Center,
}

impl CalibrationTarget {
    pub const ORDER: [CalibrationTarget; CALIBRATION_POINTS] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomRight,
        Self::BottomLeft,
        Self::Center,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub target: CalibrationTarget,
    /// Normalized iris position at capture time
    pub iris: Point2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationState {
    Uncalibrated,
    /// `step` points captured so far (1..=4)
    InProgress { step: usize },
    Calibrated,
}

/// Result of feeding a blink to the manager
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationUpdate {
    /// A point was captured; `prompt` is the next instruction
    Captured {
        point: CalibrationPoint,
        prompt: &'static str,
    },
    /// The fifth point was captured
    Complete(CalibrationPoint),
}

#[derive(Debug, Clone)]
pub struct CalibrationManager {
    points: Vec<CalibrationPoint>,
    window: VecDeque<f64>,
    double_window: f64,
}

impl CalibrationManager {
    pub fn new(double_window: f64) -> Self {
        Self {
            points: Vec::with_capacity(CALIBRATION_POINTS),
            window: VecDeque::with_capacity(2),
            double_window,
        }
    }

    pub fn state(&self) -> CalibrationState {
        match self.points.len() {
            0 => CalibrationState::Uncalibrated,
            n if n < CALIBRATION_POINTS => CalibrationState::InProgress { step: n },
            _ => CalibrationState::Calibrated,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.state() == CalibrationState::Calibrated
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    /// Instruction for the next point to capture
    pub fn prompt(&self) -> &'static str {
        PROMPTS.get(self.points.len()).copied().unwrap_or(COMPLETE_PROMPT)
    }

    /// Feed a blink; `iris` is the gaze position in the frame that produced it.
    /// Ignored once calibrated.
    pub fn on_blink(&mut self, blink: BlinkEvent, iris: Point2) -> Option<CalibrationUpdate> {
        if self.is_calibrated() {
            return None;
        }

        self.window.push_back(blink.timestamp);
        while self.window.len() > 2 {
            self.window.pop_front();
        }

        let is_double = match (self.window.front(), self.window.back()) {
            (Some(first), Some(last)) if self.window.len() == 2 => last - first < self.double_window,
            _ => false,
        };
        if !is_double {
            return None;
        }

        self.window.clear();
        let point = CalibrationPoint {
            target: CalibrationTarget::ORDER[self.points.len()],
            iris,
        };
        self.points.push(point);
        log::info!(
            "Captured calibration point {}/{} ({:?}) at ({:.3}, {:.3})",
            self.points.len(),
            CALIBRATION_POINTS,
            point.target,
            iris.x,
            iris.y
        );

        if self.is_calibrated() {
            Some(CalibrationUpdate::Complete(point))
        } else {
            Some(CalibrationUpdate::Captured {
                point,
                prompt: self.prompt(),
            })
        }
    }

    /// Drop all captured points and start over
    pub fn reset(&mut self) {
        self.points.clear();
        self.window.clear();
    }
}
