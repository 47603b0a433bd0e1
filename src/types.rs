//! Core data types for the hands-free pointer system

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A normalized landmark coordinate (fraction of frame width/height, 0.0-1.0)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Integer pixel position inside a frame of the given size
    pub fn to_pixels(&self, size: FrameSize) -> (i32, i32) {
        (
            (self.x * size.width as f64) as i32,
            (self.y * size.height as f64) as i32,
        )
    }
}

/// Pixel dimensions of a captured camera frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// Pixel dimensions of the screen the pointer moves on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Face mesh landmark indices (iris-refined 478-point mesh)
pub mod face_indices {
    /// Iris centre used as the gaze proxy
    pub const IRIS: usize = 468;
    /// Left eye contour: outer corner, two upper lids, inner corner, two lower lids
    pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];
    pub const RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];
}

/// Hand landmark indices (21-point hand model)
pub mod hand_indices {
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_TIP: usize = 12;
    pub const COUNT: usize = 21;
}

/// One set of facial landmarks
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub points: Vec<Point2>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// True when the mesh carries every index the controllers read
    pub fn is_complete(&self) -> bool {
        self.points.len() > face_indices::IRIS
    }

    pub fn iris(&self) -> Option<Point2> {
        self.points.get(face_indices::IRIS).copied()
    }

    /// The six contour points of an eye, in index order
    pub fn eye(&self, ids: &[usize; 6]) -> Option<[Point2; 6]> {
        let mut out = [Point2::default(); 6];
        for (slot, &id) in out.iter_mut().zip(ids.iter()) {
            *slot = *self.points.get(id)?;
        }
        Some(out)
    }
}

/// Which hand a landmark set was classified as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

/// One classified 21-point hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandLandmarks {
    pub handedness: Handedness,
    pub points: Vec<Point2>,
}

impl HandLandmarks {
    pub fn new(handedness: Handedness, points: Vec<Point2>) -> Self {
        Self { handedness, points }
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() >= hand_indices::COUNT
    }

    pub fn thumb_tip(&self) -> Point2 {
        self.points[hand_indices::THUMB_TIP]
    }

    pub fn index_tip(&self) -> Point2 {
        self.points[hand_indices::INDEX_TIP]
    }

    pub fn middle_tip(&self) -> Point2 {
        self.points[hand_indices::MIDDLE_TIP]
    }
}

/// Landmarks detected in one frame, stamped with capture time and frame size
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame<L> {
    /// Seconds since the pipeline started
    pub timestamp: f64,
    pub size: FrameSize,
    pub landmarks: L,
}

/// Emitted once per blink, on the eye re-opening
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlinkEvent {
    pub timestamp: f64,
}

/// A command for the OS pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerCommand {
    /// Move to an absolute screen position, optionally animated
    MoveTo {
        x: i32,
        y: i32,
        duration: Option<Duration>,
    },
    Click,
    MouseDown,
    MouseUp,
    /// Wheel clicks; positive scrolls up
    Scroll(i32),
}

/// Notifications published by the gaze pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GazeEvent {
    /// Current calibration instruction for the user
    Prompt(String),
    CalibrationComplete,
}

/// Runtime control messages accepted by the gaze pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GazeControl {
    Recalibrate,
    SetDwell(f64),
    SetMoveThreshold(u32),
    SetAlpha(f64),
}
