//! Blink detection from eye-aspect-ratio (EAR)
//!
//! Each eye contributes six contour points: two corners and two upper/lower
//! lid pairs. EAR drops towards zero while the lids are closed. The detector
//! is a two-state machine that emits a single [`BlinkEvent`] when the eyes
//! open again.

use crate::types::{face_indices, BlinkEvent, FaceLandmarks, Point2};

/// EAR of one eye from its six ordered contour points
///
/// Points are ordered corner, upper, upper, corner, lower, lower; the
/// vertical pairs are (1,5) and (2,4), the horizontal pair (0,3).
pub fn eye_aspect_ratio(eye: &[Point2; 6]) -> f64 {
    let a = eye[1].distance(&eye[5]);
    let b = eye[2].distance(&eye[4]);
    let c = eye[0].distance(&eye[3]);
    if c == 0.0 {
        return 0.0;
    }
    (a + b) / (2.0 * c)
}

/// Mean EAR of both eyes, or `None` when the mesh lacks eye points
pub fn face_ear(face: &FaceLandmarks) -> Option<f64> {
    let left = face.eye(&face_indices::LEFT_EYE)?;
    let right = face.eye(&face_indices::RIGHT_EYE)?;
    Some((eye_aspect_ratio(&left) + eye_aspect_ratio(&right)) / 2.0)
}

#[derive(Debug, Clone)]
pub struct BlinkDetector {
    threshold: f64,
    blinking: bool,
}

impl BlinkDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            blinking: false,
        }
    }

    pub fn is_blinking(&self) -> bool {
        self.blinking
    }

    /// Feed one EAR sample; returns an event on the closed -> open edge only
    pub fn update(&mut self, ear: f64, timestamp: f64) -> Option<BlinkEvent> {
        if ear < self.threshold && !self.blinking {
            self.blinking = true;
            log::debug!("Eyes closed at {:.3}s (EAR {:.3})", timestamp, ear);
            None
        } else if ear >= self.threshold && self.blinking {
            self.blinking = false;
            log::debug!("Blink at {:.3}s", timestamp);
            Some(BlinkEvent { timestamp })
        } else {
            None
        }
    }
}
