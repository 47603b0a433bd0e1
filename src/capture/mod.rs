//! Capture pathway - frames in, landmarks out
//!
//! Frame sources and landmark estimators are collaborators the control
//! logic only consumes. Frames are mirrored horizontally before anything
//! else looks at them, so moving a hand or the eyes to the left moves the
//! cursor left.

use crate::types::{FaceLandmarks, FrameSize, HandLandmarks};
use anyhow::Result;
use std::sync::{Arc, Mutex};

#[cfg(feature = "vision")]
mod camera;
mod udp_landmarks;

#[cfg(feature = "vision")]
pub use camera::CameraSource;
pub use udp_landmarks::{parse_landmark_message, LandmarkUpdate, UdpLandmarkFeed};

/// An RGB camera frame
pub type Frame = image::RgbImage;

/// Supplies one frame per pipeline tick
pub trait FrameSource: Send {
    /// `None` when no frame could be read this tick
    fn read(&mut self) -> Option<Frame>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read(&mut self) -> Option<Frame> {
        (**self).read()
    }
}

/// One frame source read by several pipelines. Each read takes the next
/// frame, so a camera is opened once however many pipelines run.
#[derive(Clone)]
pub struct SharedSource {
    inner: Arc<Mutex<Box<dyn FrameSource>>>,
}

impl SharedSource {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(source)),
        }
    }
}

impl FrameSource for SharedSource {
    fn read(&mut self) -> Option<Frame> {
        self.inner.lock().ok()?.read()
    }
}

/// Face mesh estimator (iris-refined)
pub trait FaceLandmarker: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Option<FaceLandmarks>>;
}

/// Hand estimator returning up to two classified hands
pub trait HandLandmarker: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<HandLandmarks>>;
}

/// Flip a frame left-to-right in place
pub fn mirror(frame: &mut Frame) {
    image::imageops::flip_horizontal_in_place(frame);
}

pub fn frame_size(frame: &Frame) -> FrameSize {
    FrameSize {
        width: frame.width(),
        height: frame.height(),
    }
}

/// Blank frames of a fixed size, for running against an external estimator
/// without a local camera
pub struct SyntheticSource {
    size: FrameSize,
}

impl SyntheticSource {
    pub fn new(size: FrameSize) -> Self {
        log::warn!("No camera attached, using {}x{} synthetic frames", size.width, size.height);
        Self { size }
    }
}

impl FrameSource for SyntheticSource {
    fn read(&mut self) -> Option<Frame> {
        Some(Frame::new(self.size.width, self.size.height))
    }
}
