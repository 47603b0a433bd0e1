//! OpenCV camera capture

use super::{Frame, FrameSource};
use crate::error::{HandsfreeError, Result};
use opencv::{core, imgproc, prelude::*, videoio};

pub struct CameraSource {
    index: i32,
    capture: videoio::VideoCapture,
    bgr: core::Mat,
    rgb: core::Mat,
}

impl CameraSource {
    /// Open a camera. An unavailable device is fatal at startup.
    pub fn open(index: i32) -> Result<Self> {
        log::info!("Opening camera {}...", index);
        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)
            .map_err(|_| HandsfreeError::CaptureUnavailable { index })?;
        if !capture.is_opened().unwrap_or(false) {
            return Err(HandsfreeError::CaptureUnavailable { index });
        }

        Ok(Self {
            index,
            capture,
            bgr: core::Mat::default(),
            rgb: core::Mat::default(),
        })
    }
}

impl FrameSource for CameraSource {
    fn read(&mut self) -> Option<Frame> {
        if !self.capture.read(&mut self.bgr).unwrap_or(false) || self.bgr.empty() {
            return None;
        }
        imgproc::cvt_color(&self.bgr, &mut self.rgb, imgproc::COLOR_BGR2RGB, 0).ok()?;

        let width = self.rgb.cols() as u32;
        let height = self.rgb.rows() as u32;
        let bytes = self.rgb.data_bytes().ok()?.to_vec();
        Frame::from_raw(width, height, bytes)
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            log::warn!("Failed to release camera {}: {}", self.index, e);
        } else {
            log::info!("Camera {} released", self.index);
        }
    }
}
