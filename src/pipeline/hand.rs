use super::Pipeline;
use crate::capture::{frame_size, mirror, FrameSource, HandLandmarker};
use crate::hand::HandGestureController;
use crate::sink::CommandSink;
use crate::types::LandmarkFrame;
use std::time::Instant;

/// Hand-gesture pipeline: classified hands to pointer commands
pub struct HandPipeline<S, M, K> {
    source: S,
    landmarker: M,
    sink: K,
    controller: HandGestureController,
    started: Instant,
}

impl<S, M, K> HandPipeline<S, M, K>
where
    S: FrameSource,
    M: HandLandmarker,
    K: CommandSink,
{
    pub fn new(source: S, landmarker: M, sink: K, controller: HandGestureController) -> Self {
        Self {
            source,
            landmarker,
            sink,
            controller,
            started: Instant::now(),
        }
    }

    pub fn controller(&self) -> &HandGestureController {
        &self.controller
    }

    /// Process one frame captured at `now` seconds
    pub fn step(&mut self, now: f64) {
        let Some(mut frame) = self.source.read() else {
            return;
        };
        mirror(&mut frame);

        // a failed estimate counts as "no hands", which releases the button
        let hands = self.landmarker.detect(&frame).unwrap_or_else(|e| {
            log::debug!("Hand estimator failed: {e}");
            Vec::new()
        });

        let commands = self.controller.process(&LandmarkFrame {
            timestamp: now,
            size: frame_size(&frame),
            landmarks: hands,
        });
        for command in commands {
            self.sink.dispatch(command);
        }
    }
}

impl<S, M, K> Pipeline for HandPipeline<S, M, K>
where
    S: FrameSource + 'static,
    M: HandLandmarker + 'static,
    K: CommandSink + 'static,
{
    fn name(&self) -> &'static str {
        "hand"
    }

    fn tick(&mut self) {
        let now = self.started.elapsed().as_secs_f64();
        self.step(now);
    }
}
