use super::Pipeline;
use crate::capture::{frame_size, mirror, FaceLandmarker, FrameSource};
use crate::gaze::GazeController;
use crate::sink::CommandSink;
use crate::types::{GazeControl, GazeEvent, LandmarkFrame};
use crossbeam_channel::{Receiver, Sender};
use std::time::Instant;

/// Eye-tracking pipeline: face landmarks to gaze commands
pub struct GazePipeline<S, M, K> {
    source: S,
    landmarker: M,
    sink: K,
    controller: GazeController,
    controls: Receiver<GazeControl>,
    events: Sender<GazeEvent>,
    started: Instant,
}

impl<S, M, K> GazePipeline<S, M, K>
where
    S: FrameSource,
    M: FaceLandmarker,
    K: CommandSink,
{
    pub fn new(
        source: S,
        landmarker: M,
        sink: K,
        controller: GazeController,
        controls: Receiver<GazeControl>,
        events: Sender<GazeEvent>,
    ) -> Self {
        let _ = events.send(GazeEvent::Prompt(controller.prompt().to_string()));
        Self {
            source,
            landmarker,
            sink,
            controller,
            controls,
            events,
            started: Instant::now(),
        }
    }

    pub fn controller(&self) -> &GazeController {
        &self.controller
    }

    /// Process one frame captured at `now` seconds
    pub fn step(&mut self, now: f64) {
        let pending: Vec<GazeControl> = self.controls.try_iter().collect();
        for control in pending {
            if let Some(event) = self.controller.apply(control) {
                self.publish(event);
            }
        }

        let Some(mut frame) = self.source.read() else {
            return;
        };
        mirror(&mut frame);

        let face = match self.landmarker.detect(&frame) {
            Ok(face) => face,
            Err(e) => {
                log::debug!("Face estimator failed: {e}");
                None
            }
        };

        let step = self.controller.process(&LandmarkFrame {
            timestamp: now,
            size: frame_size(&frame),
            landmarks: face,
        });
        for command in step.commands {
            self.sink.dispatch(command);
        }
        for event in step.events {
            self.publish(event);
        }
    }

    fn publish(&self, event: GazeEvent) {
        if let GazeEvent::Prompt(ref text) = event {
            log::info!("{text}");
        }
        let _ = self.events.send(event);
    }
}

impl<S, M, K> Pipeline for GazePipeline<S, M, K>
where
    S: FrameSource + 'static,
    M: FaceLandmarker + 'static,
    K: CommandSink + 'static,
{
    fn name(&self) -> &'static str {
        "gaze"
    }

    fn tick(&mut self) {
        let now = self.started.elapsed().as_secs_f64();
        self.step(now);
    }
}
