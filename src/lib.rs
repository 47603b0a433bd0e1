//! # RayOS Handsfree
//!
//! Hands-free pointer control. Turns per-frame face and hand landmarks into
//! pointer commands:
//!
//! - **Blink detection**: eye-aspect-ratio edges become blink events
//! - **Calibration**: five double-blinks capture the gaze range
//! - **Gaze control**: calibrated iris position, adaptively smoothed, with dwell clicks
//! - **Hand control**: left index finger points, right-hand pinches click and scroll
//!
//! The gaze and hand pipelines run independently and share one pointer
//! driver. Commands from both are applied in arrival order, so when both
//! pipelines are active the last command wins.

pub mod blink;
pub mod calibration;
pub mod capture;
pub mod config;
pub mod error;
pub mod gaze;
pub mod hand;
pub mod pipeline;
pub mod sink;
pub mod types;

pub use config::HandsfreeConfig;
pub use error::HandsfreeError;
pub use gaze::GazeController;
pub use hand::HandGestureController;
pub use types::*;

use capture::{FrameSource, SharedSource, SyntheticSource, UdpLandmarkFeed};
use crossbeam_channel::{unbounded, Receiver, Sender};
use pipeline::{GazePipeline, HandPipeline, PipelineHandle};
use sink::{DriverTask, LogDriver};

/// Which control pipelines to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Gaze,
    Hand,
    Both,
}

impl Mode {
    fn gaze(self) -> bool {
        matches!(self, Mode::Gaze | Mode::Both)
    }

    fn hand(self) -> bool {
        matches!(self, Mode::Hand | Mode::Both)
    }
}

/// The running system: pointer driver plus the requested pipelines
pub struct Handsfree {
    driver: DriverTask,
    gaze: Option<PipelineHandle>,
    hand: Option<PipelineHandle>,
    controls: Sender<GazeControl>,
    events: Receiver<GazeEvent>,
}

impl Handsfree {
    /// Start the driver and pipelines. Must be called inside a tokio runtime
    /// (the landmark feeds listen on it).
    pub async fn start(config: HandsfreeConfig, mode: Mode, dry_run: bool) -> anyhow::Result<Self> {
        log::info!("Initializing Handsfree ({:?} mode)...", mode);
        config.validate()?;

        let fallback_screen = config.screen.resolve(ScreenSize::default());
        let (driver, sink, reported) = spawn_driver(dry_run, fallback_screen)?;
        let screen = config.screen.resolve(reported);
        log::info!("Screen {}x{}", screen.width, screen.height);

        let (controls, control_rx) = unbounded();
        let (event_tx, events) = unbounded();
        let period = config.capture.tick();
        // one device handle, read by both pipelines
        let source = SharedSource::new(open_source(&config)?);

        let gaze = if mode.gaze() {
            let feed = UdpLandmarkFeed::bind(config.feed.face_addr, &config.feed, config.hand.min_hand_score).await?;
            let controller = GazeController::new(config.gaze.clone(), screen);
            let gaze = GazePipeline::new(
                source.clone(),
                feed,
                sink.clone(),
                controller,
                control_rx,
                event_tx,
            );
            Some(pipeline::spawn(gaze, period)?)
        } else {
            None
        };

        let hand = if mode.hand() {
            let feed = UdpLandmarkFeed::bind(config.feed.hand_addr, &config.feed, config.hand.min_hand_score).await?;
            let controller = HandGestureController::new(&config.hand, screen);
            let hand = HandPipeline::new(source.clone(), feed, sink.clone(), controller);
            Some(pipeline::spawn(hand, period)?)
        } else {
            None
        };

        log::info!("Handsfree initialization complete");
        Ok(Self {
            driver,
            gaze,
            hand,
            controls,
            events,
        })
    }

    /// Sender for runtime gaze settings and re-calibration
    pub fn controls(&self) -> Sender<GazeControl> {
        self.controls.clone()
    }

    /// Prompts and calibration-complete notifications
    pub fn events(&self) -> Receiver<GazeEvent> {
        self.events.clone()
    }

    /// Stop both pipelines (releasing their capture devices), then the driver
    pub fn shutdown(self) -> anyhow::Result<()> {
        log::info!("Shutting down Handsfree...");
        let mut result = Ok(());
        for handle in [self.gaze, self.hand].into_iter().flatten() {
            let name = handle.name();
            if let Err(e) = handle.stop() {
                log::error!("{} pipeline: {}", name, e);
                result = Err(e.into());
            }
        }
        self.driver.stop();
        result
    }
}

fn open_source(config: &HandsfreeConfig) -> anyhow::Result<Box<dyn FrameSource>> {
    let settings = &config.capture;
    if settings.use_camera {
        #[cfg(feature = "vision")]
        {
            let camera = capture::CameraSource::open(settings.camera_index)?;
            return Ok(Box::new(camera));
        }
        #[cfg(not(feature = "vision"))]
        anyhow::bail!("camera capture needs the `vision` feature");
    }

    Ok(Box::new(SyntheticSource::new(FrameSize {
        width: settings.frame_width,
        height: settings.frame_height,
    })))
}

fn spawn_driver(dry_run: bool, fallback: ScreenSize) -> anyhow::Result<(DriverTask, sink::ChannelSink, ScreenSize)> {
    #[cfg(feature = "os-cursor")]
    {
        if !dry_run {
            return Ok(DriverTask::spawn(|| Ok(sink::EnigoDriver::new()))?);
        }
    }

    if !dry_run {
        log::warn!("Built without `os-cursor`; pointer commands are only logged");
    }
    Ok(DriverTask::spawn(move || Ok(LogDriver::new(fallback)))?)
}
