//! Periodic control pipelines
//!
//! Each pipeline owns its frame source and estimator and runs on its own
//! thread: read a frame, detect landmarks, run the controller, dispatch the
//! resulting commands. Capture and inference block, so a slow estimator only
//! delays its own pipeline. While a frame is still being processed at most
//! one further tick is buffered; any others that fall due are dropped.

use crate::error::{HandsfreeError, Result};
use crossbeam_channel::{bounded, select, tick, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

mod gaze;
mod hand;

pub use gaze::GazePipeline;
pub use hand::HandPipeline;

/// One tick of work
pub trait Pipeline: Send + 'static {
    fn name(&self) -> &'static str;
    fn tick(&mut self);
}

/// Running pipeline thread. Stopping (or dropping) the handle ends the loop
/// and drops the pipeline, releasing its capture device.
pub struct PipelineHandle {
    name: &'static str,
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signal the loop and wait for it. An estimator call already in
    /// progress finishes first.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let _ = self.stop_tx.try_send(());
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| HandsfreeError::PipelineStopped),
            None => Ok(()),
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if self.shutdown().is_err() {
            log::warn!("{} pipeline panicked", self.name);
        }
    }
}

/// Run `pipeline` every `period` on a dedicated thread
pub fn spawn<P: Pipeline>(mut pipeline: P, period: Duration) -> Result<PipelineHandle> {
    let name = pipeline.name();
    let (stop_tx, stop_rx) = bounded::<()>(1);

    let thread = std::thread::Builder::new()
        .name(format!("{name}-pipeline"))
        .spawn(move || {
            log::info!("{} pipeline started ({} ms tick)", name, period.as_millis());
            let ticker = tick(period);
            loop {
                select! {
                    recv(ticker) -> _ => pipeline.tick(),
                    recv(stop_rx) -> _ => break,
                }
            }
            drop(pipeline);
            log::info!("{} pipeline stopped", name);
        })?;

    Ok(PipelineHandle {
        name,
        stop_tx,
        thread: Some(thread),
    })
}
