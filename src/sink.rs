//! Pointer command sinks and the OS cursor driver
//!
//! Pipelines never touch the OS pointer directly. They push commands into a
//! [`CommandSink`]; in the running system that is a [`ChannelSink`] feeding a
//! single driver thread, which applies commands in arrival order.

use crate::error::{HandsfreeError, Result};
use crate::types::{PointerCommand, ScreenSize};
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Receives pointer commands from a control pipeline
pub trait CommandSink: Send {
    fn dispatch(&mut self, command: PointerCommand);
}

/// Executes commands against a pointer device. Owned by one thread.
pub trait CursorDriver {
    fn screen_size(&self) -> ScreenSize;
    fn execute(&mut self, command: PointerCommand);
}

/// Cloneable sink that forwards to the driver thread
#[derive(Clone)]
pub struct ChannelSink {
    tx: Sender<PointerCommand>,
}

impl CommandSink for ChannelSink {
    fn dispatch(&mut self, command: PointerCommand) {
        if let Err(e) = self.tx.send(command) {
            log::warn!("Pointer driver gone, dropping {:?}: {}", command, e);
        }
    }
}

/// Records every command; clones share one log
#[derive(Clone, Default)]
pub struct RecordingSink {
    commands: Arc<Mutex<Vec<PointerCommand>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<PointerCommand> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn take(&self) -> Vec<PointerCommand> {
        self.commands
            .lock()
            .map(|mut c| std::mem::take(&mut *c))
            .unwrap_or_default()
    }
}

impl CommandSink for RecordingSink {
    fn dispatch(&mut self, command: PointerCommand) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command);
        }
    }
}

/// Dry-run driver: logs each command as a JSON line
pub struct LogDriver {
    screen: ScreenSize,
}

impl LogDriver {
    pub fn new(screen: ScreenSize) -> Self {
        Self { screen }
    }
}

impl CursorDriver for LogDriver {
    fn screen_size(&self) -> ScreenSize {
        self.screen
    }

    fn execute(&mut self, command: PointerCommand) {
        match serde_json::to_string(&command) {
            Ok(line) => log::info!("pointer {}", line),
            Err(_) => log::info!("pointer {:?}", command),
        }
    }
}

/// Intermediate positions of an animated move, ending exactly at `to`
pub fn animation_path(from: (i32, i32), to: (i32, i32), steps: u32) -> Vec<(i32, i32)> {
    let steps = steps.max(1);
    (1..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            (
                from.0 + ((to.0 - from.0) as f64 * t).round() as i32,
                from.1 + ((to.1 - from.1) as f64 * t).round() as i32,
            )
        })
        .collect()
}

#[cfg(feature = "os-cursor")]
pub use os::EnigoDriver;

#[cfg(feature = "os-cursor")]
mod os {
    use super::{animation_path, CursorDriver};
    use crate::types::{PointerCommand, ScreenSize};
    use enigo::{Enigo, MouseButton, MouseControllable};
    use std::time::Duration;

    /// Frame interval used to animate a timed move
    const ANIMATION_STEP: Duration = Duration::from_millis(10);

    /// Drives the real OS pointer
    pub struct EnigoDriver {
        enigo: Enigo,
    }

    impl EnigoDriver {
        pub fn new() -> Self {
            Self { enigo: Enigo::new() }
        }
    }

    impl Default for EnigoDriver {
        fn default() -> Self {
            Self::new()
        }
    }

    impl CursorDriver for EnigoDriver {
        fn screen_size(&self) -> ScreenSize {
            let (w, h) = self.enigo.main_display_size();
            ScreenSize {
                width: w.max(1) as u32,
                height: h.max(1) as u32,
            }
        }

        fn execute(&mut self, command: PointerCommand) {
            match command {
                PointerCommand::MoveTo {
                    x,
                    y,
                    duration: Some(duration),
                } if !duration.is_zero() => {
                    let steps = (duration.as_millis() / ANIMATION_STEP.as_millis()).max(1) as u32;
                    let from = self.enigo.mouse_location();
                    for (px, py) in animation_path(from, (x, y), steps) {
                        self.enigo.mouse_move_to(px, py);
                        std::thread::sleep(ANIMATION_STEP);
                    }
                }
                PointerCommand::MoveTo { x, y, .. } => self.enigo.mouse_move_to(x, y),
                PointerCommand::Click => self.enigo.mouse_click(MouseButton::Left),
                PointerCommand::MouseDown => self.enigo.mouse_down(MouseButton::Left),
                PointerCommand::MouseUp => self.enigo.mouse_up(MouseButton::Left),
                // enigo scrolls down for positive lengths
                PointerCommand::Scroll(amount) => self.enigo.mouse_scroll_y(-amount),
            }
        }
    }
}

/// The single consumer of pointer commands
pub struct DriverTask {
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl DriverTask {
    /// Spawn the driver thread. The driver is built on that thread, so it
    /// does not need to be `Send`. Returns the task, a sink for producers and
    /// the screen size reported by the driver.
    pub fn spawn<F, D>(make_driver: F) -> Result<(Self, ChannelSink, ScreenSize)>
    where
        F: FnOnce() -> Result<D> + Send + 'static,
        D: CursorDriver + 'static,
    {
        let (tx, rx) = unbounded::<PointerCommand>();
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (ready_tx, ready_rx) = bounded::<std::result::Result<ScreenSize, String>>(1);

        let thread = std::thread::Builder::new()
            .name("pointer-driver".into())
            .spawn(move || {
                let mut driver = match make_driver() {
                    Ok(d) => d,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(driver.screen_size()));
                drive(&mut driver, &rx, &stop_rx);
            })?;

        let screen = match ready_rx.recv() {
            Ok(Ok(screen)) => screen,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(HandsfreeError::DriverUnavailable(e));
            }
            Err(_) => return Err(HandsfreeError::DriverUnavailable("driver thread exited".into())),
        };
        log::info!("Pointer driver ready ({}x{})", screen.width, screen.height);

        Ok((
            Self {
                stop_tx,
                thread: Some(thread),
            },
            ChannelSink { tx },
            screen,
        ))
    }

    /// Apply anything still queued, then stop the driver thread
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop_tx.try_send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("Pointer driver thread panicked");
            }
        }
    }
}

impl Drop for DriverTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Collapse a backlog of commands before applying it.
///
/// Runs of consecutive moves keep only the latest target, and only the final
/// command of the backlog may animate. An animated move therefore never
/// delays more than the commands that arrive during one animation.
pub fn coalesce(backlog: Vec<PointerCommand>) -> Vec<PointerCommand> {
    let mut out: Vec<PointerCommand> = Vec::with_capacity(backlog.len());
    for command in backlog {
        if matches!(
            (out.last(), &command),
            (Some(PointerCommand::MoveTo { .. }), PointerCommand::MoveTo { .. })
        ) {
            out.pop();
        }
        out.push(command);
    }

    let last = out.len().saturating_sub(1);
    for command in &mut out[..last] {
        if let PointerCommand::MoveTo { duration, .. } = command {
            *duration = None;
        }
    }
    out
}

fn drive<D: CursorDriver>(driver: &mut D, rx: &Receiver<PointerCommand>, stop_rx: &Receiver<()>) {
    loop {
        select! {
            recv(rx) -> msg => match msg {
                Ok(first) => {
                    let backlog: Vec<PointerCommand> = std::iter::once(first).chain(rx.try_iter()).collect();
                    if backlog.len() > 1 {
                        log::trace!("Driver backlog of {} commands", backlog.len());
                    }
                    for command in coalesce(backlog) {
                        driver.execute(command);
                    }
                }
                Err(_) => break,
            },
            recv(stop_rx) -> _ => {
                for command in coalesce(rx.try_iter().collect()) {
                    driver.execute(command);
                }
                break;
            }
        }
    }
    log::info!("Pointer driver stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    struct SharedDriver {
        seen: Arc<Mutex<Vec<PointerCommand>>>,
    }

    impl CursorDriver for SharedDriver {
        fn screen_size(&self) -> ScreenSize {
            ScreenSize {
                width: 800,
                height: 600,
            }
        }

        fn execute(&mut self, command: PointerCommand) {
            self.seen.lock().unwrap().push(command);
        }
    }

    #[test]
    fn test_recording_sink_shares_log() {
        let sink = RecordingSink::new();
        let mut producer = sink.clone();
        producer.dispatch(PointerCommand::Click);
        producer.dispatch(PointerCommand::Scroll(-3));
        assert_eq!(sink.commands(), vec![PointerCommand::Click, PointerCommand::Scroll(-3)]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.commands().is_empty());
    }

    #[test]
    fn test_driver_applies_commands_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&seen);
        let (task, sink, screen) = DriverTask::spawn(move || Ok(SharedDriver { seen: shared })).unwrap();
        assert_eq!(screen.width, 800);

        let mut a = sink.clone();
        let mut b = sink;
        a.dispatch(PointerCommand::MouseDown);
        b.dispatch(PointerCommand::Scroll(2));
        a.dispatch(PointerCommand::MouseUp);
        task.stop();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![PointerCommand::MouseDown, PointerCommand::Scroll(2), PointerCommand::MouseUp]
        );
    }

    #[test]
    fn test_failed_driver_is_reported() {
        let result = DriverTask::spawn(|| -> Result<LogDriver> {
            Err(HandsfreeError::DriverUnavailable("no display".into()))
        });
        assert!(matches!(result, Err(HandsfreeError::DriverUnavailable(_))));
    }

    fn animated(x: i32) -> PointerCommand {
        PointerCommand::MoveTo {
            x,
            y: 0,
            duration: Some(Duration::from_millis(80)),
        }
    }

    #[test]
    fn test_coalesce_keeps_latest_move_and_order() {
        let backlog = vec![
            animated(1),
            animated(2),
            PointerCommand::MouseDown,
            animated(3),
            PointerCommand::MoveTo { x: 4, y: 0, duration: None },
            PointerCommand::MouseUp,
            animated(5),
        ];
        assert_eq!(
            coalesce(backlog),
            vec![
                PointerCommand::MoveTo { x: 2, y: 0, duration: None },
                PointerCommand::MouseDown,
                PointerCommand::MoveTo { x: 4, y: 0, duration: None },
                PointerCommand::MouseUp,
                animated(5),
            ]
        );
        assert_eq!(coalesce(vec![animated(7)]), vec![animated(7)]);
        assert!(coalesce(Vec::new()).is_empty());
    }

    /// Blocks for the full duration of every animated move
    struct SlowDriver {
        seen: Arc<Mutex<Vec<(PointerCommand, Instant)>>>,
    }

    impl CursorDriver for SlowDriver {
        fn screen_size(&self) -> ScreenSize {
            ScreenSize::default()
        }

        fn execute(&mut self, command: PointerCommand) {
            if let PointerCommand::MoveTo {
                duration: Some(duration),
                ..
            } = command
            {
                std::thread::sleep(duration);
            }
            self.seen.lock().unwrap().push((command, Instant::now()));
        }
    }

    #[test]
    fn test_release_not_delayed_by_queued_animations() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&seen);
        let (task, mut sink, _) = DriverTask::spawn(move || Ok(SlowDriver { seen: shared })).unwrap();

        for x in 0..10 {
            sink.dispatch(animated(x));
            std::thread::sleep(Duration::from_millis(30));
        }
        let sent = Instant::now();
        sink.dispatch(PointerCommand::MouseUp);
        task.stop();

        let seen = seen.lock().unwrap();
        let (last, applied) = *seen.last().unwrap();
        assert_eq!(last, PointerCommand::MouseUp);
        assert!(
            applied.duration_since(sent) < Duration::from_millis(250),
            "release applied {:?} after it was sent",
            applied.duration_since(sent)
        );
        let moves = seen
            .iter()
            .filter(|(c, _)| matches!(c, PointerCommand::MoveTo { .. }))
            .count();
        assert!(moves < 10);
        // the final target is never lost
        assert!(seen
            .iter()
            .any(|(c, _)| matches!(c, PointerCommand::MoveTo { x: 9, .. })));
    }

    #[test]
    fn test_animation_path_ends_on_target() {
        let path = animation_path((0, 0), (100, -50), 4);
        assert_eq!(path, vec![(25, -13), (50, -25), (75, -38), (100, -50)]);
        assert_eq!(animation_path((5, 5), (9, 9), 0), vec![(9, 9)]);
    }
}
