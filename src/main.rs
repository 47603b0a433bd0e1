//! RayOS Handsfree
//!
//! Main entry point for hands-free pointer control.
//! This application:
//! - Receives face and hand landmarks from an estimator process
//! - Detects blinks and runs double-blink calibration
//! - Moves the pointer by gaze with dwell clicks
//! - Points, clicks and scrolls with hand gestures

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use rayos_handsfree::{GazeControl, GazeEvent, Handsfree, HandsfreeConfig, Mode};
use std::io::BufRead;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "handsfree")]
#[command(about = "RayOS Handsfree - gaze, blink and gesture pointer control", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control pipelines until Ctrl+C
    ///
    /// While running, stdin accepts `recalibrate`, `dwell <secs>`,
    /// `threshold <px>` and `alpha <a>`.
    Run {
        /// Which pipelines to start
        #[arg(long, value_enum, default_value = "both")]
        mode: ModeArg,

        /// Log pointer commands instead of moving the OS pointer
        #[arg(long)]
        dry_run: bool,

        /// Capture from the configured camera instead of synthetic frames
        #[arg(long)]
        camera: bool,
    },

    /// Validate the configuration and print the effective values
    CheckConfig,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg {
    Gaze,
    Hand,
    Both,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Gaze => Mode::Gaze,
            ModeArg::Hand => Mode::Hand,
            ModeArg::Both => Mode::Both,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => HandsfreeConfig::load(path)?,
        None => HandsfreeConfig::default(),
    };

    match cli.command.unwrap_or(Commands::Run {
        mode: ModeArg::Both,
        dry_run: false,
        camera: false,
    }) {
        Commands::CheckConfig => {
            config.validate()?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Run { mode, dry_run, camera } => run(config, mode.into(), dry_run, camera).await,
    }
}

async fn run(mut config: HandsfreeConfig, mode: Mode, dry_run: bool, camera: bool) -> Result<()> {
    config.capture.use_camera |= camera;

    log::info!("═══════════════════════════════════════");
    log::info!("  RayOS Handsfree");
    log::info!("═══════════════════════════════════════");

    let handsfree = match Handsfree::start(config, mode, dry_run).await {
        Ok(h) => h,
        Err(e) => {
            log::error!("Failed to start Handsfree: {}", e);
            log::error!("Make sure you have:");
            log::error!("  - A working camera (when capturing locally)");
            log::error!("  - Free UDP ports for the landmark feeds");
            return Err(e);
        }
    };

    let events = handsfree.events();
    std::thread::spawn(move || {
        for event in events.iter() {
            if event == GazeEvent::CalibrationComplete {
                log::info!("Gaze control active");
            }
        }
    });

    let controls = handsfree.controls();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines().map_while(|l| l.ok()) {
            match parse_control_line(&line) {
                Some(control) => {
                    if controls.send(control).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => log::warn!("Unknown command: {}", line.trim()),
            }
        }
    });

    log::info!("Press Ctrl+C to exit");

    // Set up Ctrl+C handler
    let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal...");
        let _ = tx.blocking_send(());
    })?;

    rx.recv().await;

    handsfree.shutdown()?;
    log::info!("Handsfree shutdown complete");
    Ok(())
}

fn parse_control_line(line: &str) -> Option<GazeControl> {
    let mut parts = line.split_whitespace();
    let command = parts.next()?;
    let value = parts.next();
    match (command, value) {
        ("recalibrate", None) => Some(GazeControl::Recalibrate),
        ("dwell", Some(v)) => v.parse().ok().map(GazeControl::SetDwell),
        ("threshold", Some(v)) => v.parse().ok().map(GazeControl::SetMoveThreshold),
        ("alpha", Some(v)) => v.parse().ok().map(GazeControl::SetAlpha),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_lines() {
        assert_eq!(parse_control_line("recalibrate"), Some(GazeControl::Recalibrate));
        assert_eq!(parse_control_line("  dwell 1.5 "), Some(GazeControl::SetDwell(1.5)));
        assert_eq!(parse_control_line("threshold 35"), Some(GazeControl::SetMoveThreshold(35)));
        assert_eq!(parse_control_line("alpha 0.2"), Some(GazeControl::SetAlpha(0.2)));
        assert_eq!(parse_control_line("threshold -4"), None);
        assert_eq!(parse_control_line("jump"), None);
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from(["handsfree", "run", "--mode", "hand", "--dry-run"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Run {
                mode: ModeArg::Hand,
                dry_run: true,
                camera: false
            })
        ));
    }
}
