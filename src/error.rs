//! Error types

use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandsfreeError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("video device {index} is unavailable")]
    CaptureUnavailable { index: i32 },

    #[error("pointer driver unavailable: {0}")]
    DriverUnavailable(String),

    #[error("pipeline thread stopped unexpectedly")]
    PipelineStopped,
}

pub type Result<T> = std::result::Result<T, HandsfreeError>;
