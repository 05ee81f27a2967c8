//! Errors surfaced by the engine's public operations.

use crate::command::CommandError;
use crate::config::ConfigError;
use std::{borrow::Cow, fmt};

/// Everything that can go wrong while driving an [`Engine`](crate::engine::Engine).
///
/// None of these is fatal; the engine is still usable after any of them.
#[derive(Debug)]
pub enum EngineError {
    /// A capture pass was requested while another was still in flight.
    ConcurrentCaptureRejected,

    /// A capture pass was requested but no capture service is attached.
    CaptureUnavailable,

    /// A refresh threshold was zero, negative or not a finite number.
    InvalidThreshold(f64),

    /// A control command could not be parsed.
    Command(CommandError),

    /// The configuration could not be read or written.
    Config(ConfigError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use EngineError as EE;
        let msg = match self {
            EE::ConcurrentCaptureRejected => Cow::from("a capture is already in progress"),
            EE::CaptureUnavailable => Cow::from("no capture service attached"),
            EE::InvalidThreshold(value) => {
                Cow::from(format!("refresh threshold must be a positive number, got {}", value))
            }
            EE::Command(error) => Cow::from(format!("command error: {}", error)),
            EE::Config(error) => Cow::from(format!("config error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for EngineError {}

impl From<CommandError> for EngineError {
    fn from(value: CommandError) -> Self {
        Self::Command(value)
    }
}

impl From<ConfigError> for EngineError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}
