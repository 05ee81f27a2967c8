//! Command line arguments for the `echobeacon` simulator, parsed with clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
/// Drive the annotation engine through a synthetic room
pub struct BeaconArgs {
    #[command(subcommand, long_about)]
    /// How to move through the room: a scripted walk, or commands on stdin
    pub command: RunMode,

    /// RON configuration file; defaults are used when absent
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Engine ticks per second
    #[arg(short = 't', long = "tick-rate", default_value_t = 20.0, global = true, value_parser = positive)]
    pub tick_rate: f64,

    /// Seed for the probe jitter, for reproducible runs
    #[arg(short = 's', long = "seed", global = true)]
    pub seed: Option<u64>,
}

#[derive(Debug, Subcommand, Clone)]
/// The two ways of running the simulator
pub enum RunMode {
    /// Walk straight down the room with obstacle mode on
    #[command(about)]
    Walk(WalkCommand),

    /// Stand in the room and apply control commands typed on stdin
    #[command(about)]
    Interactive(InteractiveCommand),
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
/// Options for [`RunMode::Walk`]
pub struct WalkCommand {
    /// How far to walk, in meters
    #[arg(short = 'd', long = "distance", default_value_t = 6.0)]
    pub distance: f64,

    /// Walking speed, in meters per second
    #[arg(long = "speed", default_value_t = 1.0, value_parser = positive)]
    pub speed: f64,

    /// Regenerate every this many seconds instead of by distance walked
    #[arg(long = "time-refresh", value_parser = positive)]
    pub time_refresh: Option<f64>,

    /// Read the signs at the end of the walk
    #[arg(long = "read")]
    pub read: bool,
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
/// Options for [`RunMode::Interactive`]
pub struct InteractiveCommand {
    /// Seconds of wall time a simulated OCR pass takes
    #[arg(long = "ocr-latency", default_value_t = 1.5)]
    pub ocr_latency: f64,
}

/// A finite number above zero.
fn positive(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{} is not a positive number", s))
    }
}
