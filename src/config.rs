use crate::playback::TickPolicy;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// long enough to bridge a typical auto-repeat delay
pub const DEFAULT_KEY_HOLD_MS: u64 = 600;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TickMode {
    /// tick on each display refresh (--refresh-hz)
    Frame,
    /// tick every --interval-ms, for throughput over frame rate
    Fixed,
}

/// Terminal front end for a CHIP-8 execution engine
#[derive(Debug, Parser)]
#[command(name = "chip8-term", version)]
pub struct Config {
    /// Asset directory, holding roms/ and engine/
    #[arg(long, default_value = "assets")]
    pub assets: PathBuf,

    /// Engine module to load instead of the one under the asset directory
    #[arg(long)]
    pub engine: Option<PathBuf>,

    /// Program to load at start-up; defaults to the first one in roms/
    #[arg(long)]
    pub rom: Option<String>,

    /// Start running as soon as the program is loaded
    #[arg(long, default_value_t = false)]
    pub autoplay: bool,

    /// Surface pixels per device pixel
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=8))]
    pub scale: u16,

    /// How ticks are timed
    #[arg(long, value_enum, default_value_t = TickMode::Frame)]
    pub tick: TickMode,

    /// Display refresh rate for --tick frame
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub refresh_hz: u32,

    /// Milliseconds between ticks for --tick fixed
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u64).range(0..=1000))]
    pub interval_ms: u64,

    /// How long a key stays down after the terminal last reported it.
    /// Keep this above the terminal's auto-repeat delay (often 250-600 ms),
    /// or a held key bounces up and down before the first repeat arrives;
    /// lower values make taps snappier.
    #[arg(long, default_value_t = DEFAULT_KEY_HOLD_MS)]
    pub key_hold_ms: u64,

    /// Don't touch the speaker
    #[arg(long, default_value_t = false)]
    pub mute: bool,

    /// Write logs here instead of stderr (which the display covers)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn tick_policy(&self) -> TickPolicy {
        match self.tick {
            TickMode::Frame => TickPolicy::FrameSynced {
                refresh_hz: self.refresh_hz,
            },
            TickMode::Fixed => TickPolicy::FixedInterval(Duration::from_millis(self.interval_ms)),
        }
    }

    pub fn key_hold(&self) -> Duration {
        Duration::from_millis(self.key_hold_ms)
    }

    pub fn pixel_size(&self) -> usize {
        self.scale as usize
    }
}
