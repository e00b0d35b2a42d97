//! Play/pause/reset and the repeating tick that drives the engine.
//!
//! ```text
//!            play                      pause, reset, change_program
//!  Stopped ---------> Running ---------------------------------> Stopped
//!     ^                 |  ^
//!     |                 |  | tick: cycle(), re-arm
//!     |                 +--+
//!     +-- reset, change_program (from Stopped too)
//! ```
//!
//! Ticks never overlap: the next one is armed only once the current
//! `cycle()` has returned, and only if we're still running.

use crate::assets::RomLoadError;
use crate::engine::EngineAdapter;
use log::{debug, info, trace};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Running,
}

/// Identifies one armed tick. Handles are never reused, so a tick that
/// fires after being superseded can be recognised and dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduledTickHandle(pub(crate) u64);

/// How long between ticks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickPolicy {
    /// a fixed wall-clock gap after each tick
    FixedInterval(Duration),
    /// on the next display refresh
    FrameSynced { refresh_hz: u32 },
}

impl TickPolicy {
    /// nominal time between ticks
    pub fn period(&self) -> Duration {
        match *self {
            TickPolicy::FixedInterval(interval) => interval,
            TickPolicy::FrameSynced { refresh_hz } => {
                Duration::from_secs(1) / refresh_hz.max(1)
            }
        }
    }
}

impl Default for TickPolicy {
    /// the engine expects to be cycled at 60Hz
    fn default() -> Self {
        TickPolicy::FrameSynced { refresh_hz: 60 }
    }
}

/// The host's timer mechanism
pub trait Ticker {
    /// schedule a single tick according to `policy`
    fn arm(&mut self, policy: TickPolicy) -> ScheduledTickHandle;

    /// unschedule a tick; unknown or already-fired handles are ignored
    fn cancel(&mut self, handle: ScheduledTickHandle);
}

pub struct PlaybackController {
    state: PlaybackState,
    schedule: Option<ScheduledTickHandle>,
    policy: TickPolicy,
}

impl PlaybackController {
    pub fn new(policy: TickPolicy) -> Self {
        PlaybackController {
            state: PlaybackState::Stopped,
            schedule: None,
            policy,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PlaybackState::Running
    }

    pub fn policy(&self) -> TickPolicy {
        self.policy
    }

    pub fn play(&mut self, ticker: &mut impl Ticker) {
        if self.is_running() {
            debug!("play: already running");
            return;
        }
        info!("play");
        self.state = PlaybackState::Running;
        self.schedule = Some(ticker.arm(self.policy));
    }

    pub fn pause(&mut self, ticker: &mut impl Ticker) {
        if !self.is_running() {
            debug!("pause: already stopped");
            return;
        }
        info!("pause");
        self.stop(ticker);
    }

    pub fn reset(&mut self, ticker: &mut impl Ticker, engine: &mut EngineAdapter) {
        info!("reset");
        self.stop(ticker);
        engine.reset();
    }

    /// Stop, then load another program. Doesn't resume: the caller has to
    /// `play` again. On error we're still stopped and the old program stays.
    pub fn change_program(
        &mut self,
        ticker: &mut impl Ticker,
        engine: &mut EngineAdapter,
        name: &str,
    ) -> Result<(), RomLoadError> {
        info!("changing program to {:?}", name);
        self.stop(ticker);
        engine.load_program(name)
    }

    /// A tick fired. Runs one `cycle()` if `handle` is the tick we're waiting
    /// on and we're still running, then arms the next one. Returns whether
    /// the engine was cycled.
    pub fn on_tick(
        &mut self,
        handle: ScheduledTickHandle,
        ticker: &mut impl Ticker,
        engine: &mut EngineAdapter,
    ) -> bool {
        if self.schedule != Some(handle) || !self.is_running() {
            trace!("dropping stale tick {:?}", handle);
            return false;
        }
        self.schedule = None;
        engine.cycle();
        if self.is_running() {
            self.schedule = Some(ticker.arm(self.policy));
        }
        true
    }

    fn stop(&mut self, ticker: &mut impl Ticker) {
        if let Some(handle) = self.schedule.take() {
            ticker.cancel(handle);
        }
        self.state = PlaybackState::Stopped;
    }
}
