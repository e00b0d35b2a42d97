//! Host timer queue: arms, cancels and expires the playback ticks.

use crate::playback::{ScheduledTickHandle, TickPolicy, Ticker};
use std::time::{Duration, Instant};

/// The host loop's timers. Frame-synced ticks land on refresh boundaries
/// counted from the queue's epoch, like a display's vblank would.
pub struct TimerQueue {
    epoch: Instant,
    next: u64,
    pending: Vec<(Instant, ScheduledTickHandle)>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(epoch: Instant) -> Self {
        TimerQueue {
            epoch,
            next: 0,
            pending: Vec::new(),
        }
    }

    pub fn arm_at(&mut self, policy: TickPolicy, now: Instant) -> ScheduledTickHandle {
        self.next += 1;
        let handle = ScheduledTickHandle(self.next);
        self.pending.push((self.deadline(policy, now), handle));
        handle
    }

    fn deadline(&self, policy: TickPolicy, now: Instant) -> Instant {
        match policy {
            TickPolicy::FixedInterval(interval) => now + interval,
            TickPolicy::FrameSynced { .. } => {
                let period = policy.period().as_nanos();
                let since = now.saturating_duration_since(self.epoch).as_nanos();
                // strictly after now, even when sitting right on a boundary
                let frames = since / period + 1;
                self.epoch + Duration::from_nanos((frames * period) as u64)
            }
        }
    }

    /// take every timer due by `now`, earliest first
    pub fn expired(&mut self, now: Instant) -> Vec<ScheduledTickHandle> {
        let mut due: Vec<(Instant, ScheduledTickHandle)> = Vec::new();
        self.pending.retain(|&(deadline, handle)| {
            if deadline <= now {
                due.push((deadline, handle));
                false
            } else {
                true
            }
        });
        due.sort();
        due.into_iter().map(|(_, handle)| handle).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|&(deadline, _)| deadline).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Ticker for TimerQueue {
    fn arm(&mut self, policy: TickPolicy) -> ScheduledTickHandle {
        self.arm_at(policy, Instant::now())
    }

    fn cancel(&mut self, handle: ScheduledTickHandle) {
        self.pending.retain(|&(_, h)| h != handle);
    }
}
