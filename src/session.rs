use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// What a poll session is doing right now.
///
/// A session holds at most one live thing: either a request in flight or a
/// timer armed for the next attempt. Keeping both in one tagged value means
/// the two can never coexist.
#[derive(Debug)]
pub(crate) enum Phase {
    /// Nothing live.
    Idle,
    /// One request in flight, cancellable through the token.
    Awaiting(CancellationToken),
    /// One timer armed, cancellable through the token.
    Scheduled(CancellationToken),
}

/// Mutable poll-session state: the live generation counter, the recorded
/// refresh interval and the current [`Phase`].
///
/// Attempts carry the generation they were started under and every
/// transition re-checks it, so an attempt that was superseded by a newer
/// `start()` or by `stop()` is refused and stays silent.
#[derive(Debug)]
pub(crate) struct Session {
    epoch: u64,
    refresh: Option<Duration>,
    phase: Phase,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            epoch: 0,
            refresh: None,
            phase: Phase::Idle,
        }
    }

    /// Interval recorded by the most recent `start()`.
    pub(crate) fn refresh_interval(&self) -> Option<Duration> {
        self.refresh
    }

    /// Cancels whatever is live, records the new interval and moves to the
    /// next generation. Both `start()` and `stop()` funnel through here.
    pub(crate) fn supersede(&mut self, refresh: Option<Duration>) -> u64 {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => {}
            Phase::Awaiting(token) | Phase::Scheduled(token) => token.cancel(),
        }
        self.refresh = refresh;
        self.epoch += 1;
        self.epoch
    }

    /// Marks one request in flight. Refused when `epoch` is no longer the
    /// live generation.
    pub(crate) fn begin_attempt(&mut self, epoch: u64, cancel: CancellationToken) -> bool {
        if self.epoch != epoch {
            return false;
        }
        self.phase = Phase::Awaiting(cancel);
        true
    }

    /// Clears the in-flight marker once the attempt settled. Returns false
    /// when the attempt belongs to a superseded generation and its outcome
    /// must be discarded.
    pub(crate) fn settle(&mut self, epoch: u64) -> bool {
        if self.epoch != epoch {
            return false;
        }
        self.phase = Phase::Idle;
        true
    }

    /// Arms the timer for the next attempt. Refused when superseded.
    pub(crate) fn arm(&mut self, epoch: u64, cancel: CancellationToken) -> bool {
        if self.epoch != epoch {
            return false;
        }
        self.phase = Phase::Scheduled(cancel);
        true
    }
}
