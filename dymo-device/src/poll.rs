//! Status polling: query, judge, sleep, repeat
//!
//! One loop serves every wait in the setup sequence; what differs is the
//! predicate ([`radio_ready`], [`scan_complete`], [`connection_result`]) and
//! the [`PollPolicy`].

use std::fmt;
use std::time::{Duration, Instant};

use log::debug;

use dymo_proto::{ConnectionOutcome, NetworkStatus};

use crate::{CancelToken, Error};

/// Result of judging one status snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Success,
    /// Terminal failure with the observed status code
    Fatal(u8),
}

/// Which wait a poll loop is performing, for progress and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    RadioReady,
    ScanComplete,
    Connect,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::RadioReady => write!(f, "starting up wifi"),
            Phase::ScanComplete => write!(f, "scanning for wifi networks"),
            Phase::Connect => write!(f, "connecting to wifi"),
        }
    }
}

pub fn radio_ready(status: &NetworkStatus) -> Verdict {
    if status.is_radio_ready() {
        Verdict::Success
    } else {
        Verdict::Continue
    }
}

pub fn scan_complete(status: &NetworkStatus) -> Verdict {
    if status.is_scan_complete() {
        Verdict::Success
    } else {
        Verdict::Continue
    }
}

pub fn connection_result(status: &NetworkStatus) -> Verdict {
    match status.connection_outcome() {
        ConnectionOutcome::Connected => Verdict::Success,
        ConnectionOutcome::Failed(code) => Verdict::Fatal(code),
        ConnectionOutcome::Pending => Verdict::Continue,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` waits forever
    pub max_wait: Option<Duration>,
}

/// Time source for the poller
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when slept on. Records every sleep.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone)]
pub struct ManualClock {
    start: Instant,
    elapsed: Duration,
    pub sleeps: Vec<Duration>,
}

#[cfg(any(test, feature = "test-util"))]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Duration::ZERO,
            sleeps: Vec::new(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed
    }

    fn sleep(&mut self, duration: Duration) {
        self.elapsed += duration;
        self.sleeps.push(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Outcome of a successful poll loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polled<S> {
    pub status: S,
    pub ticks: u32,
}

pub struct Poller<C = SystemClock> {
    policy: PollPolicy,
    clock: C,
    cancel: CancelToken,
}

impl<C: Clock> Poller<C> {
    pub fn new(policy: PollPolicy, clock: C, cancel: CancelToken) -> Self {
        Self { policy, clock, cancel }
    }

    /// Run `query` until `judge` says success or fatal.
    ///
    /// `observe` sees every snapshot that did not end the loop. Query errors
    /// end the loop unchanged. The loop never sleeps past `max_wait`.
    pub fn run<S, Q, J, O>(&mut self, phase: Phase, mut query: Q, mut judge: J, mut observe: O) -> Result<Polled<S>, Error>
    where
        Q: FnMut() -> Result<S, Error>,
        J: FnMut(&S) -> Verdict,
        O: FnMut(&S, u32),
    {
        let started = self.clock.now();
        let mut ticks = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let status = query()?;
            ticks += 1;

            match judge(&status) {
                Verdict::Success => {
                    debug!("{phase}: done after {ticks} tick(s)");
                    return Ok(Polled { status, ticks });
                }
                Verdict::Fatal(code) => return Err(Error::FatalStatus { phase, code }),
                Verdict::Continue => observe(&status, ticks),
            }

            let waited = self.clock.now().saturating_duration_since(started);
            if let Some(max_wait) = self.policy.max_wait {
                if waited + self.policy.interval > max_wait {
                    return Err(Error::Timeout { phase, waited, ticks });
                }
            }
            self.clock.sleep(self.policy.interval);
        }
    }
}
