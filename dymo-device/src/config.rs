use std::time::Duration;

use crate::client::{DRAIN_TIMEOUT, REPLY_TIMEOUT};
use crate::poll::{Phase, PollPolicy};

/// Timing for one configuration session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Pause between two status queries
    pub poll_interval: Duration,
    /// Wait after switching the radio on; the device may ignore status
    /// queries before that
    pub settle_delay: Duration,
    pub radio_timeout: Option<Duration>,
    pub scan_timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    /// Per packet
    pub reply_timeout: Duration,
    /// Per packet while discarding stale input
    pub drain_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            settle_delay: Duration::from_secs(1),
            radio_timeout: Some(Duration::from_secs(30)),
            scan_timeout: Some(Duration::from_secs(30)),
            connect_timeout: Some(Duration::from_secs(60)),
            reply_timeout: REPLY_TIMEOUT,
            drain_timeout: DRAIN_TIMEOUT,
        }
    }
}

impl SessionConfig {
    pub fn policy(&self, phase: Phase) -> PollPolicy {
        let max_wait = match phase {
            Phase::RadioReady => self.radio_timeout,
            Phase::ScanComplete => self.scan_timeout,
            Phase::Connect => self.connect_timeout,
        };
        PollPolicy {
            interval: self.poll_interval,
            max_wait,
        }
    }

    /// Same bound for every phase; `None` polls until the device answers
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.radio_timeout = max_wait;
        self.scan_timeout = max_wait;
        self.connect_timeout = max_wait;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_phase_policy() {
        let config = SessionConfig::default();
        assert_eq!(config.policy(Phase::Connect).max_wait, Some(Duration::from_secs(60)));
        assert_eq!(config.policy(Phase::ScanComplete).interval, Duration::from_secs(1));

        let unbounded = config.with_max_wait(None);
        assert_eq!(unbounded.policy(Phase::RadioReady).max_wait, None);
        assert_eq!(unbounded.reply_timeout, Duration::from_millis(3000));
    }
}
