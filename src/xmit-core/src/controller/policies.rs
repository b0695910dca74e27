// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Retry policies for device supervision (§4.7): bounded-retry connection to
//! the transceiver and the audio device before the main loop starts.

use std::time::Duration;

use crate::error::RigError;

/// Policy for retrying a failed connection attempt.
pub trait RetryPolicy: Send + Sync {
    /// Whether a retry should be attempted given the error just observed.
    fn should_retry(&self, error: &RigError) -> bool;

    /// Delay before the next attempt.
    fn delay(&self) -> Duration;
}

/// Fixed-interval retry policy (§4.7 default: 10 seconds).
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// The reference deployment's own default device-reconnect interval.
    pub fn default_device() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl RetryPolicy for FixedDelay {
    fn should_retry(&self, error: &RigError) -> bool {
        error.is_transient()
    }

    fn delay(&self) -> Duration {
        self.delay
    }
}

/// No-retry policy: fail immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn should_retry(&self, _error: &RigError) -> bool {
        false
    }

    fn delay(&self) -> Duration {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_delay_retries_transient_errors() {
        let policy = FixedDelay::new(Duration::from_millis(10));
        assert!(policy.should_retry(&RigError::transient("timeout")));
        assert!(!policy.should_retry(&RigError::permanent("bad config")));
        assert_eq!(policy.delay(), Duration::from_millis(10));
    }

    #[test]
    fn no_retry_never_retries() {
        assert!(!NoRetry.should_retry(&RigError::transient("timeout")));
        assert_eq!(NoRetry.delay(), Duration::ZERO);
    }
}
