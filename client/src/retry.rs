//! Reconnection retry policies.

use std::time::Duration;

/// Decides how long to wait before the next reconnection attempt.
///
/// The supervision loop asks for a delay after every failed connect or
/// dropped connection and resets the policy once a connection is
/// established.
pub trait RetryPolicy: Send + 'static {
    /// Delay before the next attempt, or `None` to stop retrying.
    fn next_delay(&mut self) -> Option<Duration>;

    /// Called after a successful connect.
    fn reset(&mut self);
}

/// Retry forever on a fixed delay.
///
/// This is the default: the supervisor never gives up and never backs off,
/// so a sustained outage produces one connect attempt per delay until the
/// relay returns. Deployments that need a cap inject [`BoundedRetry`]
/// instead.
#[derive(Clone, Copy, Debug)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

impl RetryPolicy for FixedDelay {
    fn next_delay(&mut self) -> Option<Duration> {
        Some(self.delay)
    }

    fn reset(&mut self) {}
}

/// Give up after a fixed number of consecutive failed attempts. The budget
/// refills on every successful connect.
#[derive(Clone, Copy, Debug)]
pub struct BoundedRetry {
    delay: Duration,
    attempts: usize,
    remaining: usize,
}

impl BoundedRetry {
    #[must_use]
    pub fn new(delay: Duration, attempts: usize) -> Self {
        Self { delay, attempts, remaining: attempts }
    }
}

impl RetryPolicy for BoundedRetry {
    fn next_delay(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.delay)
    }

    fn reset(&mut self) {
        self.remaining = self.attempts;
    }
}
