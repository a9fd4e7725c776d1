//! Injected delays: page pacing and retry backoff.

use std::time::Duration;

/// Courtesy delays applied between consecutive page requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    open_pull_requests_page_delay: Duration,
}

impl PacingPolicy {
    /// Delay used between pages of the open pull request listing.
    pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(2);

    /// Creates a policy with the given open pull request page delay.
    #[must_use]
    pub const fn new(open_pull_requests_page_delay: Duration) -> Self {
        Self {
            open_pull_requests_page_delay,
        }
    }

    /// Policy without any delays, for tests.
    #[must_use]
    pub const fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Delay applied after each page of the open pull request listing.
    #[must_use]
    pub const fn open_pull_requests_page_delay(&self) -> Duration {
        self.open_pull_requests_page_delay
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PAGE_DELAY)
    }
}

/// Bounded retry with a fixed delay between attempts.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use vigil::forge::pacing::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts(), 2);
/// assert_eq!(policy.delay_for(1), Duration::ZERO);
/// assert_eq!(policy.delay_for(2), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least one.
    #[must_use]
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        let attempts = if max_attempts == 0 { 1 } else { max_attempts };
        Self {
            max_attempts: attempts,
            backoff,
        }
    }

    /// Policy with `max_attempts` attempts and no waiting, for tests.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Total number of attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait before the given 1-based attempt.
    #[must_use]
    pub const fn delay_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            Duration::ZERO
        } else {
            self.backoff
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(10))
    }
}

/// Sleeps for `delay` unless it is zero.
pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{PacingPolicy, RetryPolicy};

    #[test]
    fn zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1)).max_attempts(), 1);
    }

    #[test]
    fn immediate_policies_never_wait() {
        assert_eq!(RetryPolicy::immediate(3).delay_for(3), Duration::ZERO);
        assert!(PacingPolicy::immediate()
            .open_pull_requests_page_delay()
            .is_zero());
    }
}
