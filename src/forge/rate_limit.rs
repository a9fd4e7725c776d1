//! Rate limit information reported by the forge.
//!
//! The bot logs the remaining quota at the start and end of every run so
//! that a scan which exhausts the token's budget is easy to diagnose.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;

/// Rate limit window for the authenticated token.
///
/// # Example
///
/// ```
/// use vigil::forge::rate_limit::RateLimitInfo;
///
/// let info = RateLimitInfo::new(5000, 4999, 1700000000);
/// assert!(!info.is_exhausted());
/// assert_eq!(info.used(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    limit: u32,
    remaining: u32,
    reset_at: u64,
}

impl RateLimitInfo {
    /// Creates a new rate limit info instance.
    #[must_use]
    pub const fn new(limit: u32, remaining: u32, reset_at: u64) -> Self {
        Self {
            limit,
            remaining,
            reset_at,
        }
    }

    /// Returns the maximum requests allowed in the current window.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Returns the remaining requests in the current window.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Returns the number of requests already spent in the current window.
    #[must_use]
    pub const fn used(&self) -> u32 {
        self.limit.saturating_sub(self.remaining)
    }

    /// Returns the Unix timestamp when the rate limit resets.
    #[must_use]
    pub const fn reset_at(&self) -> u64 {
        self.reset_at
    }

    /// Returns true if the rate limit has been exhausted.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Calculates seconds until the rate limit resets.
    ///
    /// Returns 0 if the reset time has already passed or if the system time
    /// cannot be determined.
    #[must_use]
    pub fn seconds_until_reset(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_secs())
            .unwrap_or(0);

        self.reset_at.saturating_sub(now)
    }
}

/// Wire shape of `GET /rate_limit`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiRateLimitResponse {
    pub(crate) rate: ApiRate,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiRate {
    pub(crate) limit: u64,
    pub(crate) remaining: u64,
    pub(crate) reset: u64,
}

impl From<ApiRate> for RateLimitInfo {
    fn from(value: ApiRate) -> Self {
        Self::new(
            u32::try_from(value.limit).unwrap_or(u32::MAX),
            u32::try_from(value.remaining).unwrap_or(u32::MAX),
            value.reset,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use serde_json::json;

    use super::{ApiRateLimitResponse, RateLimitInfo};

    #[test]
    fn seconds_until_reset_returns_zero_when_reset_has_passed() {
        let info = RateLimitInfo::new(5000, 0, 0);
        assert_eq!(info.seconds_until_reset(), 0);
    }

    #[test]
    fn seconds_until_reset_returns_positive_for_future_reset() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be available")
            .as_secs();
        let info = RateLimitInfo::new(5000, 0, now + 60);

        let seconds = info.seconds_until_reset();
        assert!(
            (1..=60).contains(&seconds),
            "expected 1..=60 seconds until reset, got {seconds}"
        );
    }

    #[test]
    fn rate_limit_response_converts_core_rate() {
        let response: ApiRateLimitResponse = serde_json::from_value(json!({
            "resources": {
                "core": { "limit": 5000, "used": 12, "remaining": 4988, "reset": 1_700_000_000 }
            },
            "rate": { "limit": 5000, "used": 12, "remaining": 4988, "reset": 1_700_000_000 }
        }))
        .expect("rate limit response should deserialise");

        let info = RateLimitInfo::from(response.rate);
        assert_eq!(info.limit(), 5000);
        assert_eq!(info.used(), 12);
        assert_eq!(info.reset_at(), 1_700_000_000);
    }
}
