//! Message retry policy applied to every consumer endpoint.

use std::time::Duration;

/// Delays between consecutive delivery attempts of a failing message.
///
/// A policy with `n` intervals allows `n` retries (so `n + 1` attempts in
/// total) before the message is handed to the endpoint's error queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    intervals: Vec<Duration>,
}

impl RetryPolicy {
    /// The schedule every convention endpoint starts with: retry after 30s,
    /// then after another 60s, then give up.
    pub fn standard() -> Self {
        Self::intervals([Duration::from_secs(30), Duration::from_secs(60)])
    }

    /// A policy retrying after each of the given delays, in order.
    pub fn intervals(intervals: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            intervals: intervals.into_iter().collect(),
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }

    /// Number of retries after the first failed attempt.
    pub fn max_retries(&self) -> usize {
        self.intervals.len()
    }

    /// Delay before retry number `retry` (zero-based), or `None` when the
    /// policy is exhausted.
    pub fn delay(&self, retry: usize) -> Option<Duration> {
        self.intervals.get(retry).copied()
    }

    pub fn schedule(&self) -> &[Duration] {
        &self.intervals
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_schedule() {
        let policy = RetryPolicy::standard();
        assert_eq!(
            policy.schedule(),
            &[Duration::from_secs(30), Duration::from_secs(60)]
        );
        assert_eq!(policy.max_retries(), 2);
    }

    #[test]
    fn delay_is_none_once_exhausted() {
        let policy = RetryPolicy::standard();
        assert_eq!(policy.delay(0), Some(Duration::from_secs(30)));
        assert_eq!(policy.delay(1), Some(Duration::from_secs(60)));
        assert_eq!(policy.delay(2), None);
    }

    #[test]
    fn none_never_retries() {
        assert_eq!(RetryPolicy::none().delay(0), None);
        assert_eq!(RetryPolicy::none().max_retries(), 0);
    }
}
