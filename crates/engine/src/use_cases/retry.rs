//! Retry of read-modify-commit cycles that lost a version race.
//!
//! A `Conflict` from the store proves nothing was written, so the whole
//! operation can be repeated from a fresh read. Any other failure is returned
//! to the caller untouched.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Configuration for conflict retries.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt (0 = no retries)
    pub max_retries: u32,
    /// Base delay in milliseconds before the first retry
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,
    /// Jitter factor (0.0-1.0) so racing callers do not collide again
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 10,
            max_delay_ms: 250,
            jitter_factor: 0.5,
        }
    }
}

impl RetryPolicy {
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Retry immediately, without sleeping between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter_factor: 0.0,
        }
    }

    /// Exponential backoff with jitter for the given retry number (1-based).
    fn calculate_delay(&self, attempt: u32) -> u64 {
        let base = self.base_delay_ms;
        // Exponential: base * 2^(attempt-1)
        let exponential = base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        let capped = exponential.min(self.max_delay_ms);

        let jitter_range = (capped as f64 * self.jitter_factor) as i64;
        if jitter_range > 0 {
            let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            (capped as i64 + jitter).max(0) as u64
        } else {
            capped
        }
    }
}

/// Errors that can report a lost compare-and-commit.
pub trait ConflictAware {
    fn is_conflict(&self) -> bool;
}

/// Run `attempt` until it succeeds, fails with a non-conflict error, or the
/// retry budget is spent. The last conflict is returned when the budget runs
/// out.
pub async fn retry_on_conflict<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut attempt: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ConflictAware + Display,
{
    let mut retries = 0;
    loop {
        match attempt().await {
            Err(e) if e.is_conflict() && retries < policy.max_retries => {
                retries += 1;
                let delay_ms = policy.calculate_delay(retries);
                tracing::warn!(
                    operation,
                    retry = retries,
                    max_retries = policy.max_retries,
                    delay_ms,
                    error = %e,
                    "Settlement conflict, retrying from a fresh read"
                );
                if delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
            Err(e) if e.is_conflict() => {
                tracing::warn!(
                    operation,
                    retries,
                    error = %e,
                    "Settlement conflict persisted, giving up"
                );
                return Err(e);
            }
            other => return other,
        }
    }
}
