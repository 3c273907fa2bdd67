use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Bounded Exponential Backoff
// ============================================================================
//
// The fulfillment core never retries on its own. Callers that receive a
// transient rejection (lock contention on an order) wrap the command in
// `retry_on_transient`; every other rejection is returned on the first try.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    /// Upper bound for a single backoff sleep
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Short schedule for lock contention on a single order
    pub fn conservative() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        let scaled = (current.as_millis() as f64 * self.multiplier) as u64;
        Duration::from_millis(scaled).min(self.max_delay)
    }
}

#[derive(Debug)]
pub enum RetryResult<T, E> {
    Success(T),
    /// Still transient after the last attempt
    Failed(E),
    /// Rejected with a non-transient error; never retried
    PermanentFailure(E),
}

impl<T, E> RetryResult<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(value) => Ok(value),
            RetryResult::Failed(error) | RetryResult::PermanentFailure(error) => Err(error),
        }
    }
}

/// Classifies an error as worth retrying
pub trait IsTransient {
    fn is_transient(&self) -> bool;
}

/// Run `operation` until it succeeds, fails permanently or exhausts the schedule
pub async fn retry_on_transient<F, Fut, T, E>(
    config: RetryConfig,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display + IsTransient,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        let error = match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt = attempt, "Command succeeded after retry");
                }
                return RetryResult::Success(value);
            }
            Err(error) => error,
        };

        if !error.is_transient() {
            tracing::debug!(error = %error, "Permanent rejection, not retrying");
            return RetryResult::PermanentFailure(error);
        }

        if attempt >= config.max_attempts {
            tracing::warn!(
                attempt = attempt,
                error = %error,
                "Giving up after final attempt"
            );
            return RetryResult::Failed(error);
        }

        tracing::debug!(
            attempt = attempt,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "Transient rejection, backing off"
        );

        sleep(delay).await;
        delay = config.next_delay(delay);
    }
}
