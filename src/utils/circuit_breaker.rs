use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker for External Collaborators
// ============================================================================
//
// Guards calls to the notification and payment collaborators. After
// `failure_threshold` consecutive failures the breaker opens and calls are
// refused without touching the collaborator until `cool_down` has elapsed;
// then a probe is let through (HalfOpen) and `success_threshold` successes
// close it again.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cool_down: Duration,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cool_down: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    probe_successes: u32,
    opened_at: Option<Instant>,
}

#[derive(Clone)]
pub struct CircuitBreaker {
    name: &'static str,
    inner: Arc<Mutex<BreakerState>>,
    config: CircuitBreakerConfig,
}

#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    CircuitOpen,
    OperationFailed(E),
}

impl<E: std::fmt::Display> std::fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitBreakerError::CircuitOpen => write!(f, "circuit breaker is open"),
            CircuitBreakerError::OperationFailed(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error> std::error::Error for CircuitBreakerError<E> {}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            inner: Arc::new(Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                probe_successes: 0,
                opened_at: None,
            })),
            config,
        }
    }

    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        self.admit().await?;

        match operation.await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(error) => {
                self.on_failure().await;
                Err(CircuitBreakerError::OperationFailed(error))
            }
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    async fn admit<E>(&self) -> Result<(), CircuitBreakerError<E>> {
        let mut inner = self.inner.lock().await;
        if inner.state != CircuitState::Open {
            return Ok(());
        }

        let cooled = inner
            .opened_at
            .map(|opened| opened.elapsed() >= self.config.cool_down)
            .unwrap_or(true);

        if cooled {
            tracing::info!(collaborator = self.name, "Circuit breaker probing (half-open)");
            inner.state = CircuitState::HalfOpen;
            inner.probe_successes = 0;
            Ok(())
        } else {
            Err(CircuitBreakerError::CircuitOpen)
        }
    }

    async fn on_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.probe_successes += 1;
            if inner.probe_successes >= self.config.success_threshold {
                tracing::info!(collaborator = self.name, "Circuit breaker closed");
                inner.state = CircuitState::Closed;
                inner.opened_at = None;
            }
        }
    }

    async fn on_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures += 1;

        let trip = match inner.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.consecutive_failures >= self.config.failure_threshold,
            CircuitState::Open => false,
        };

        if trip {
            tracing::warn!(
                collaborator = self.name,
                failures = inner.consecutive_failures,
                "Circuit breaker opened"
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            inner.probe_successes = 0;
        }
    }
}
