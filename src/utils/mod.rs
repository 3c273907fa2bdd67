pub mod circuit_breaker;
pub mod clock;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use retry::{retry_on_transient, IsTransient, RetryConfig, RetryResult};
