// Private module declaration
mod server;

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Committed order status transitions
// - Rejected commands by error kind
// - Per-order lock contention (wait time, timeouts)
// - Collaborator failures (notification, payment)
// - Active delivery assignments
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the fulfillment core
pub struct Metrics {
    registry: Registry,

    // State Machine Metrics
    pub order_transitions: IntCounterVec,
    pub commands_rejected: IntCounterVec,

    // Concurrency Metrics
    pub lock_wait_seconds: Histogram,
    pub lock_timeouts: IntCounter,

    // Collaborator Metrics
    pub notification_failures: IntCounterVec,
    pub payment_failures: IntCounter,

    // Delivery Metrics
    pub active_deliveries: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let order_transitions = IntCounterVec::new(
            Opts::new("order_transitions_total", "Committed order status transitions"),
            &["from", "to"],
        )?;
        registry.register(Box::new(order_transitions.clone()))?;

        let commands_rejected = IntCounterVec::new(
            Opts::new("order_commands_rejected_total", "Commands rejected, by error kind"),
            &["command", "reason"],
        )?;
        registry.register(Box::new(commands_rejected.clone()))?;

        let lock_wait_seconds = Histogram::with_opts(
            HistogramOpts::new("order_lock_wait_seconds", "Time spent waiting for an order lock")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        )?;
        registry.register(Box::new(lock_wait_seconds.clone()))?;

        let lock_timeouts = IntCounter::new(
            "order_lock_timeouts_total",
            "Commands that gave up waiting for an order lock",
        )?;
        registry.register(Box::new(lock_timeouts.clone()))?;

        let notification_failures = IntCounterVec::new(
            Opts::new("notification_failures_total", "Notifications that failed and were dropped"),
            &["kind"],
        )?;
        registry.register(Box::new(notification_failures.clone()))?;

        let payment_failures = IntCounter::new(
            "payment_failures_total",
            "Payment charges that failed and rolled back a transition",
        )?;
        registry.register(Box::new(payment_failures.clone()))?;

        let active_deliveries = IntGauge::new(
            "active_delivery_assignments",
            "Delivery assignments not yet DELIVERED or FAILED",
        )?;
        registry.register(Box::new(active_deliveries.clone()))?;

        Ok(Self {
            registry,
            order_transitions,
            commands_rejected,
            lock_wait_seconds,
            lock_timeouts,
            notification_failures,
            payment_failures,
            active_deliveries,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_transition(&self, from: &str, to: &str) {
        self.order_transitions.with_label_values(&[from, to]).inc();
    }

    pub fn record_rejection(&self, command: &str, reason: &str) {
        self.commands_rejected.with_label_values(&[command, reason]).inc();
    }

    pub fn record_lock_wait(&self, seconds: f64) {
        self.lock_wait_seconds.observe(seconds);
    }

    pub fn record_lock_timeout(&self) {
        self.lock_timeouts.inc();
    }

    pub fn record_notification_failure(&self, kind: &str) {
        self.notification_failures.with_label_values(&[kind]).inc();
    }

    pub fn record_payment_failure(&self) {
        self.payment_failures.inc();
    }

    pub fn set_active_deliveries(&self, count: usize) {
        self.active_deliveries.set(count as i64);
    }
}
