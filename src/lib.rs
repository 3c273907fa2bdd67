// ============================================================================
// kitchen_flow - restaurant order fulfillment core
// ============================================================================
//
// One order is one consistency unit: its status, kitchen ticket and delivery
// assignment change together under that order's lock, and every committed
// change lands on the order's timeline before the lock is released.
//
// ============================================================================

pub mod collaborators;
pub mod config;
pub mod domain;
pub mod errors;
pub mod event_sourcing;
pub mod metrics;
pub mod service;
pub mod utils;

pub use config::FulfillmentConfig;
pub use errors::FulfillmentError;
pub use service::{CancellationReceipt, FulfillmentService, OrderSnapshot};
