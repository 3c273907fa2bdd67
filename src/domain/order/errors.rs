use crate::domain::delivery::{DeliveryError, DeliveryStatus};
use crate::domain::kitchen::KitchenError;
use crate::event_sourcing::core::EmptyStream;
use super::value_objects::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Cannot {action} an order in status {from}")]
    InvalidTransition {
        from: OrderStatus,
        action: &'static str,
    },

    #[error("Order is already {0}")]
    AlreadyTerminal(OrderStatus),

    #[error("Cannot mark ready: {done} of {total} items done")]
    IncompletePreparation { done: usize, total: usize },

    #[error("Only delivery orders can be assigned a delivery partner")]
    NotDeliveryOrder,

    #[error("Order has no delivery assignment")]
    NoDeliveryAssignment,

    #[error("Delivery must be DELIVERED before completion, currently {0}")]
    DeliveryNotCompleted(DeliveryStatus),

    #[error("Estimated minutes must not be negative: {0}")]
    InvalidEstimate(i64),

    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Invalid quantity for item {name}: {quantity}")]
    InvalidQuantity { name: String, quantity: u32 },

    #[error("Order total cannot be negative: {0}")]
    NegativeTotal(i64),

    #[error("Cancellation reason is required")]
    MissingReason,

    #[error("Order stream must start with OrderPlaced")]
    NotInitialized,

    #[error(transparent)]
    Kitchen(#[from] KitchenError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Empty(#[from] EmptyStream),
}
