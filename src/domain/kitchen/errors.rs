use uuid::Uuid;
use super::value_objects::TicketItemState;

// ============================================================================
// Kitchen Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KitchenError {
    #[error("Kitchen ticket item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("Ticket item {item_id} cannot move from {from} to {to}")]
    InvalidItemTransition {
        item_id: Uuid,
        from: TicketItemState,
        to: TicketItemState,
    },

    #[error("Assignment refers to an item that is not on this order: {0}")]
    UnknownOrderItem(Uuid),

    #[error("Kitchen ticket was halted; item {0} can no longer progress")]
    Halted(Uuid),
}
