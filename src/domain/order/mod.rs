// ============================================================================
// Order Domain - Business Logic for Order Aggregate
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (OrderItem, OrderStatus, OrderType, NewOrder)
// - Events (OrderPlaced, OrderConfirmed, PreparationStarted, etc.)
// - Commands (OrderCommand and its CommandContext)
// - Errors (OrderError enum)
// - Aggregate (OrderAggregate, the fulfillment state machine)
// - Command Handler (OrderCommandHandler)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use command_handler::*;
