// ============================================================================
// Kitchen Domain - Per-Item Preparation Tracking
// ============================================================================
//
// - Value objects (TicketItemState, KitchenTicketItem, ItemAssignment)
// - Events (ItemStarted, ItemCompleted)
// - Errors (KitchenError)
// - Ticket (KitchenTicket, the tracker for one order)
// - Metrics (PreparationMetrics)
//
// The ticket lives inside the order aggregate and is only mutated while the
// order's stream is locked.
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod errors;
pub mod ticket;
pub mod metrics;

pub use value_objects::*;
pub use events::*;
pub use errors::*;
pub use ticket::*;
pub use metrics::*;
