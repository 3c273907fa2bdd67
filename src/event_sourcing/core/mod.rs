// ============================================================================
// Event Sourcing Core - Generic Abstractions
// ============================================================================
//
// No domain-specific code lives here; the order aggregate in src/domain/
// implements these traits.
//
// ============================================================================

pub mod aggregate;
pub mod event;

pub use aggregate::{Aggregate, EmptyStream};
pub use event::{DomainEvent, EventEnvelope};
