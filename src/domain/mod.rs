// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each area has its own subdirectory:
// - order: the fulfillment state machine (aggregate + command handler)
// - kitchen: per-item preparation tracking
// - delivery: partner assignment and live position
// - timeline: append-only activity feed
// - tracking: read-only live status composition
//
// This layer is completely separate from the event sourcing infrastructure.
//
// ============================================================================

pub mod order;
pub mod kitchen;
pub mod delivery;
pub mod timeline;
pub mod tracking;
