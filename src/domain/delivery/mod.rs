// ============================================================================
// Delivery Domain - Partner Assignment and Live Tracking
// ============================================================================
//
// - Value objects (DeliveryStatus, ETA helper)
// - Geo (GeoPoint, great-circle distance)
// - Location history (bounded ring buffer of pings)
// - Events (accepted, picked up, location, delivered)
// - Errors (DeliveryError)
// - Assignment (DeliveryAssignment lifecycle)
// - Roster (one active assignment per partner)
//
// ============================================================================

pub mod value_objects;
pub mod geo;
pub mod location_history;
pub mod events;
pub mod errors;
pub mod assignment;
pub mod roster;

pub use value_objects::*;
pub use geo::*;
pub use location_history::*;
pub use events::*;
pub use errors::*;
pub use assignment::*;
pub use roster::*;
