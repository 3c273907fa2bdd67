// ============================================================================
// Timeline Domain - Customer-Facing Activity Feed
// ============================================================================

pub mod value_objects;
pub mod recorder;
pub mod entries;

pub use value_objects::*;
pub use recorder::*;
pub use entries::*;
