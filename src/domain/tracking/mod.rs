// ============================================================================
// Tracking Domain - Live Status Composition
// ============================================================================

pub mod progress;
pub mod live_status;

pub use progress::*;
pub use live_status::*;
