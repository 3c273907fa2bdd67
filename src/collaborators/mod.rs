// ============================================================================
// External Collaborators
// ============================================================================
//
// Interfaces the core calls but does not implement: authorization,
// notification, payment and the cancellation policy hook. Each comes with
// simple in-process implementations used by the binary and the tests.
//
// ============================================================================

pub mod auth;
pub mod notification;
pub mod payment;
pub mod cancellation;

pub use auth::*;
pub use notification::*;
pub use payment::*;
pub use cancellation::*;

use crate::utils::IsTransient;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

impl IsTransient for CollaboratorError {
    fn is_transient(&self) -> bool {
        matches!(self, CollaboratorError::Unavailable(_))
    }
}
