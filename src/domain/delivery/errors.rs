use uuid::Uuid;
use super::value_objects::DeliveryStatus;

// ============================================================================
// Delivery Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeliveryError {
    #[error("Delivery assignment {assignment_id} cannot move from {from} to {to}")]
    InvalidTransition {
        assignment_id: Uuid,
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    #[error("Location updates are only accepted while picked up or out for delivery, not {0}")]
    NotInTransit(DeliveryStatus),

    #[error("Partner {partner_id} is not assigned to delivery {assignment_id}")]
    NotAssignedPartner { assignment_id: Uuid, partner_id: Uuid },

    #[error("Delivery partner {partner_id} already holds active assignment {assignment_id}")]
    PartnerUnavailable { partner_id: Uuid, assignment_id: Uuid },

    #[error("Invalid coordinates: ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Invalid remaining distance: {0} km")]
    InvalidDistance(f64),
}
