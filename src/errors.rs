use std::time::Duration;

use uuid::Uuid;

use crate::collaborators::CollaboratorError;
use crate::domain::delivery::DeliveryError;
use crate::domain::kitchen::KitchenError;
use crate::domain::order::OrderError;
use crate::event_sourcing::StoreError;
use crate::utils::IsTransient;

// ============================================================================
// Fulfillment Errors - what every command returns
// ============================================================================
//
// Domain errors collapse into the kinds callers act on. Only `Busy` and
// `Timeout` are worth retrying; everything else is final for the request.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FulfillmentError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("preparation incomplete: {done} of {total} items done")]
    IncompletePreparation { done: usize, total: usize },

    #[error("delivery partner {partner_id} is unavailable")]
    PartnerUnavailable { partner_id: Uuid },

    #[error("user {user_id} lacks permission {permission}")]
    PermissionDenied { user_id: Uuid, permission: &'static str },

    #[error("order {order_id} is busy")]
    Busy { order_id: Uuid },

    #[error("timed out after {waited:?} waiting for order {order_id}")]
    Timeout { order_id: Uuid, waited: Duration },

    #[error("{dependency} failed: {message}")]
    DependencyFailure { dependency: &'static str, message: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl FulfillmentError {
    /// Stable label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            FulfillmentError::NotFound { .. } => "not_found",
            FulfillmentError::InvalidTransition(_) => "invalid_transition",
            FulfillmentError::IncompletePreparation { .. } => "incomplete_preparation",
            FulfillmentError::PartnerUnavailable { .. } => "partner_unavailable",
            FulfillmentError::PermissionDenied { .. } => "permission_denied",
            FulfillmentError::Busy { .. } => "busy",
            FulfillmentError::Timeout { .. } => "timeout",
            FulfillmentError::DependencyFailure { .. } => "dependency_failure",
            FulfillmentError::InvalidInput(_) => "invalid_input",
        }
    }

    pub(crate) fn dependency(dependency: &'static str, error: impl std::fmt::Display) -> Self {
        FulfillmentError::DependencyFailure {
            dependency,
            message: error.to_string(),
        }
    }
}

impl IsTransient for FulfillmentError {
    fn is_transient(&self) -> bool {
        matches!(self, FulfillmentError::Busy { .. } | FulfillmentError::Timeout { .. })
    }
}

impl From<KitchenError> for FulfillmentError {
    fn from(error: KitchenError) -> Self {
        match error {
            KitchenError::ItemNotFound(id) => FulfillmentError::NotFound { entity: "ticket item", id },
            KitchenError::UnknownOrderItem(_) => FulfillmentError::InvalidInput(error.to_string()),
            KitchenError::InvalidItemTransition { .. } | KitchenError::Halted(_) => {
                FulfillmentError::InvalidTransition(error.to_string())
            }
        }
    }
}

impl From<DeliveryError> for FulfillmentError {
    fn from(error: DeliveryError) -> Self {
        match error {
            DeliveryError::PartnerUnavailable { partner_id, .. } => {
                FulfillmentError::PartnerUnavailable { partner_id }
            }
            DeliveryError::NotAssignedPartner { partner_id, .. } => FulfillmentError::PermissionDenied {
                user_id: partner_id,
                permission: "delivery:assigned_partner",
            },
            DeliveryError::InvalidCoordinates { .. } | DeliveryError::InvalidDistance(_) => {
                FulfillmentError::InvalidInput(error.to_string())
            }
            DeliveryError::InvalidTransition { .. } | DeliveryError::NotInTransit(_) => {
                FulfillmentError::InvalidTransition(error.to_string())
            }
        }
    }
}

impl From<OrderError> for FulfillmentError {
    fn from(error: OrderError) -> Self {
        match error {
            OrderError::Kitchen(e) => e.into(),
            OrderError::Delivery(e) => e.into(),
            OrderError::IncompletePreparation { done, total } => {
                FulfillmentError::IncompletePreparation { done, total }
            }
            OrderError::InvalidTransition { .. }
            | OrderError::AlreadyTerminal(_)
            | OrderError::NotDeliveryOrder
            | OrderError::NoDeliveryAssignment
            | OrderError::DeliveryNotCompleted(_) => FulfillmentError::InvalidTransition(error.to_string()),
            OrderError::InvalidEstimate(_)
            | OrderError::EmptyItems
            | OrderError::InvalidQuantity { .. }
            | OrderError::NegativeTotal(_)
            | OrderError::MissingReason
            | OrderError::NotInitialized
            | OrderError::Empty(_) => FulfillmentError::InvalidInput(error.to_string()),
        }
    }
}

impl From<StoreError> for FulfillmentError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { aggregate_id, .. } => FulfillmentError::NotFound {
                entity: "order",
                id: aggregate_id,
            },
            StoreError::Busy { aggregate_id } => FulfillmentError::Busy { order_id: aggregate_id },
            StoreError::LockTimeout { aggregate_id, waited } => FulfillmentError::Timeout {
                order_id: aggregate_id,
                waited,
            },
            // another command committed first; the state this one validated is stale
            StoreError::ConcurrencyConflict { .. } => FulfillmentError::InvalidTransition(error.to_string()),
            StoreError::AlreadyExists { .. } | StoreError::EmptyAppend => {
                FulfillmentError::InvalidInput(error.to_string())
            }
        }
    }
}

impl From<CollaboratorError> for FulfillmentError {
    fn from(error: CollaboratorError) -> Self {
        FulfillmentError::dependency("collaborator", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::delivery::DeliveryStatus;
    use crate::domain::order::OrderStatus;

    #[test]
    fn test_only_contention_is_transient() {
        let id = Uuid::new_v4();
        assert!(FulfillmentError::Busy { order_id: id }.is_transient());
        assert!(FulfillmentError::Timeout { order_id: id, waited: Duration::from_millis(5) }.is_transient());
        assert!(!FulfillmentError::InvalidTransition("x".into()).is_transient());
        assert!(!FulfillmentError::dependency("payment", "declined").is_transient());
    }

    #[test]
    fn test_terminal_order_maps_to_invalid_transition() {
        let error: FulfillmentError = OrderError::AlreadyTerminal(OrderStatus::Cancelled).into();
        assert_eq!(error.kind(), "invalid_transition");
    }

    #[test]
    fn test_wrong_partner_maps_to_permission_denied() {
        let partner = Uuid::new_v4();
        let error: FulfillmentError = OrderError::Delivery(DeliveryError::NotAssignedPartner {
            assignment_id: Uuid::new_v4(),
            partner_id: partner,
        })
        .into();

        assert!(matches!(error, FulfillmentError::PermissionDenied { user_id, .. } if user_id == partner));
    }

    #[test]
    fn test_store_errors_map_to_kinds() {
        let id = Uuid::new_v4();
        let timeout: FulfillmentError = StoreError::LockTimeout { aggregate_id: id, waited: Duration::from_secs(1) }.into();
        let stale: FulfillmentError = StoreError::ConcurrencyConflict { expected: 2, actual: 3 }.into();
        let missing: FulfillmentError = StoreError::NotFound { aggregate_type: "Order", aggregate_id: id }.into();

        assert_eq!(timeout.kind(), "timeout");
        assert_eq!(stale.kind(), "invalid_transition");
        assert_eq!(missing, FulfillmentError::NotFound { entity: "order", id });
    }

    #[test]
    fn test_delivery_step_out_of_order_is_invalid_transition() {
        let error: FulfillmentError = DeliveryError::NotInTransit(DeliveryStatus::Assigned).into();
        assert_eq!(error.kind(), "invalid_transition");
    }
}
