use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geo::GeoPoint;

// ============================================================================
// Delivery Events - payloads carried inside the order event stream
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DeliveryAccepted {
    pub assignment_id: Uuid,
    pub accepted_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DeliveryPickedUp {
    pub assignment_id: Uuid,
    pub position: Option<GeoPoint>,
    pub picked_up_at: DateTime<Utc>,
}

/// A location ping with the distance and ETA already resolved
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LocationUpdated {
    pub assignment_id: Uuid,
    pub position: GeoPoint,
    pub distance_remaining_km: Option<f64>,
    pub estimated_minutes_remaining: Option<i64>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DeliveryCompleted {
    pub assignment_id: Uuid,
    pub notes: Option<String>,
    pub signature: Option<String>,
    pub proof_image: Option<String>,
    pub total_delivery_minutes: i64,
    pub delivered_at: DateTime<Utc>,
}
