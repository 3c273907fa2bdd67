use serde::{Deserialize, Serialize};

// ============================================================================
// Delivery Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Assigned,
    Accepted,
    PickedUp,
    OutForDelivery,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Assigned => "ASSIGNED",
            DeliveryStatus::Accepted => "ACCEPTED",
            DeliveryStatus::PickedUp => "PICKED_UP",
            DeliveryStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Failed => "FAILED",
        }
    }

    /// Holds the partner until DELIVERED or FAILED
    pub fn is_active(&self) -> bool {
        !matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Failed)
    }

    pub fn is_in_transit(&self) -> bool {
        matches!(self, DeliveryStatus::PickedUp | DeliveryStatus::OutForDelivery)
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minutes needed to cover `distance_km` at `speed_kmh`, rounded up
pub fn eta_minutes(distance_km: f64, speed_kmh: f64) -> i64 {
    if distance_km <= 0.0 || speed_kmh <= 0.0 {
        return 0;
    }
    (distance_km * 60.0 / speed_kmh).ceil() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eta_from_distance_and_speed() {
        assert_eq!(eta_minutes(2.5, 30.0), 5);
        assert_eq!(eta_minutes(2.6, 30.0), 6);
        assert_eq!(eta_minutes(0.0, 30.0), 0);
    }

    #[test]
    fn test_active_statuses() {
        assert!(DeliveryStatus::Assigned.is_active());
        assert!(DeliveryStatus::OutForDelivery.is_active());
        assert!(!DeliveryStatus::Delivered.is_active());
        assert!(!DeliveryStatus::Failed.is_active());
    }
}
