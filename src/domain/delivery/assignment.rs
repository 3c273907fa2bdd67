use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DeliveryError;
use super::events::{DeliveryAccepted, DeliveryCompleted, DeliveryPickedUp, LocationUpdated};
use super::geo::GeoPoint;
use super::location_history::{LocationHistory, LocationPing};
use super::value_objects::{eta_minutes, DeliveryStatus};

// ============================================================================
// Delivery Assignment
// ============================================================================
//
// One partner carrying one order. The `&self` methods validate a step and
// return the event describing it; the `apply_*` methods mutate. Every step
// after assignment must come from the assigned partner.
//
// ============================================================================

/// Inputs for a new assignment, resolved by the order aggregate
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub order_id: Uuid,
    pub partner_id: Uuid,
    pub estimated_minutes: i64,
    pub pickup_eta_minutes: i64,
    pub destination: Option<GeoPoint>,
    pub notes: Option<String>,
    pub history_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAssignment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub partner_id: Uuid,
    pub status: DeliveryStatus,

    pub assigned_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,

    pub estimated_pickup_at: DateTime<Utc>,
    pub estimated_delivery_at: DateTime<Utc>,
    pub estimated_minutes_remaining: Option<i64>,

    pub destination: Option<GeoPoint>,
    pub current_position: Option<GeoPoint>,
    pub last_location_at: Option<DateTime<Utc>>,
    pub distance_remaining_km: Option<f64>,
    /// First distance ever reported; the baseline for distance covered
    pub initial_distance_km: Option<f64>,
    /// Closest the partner has been; detours never reduce distance covered
    pub closest_distance_km: Option<f64>,

    pub notes: Option<String>,
    pub delivery_notes: Option<String>,
    pub signature: Option<String>,
    pub proof_image: Option<String>,
    pub total_delivery_minutes: Option<i64>,

    history: LocationHistory,
}

impl DeliveryAssignment {
    pub fn assign(new: NewAssignment, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: new.order_id,
            partner_id: new.partner_id,
            status: DeliveryStatus::Assigned,
            assigned_at: at,
            accepted_at: None,
            picked_up_at: None,
            delivered_at: None,
            failed_at: None,
            estimated_pickup_at: at + Duration::minutes(new.pickup_eta_minutes),
            estimated_delivery_at: at + Duration::minutes(new.estimated_minutes),
            estimated_minutes_remaining: Some(new.estimated_minutes),
            destination: new.destination,
            current_position: None,
            last_location_at: None,
            distance_remaining_km: None,
            initial_distance_km: None,
            closest_distance_km: None,
            notes: new.notes,
            delivery_notes: None,
            signature: None,
            proof_image: None,
            total_delivery_minutes: None,
            history: LocationHistory::with_capacity(new.history_capacity),
        }
    }

    pub fn history(&self) -> &LocationHistory {
        &self.history
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn ensure_partner(&self, partner_id: Uuid) -> Result<(), DeliveryError> {
        if self.partner_id == partner_id {
            Ok(())
        } else {
            Err(DeliveryError::NotAssignedPartner {
                assignment_id: self.id,
                partner_id,
            })
        }
    }

    /// ASSIGNED → ACCEPTED
    pub fn accept(&self, partner_id: Uuid, at: DateTime<Utc>) -> Result<DeliveryAccepted, DeliveryError> {
        self.ensure_partner(partner_id)?;
        self.expect_status(DeliveryStatus::Assigned, DeliveryStatus::Accepted)?;

        Ok(DeliveryAccepted {
            assignment_id: self.id,
            accepted_at: at,
        })
    }

    /// ACCEPTED → PICKED_UP
    pub fn pick_up(
        &self,
        partner_id: Uuid,
        position: Option<GeoPoint>,
        at: DateTime<Utc>,
    ) -> Result<DeliveryPickedUp, DeliveryError> {
        self.ensure_partner(partner_id)?;
        self.expect_status(DeliveryStatus::Accepted, DeliveryStatus::PickedUp)?;
        if let Some(position) = &position {
            position.validate()?;
        }

        Ok(DeliveryPickedUp {
            assignment_id: self.id,
            position,
            picked_up_at: at,
        })
    }

    /// Resolve distance and ETA for a new position.
    ///
    /// A caller-supplied distance wins (it may be road distance); otherwise
    /// the great-circle distance to the destination is used; otherwise the
    /// previous distance and ETA stand.
    pub fn update_location(
        &self,
        partner_id: Uuid,
        position: GeoPoint,
        distance_remaining_km: Option<f64>,
        average_speed_kmh: f64,
        at: DateTime<Utc>,
    ) -> Result<LocationUpdated, DeliveryError> {
        self.ensure_partner(partner_id)?;
        if !self.status.is_in_transit() {
            return Err(DeliveryError::NotInTransit(self.status));
        }
        position.validate()?;
        if let Some(km) = distance_remaining_km {
            if !km.is_finite() || km < 0.0 {
                return Err(DeliveryError::InvalidDistance(km));
            }
        }

        let distance = distance_remaining_km.or_else(|| {
            self.destination
                .map(|destination| position.great_circle_km(&destination))
        });

        let estimated_minutes_remaining = match distance {
            Some(km) => Some(eta_minutes(km, average_speed_kmh)),
            None => self.estimated_minutes_remaining,
        };

        Ok(LocationUpdated {
            assignment_id: self.id,
            position,
            distance_remaining_km: distance.or(self.distance_remaining_km),
            estimated_minutes_remaining,
            recorded_at: at,
        })
    }

    /// PICKED_UP / OUT_FOR_DELIVERY → DELIVERED
    pub fn deliver(
        &self,
        partner_id: Uuid,
        notes: Option<String>,
        signature: Option<String>,
        proof_image: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<DeliveryCompleted, DeliveryError> {
        self.ensure_partner(partner_id)?;
        if !self.status.is_in_transit() {
            return Err(DeliveryError::InvalidTransition {
                assignment_id: self.id,
                from: self.status,
                to: DeliveryStatus::Delivered,
            });
        }

        Ok(DeliveryCompleted {
            assignment_id: self.id,
            notes,
            signature,
            proof_image,
            total_delivery_minutes: (at - self.assigned_at).num_minutes().max(0),
            delivered_at: at,
        })
    }

    pub fn apply_accepted(&mut self, event: &DeliveryAccepted) {
        self.status = DeliveryStatus::Accepted;
        self.accepted_at = Some(event.accepted_at);
    }

    pub fn apply_picked_up(&mut self, event: &DeliveryPickedUp) {
        self.status = DeliveryStatus::PickedUp;
        self.picked_up_at = Some(event.picked_up_at);
        if let Some(position) = event.position {
            self.current_position = Some(position);
            self.last_location_at = Some(event.picked_up_at);
        }
    }

    pub fn apply_location(&mut self, event: &LocationUpdated) {
        // first ping after pickup means the partner is on the road
        if self.status == DeliveryStatus::PickedUp {
            self.status = DeliveryStatus::OutForDelivery;
        }

        self.current_position = Some(event.position);
        self.last_location_at = Some(event.recorded_at);
        self.estimated_minutes_remaining = event.estimated_minutes_remaining;

        if let Some(km) = event.distance_remaining_km {
            self.distance_remaining_km = Some(km);
            if self.initial_distance_km.is_none() {
                self.initial_distance_km = Some(km);
            }
            self.closest_distance_km = Some(self.closest_distance_km.map_or(km, |closest| closest.min(km)));
        }

        self.history.push(LocationPing {
            position: event.position,
            distance_remaining_km: event.distance_remaining_km,
            recorded_at: event.recorded_at,
        });
    }

    pub fn apply_delivered(&mut self, event: &DeliveryCompleted) {
        self.status = DeliveryStatus::Delivered;
        self.delivered_at = Some(event.delivered_at);
        self.delivery_notes = event.notes.clone();
        self.signature = event.signature.clone();
        self.proof_image = event.proof_image.clone();
        self.total_delivery_minutes = Some(event.total_delivery_minutes);
        self.distance_remaining_km = Some(0.0);
        self.estimated_minutes_remaining = Some(0);
    }

    /// Mark FAILED unless already DELIVERED
    pub fn apply_failed(&mut self, at: DateTime<Utc>) {
        if self.status != DeliveryStatus::Delivered {
            self.status = DeliveryStatus::Failed;
            self.failed_at = Some(at);
        }
    }

    /// Best share of the route covered so far, in [0, 1]
    pub fn distance_covered_ratio(&self) -> f64 {
        if self.status == DeliveryStatus::Delivered {
            return 1.0;
        }
        match (self.initial_distance_km, self.closest_distance_km) {
            (Some(initial), Some(remaining)) if initial > 0.0 => (1.0 - remaining / initial).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    fn expect_status(&self, from: DeliveryStatus, to: DeliveryStatus) -> Result<(), DeliveryError> {
        if self.status == from {
            Ok(())
        } else {
            Err(DeliveryError::InvalidTransition {
                assignment_id: self.id,
                from: self.status,
                to,
            })
        }
    }
}
