use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::delivery::GeoPoint;
use crate::domain::kitchen::ItemAssignment;

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

#[derive(Debug, Clone)]
pub enum OrderCommand {
    Confirm {
        notes: Option<String>,
    },
    StartPreparation {
        estimated_minutes: i64,
        assignments: Vec<ItemAssignment>,
        notes: Option<String>,
    },
    StartItem {
        ticket_item_id: Uuid,
        preparer: Option<Uuid>,
        station: Option<String>,
        notes: Option<String>,
    },
    CompleteItem {
        ticket_item_id: Uuid,
        notes: Option<String>,
    },
    MarkReady,
    AssignDelivery {
        partner_id: Uuid,
        estimated_minutes: i64,
        notes: Option<String>,
    },
    AcceptDelivery,
    PickUp {
        position: Option<GeoPoint>,
    },
    UpdateLocation {
        position: GeoPoint,
        distance_remaining_km: Option<f64>,
    },
    Deliver {
        notes: Option<String>,
        signature: Option<String>,
        proof_image: Option<String>,
    },
    Complete,
    Cancel {
        reason: String,
    },
}

impl OrderCommand {
    pub fn name(&self) -> &'static str {
        match self {
            OrderCommand::Confirm { .. } => "confirm",
            OrderCommand::StartPreparation { .. } => "start_preparation",
            OrderCommand::StartItem { .. } => "start_item",
            OrderCommand::CompleteItem { .. } => "complete_item",
            OrderCommand::MarkReady => "mark_ready",
            OrderCommand::AssignDelivery { .. } => "assign_delivery",
            OrderCommand::AcceptDelivery => "accept_delivery",
            OrderCommand::PickUp { .. } => "pick_up",
            OrderCommand::UpdateLocation { .. } => "update_location",
            OrderCommand::Deliver { .. } => "deliver",
            OrderCommand::Complete => "complete",
            OrderCommand::Cancel { .. } => "cancel",
        }
    }
}

/// Per-command inputs the aggregate may not compute itself
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub actor: Uuid,
    pub at: DateTime<Utc>,
    pub average_speed_kmh: f64,
    pub pickup_eta_minutes: i64,
    pub location_history_capacity: usize,
}

impl CommandContext {
    pub fn new(actor: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            actor,
            at,
            average_speed_kmh: 30.0,
            pickup_eta_minutes: 10,
            location_history_capacity: 50,
        }
    }
}
