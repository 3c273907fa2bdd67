use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::domain::delivery::{
    DeliveryAccepted, DeliveryAssignment, DeliveryCompleted, DeliveryPickedUp, GeoPoint, LocationUpdated,
};
use crate::domain::kitchen::{ItemCompleted, ItemStarted, KitchenTicket};
use crate::event_sourcing::core::DomainEvent;
use super::value_objects::{CancellationRecord, OrderItem, OrderStatus, OrderTotals, OrderType};

// ============================================================================
// Order Events - Domain Events for Order Aggregate
// ============================================================================
//
// The order stream also carries the kitchen and delivery events, so one
// append covers the whole consistency unit.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    Placed(OrderPlaced),
    Confirmed(OrderConfirmed),
    PaymentCaptured(PaymentCaptured),
    PreparationStarted(PreparationStarted),
    ItemStarted(ItemStarted),
    ItemCompleted(ItemCompleted),
    MarkedReady(OrderMarkedReady),
    DeliveryAssigned(DeliveryAssigned),
    DeliveryAccepted(DeliveryAccepted),
    PickedUp(DeliveryPickedUp),
    LocationUpdated(LocationUpdated),
    Delivered(DeliveryCompleted),
    Completed(OrderCompleted),
    Cancelled(CancellationRecord),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Placed(_) => "OrderPlaced",
            OrderEvent::Confirmed(_) => "OrderConfirmed",
            OrderEvent::PaymentCaptured(_) => "PaymentCaptured",
            OrderEvent::PreparationStarted(_) => "PreparationStarted",
            OrderEvent::ItemStarted(_) => "TicketItemStarted",
            OrderEvent::ItemCompleted(_) => "TicketItemCompleted",
            OrderEvent::MarkedReady(_) => "OrderMarkedReady",
            OrderEvent::DeliveryAssigned(_) => "DeliveryAssigned",
            OrderEvent::DeliveryAccepted(_) => "DeliveryAccepted",
            OrderEvent::PickedUp(_) => "DeliveryPickedUp",
            OrderEvent::LocationUpdated(_) => "DeliveryLocationUpdated",
            OrderEvent::Delivered(_) => "DeliveryCompleted",
            OrderEvent::Completed(_) => "OrderCompleted",
            OrderEvent::Cancelled(_) => "OrderCancelled",
        }
    }
}

impl OrderEvent {
    /// Order status this event moves the order into, if any
    pub fn target_status(&self) -> Option<OrderStatus> {
        match self {
            OrderEvent::Placed(_) => Some(OrderStatus::Created),
            OrderEvent::Confirmed(_) => Some(OrderStatus::Confirmed),
            OrderEvent::PreparationStarted(_) => Some(OrderStatus::Preparing),
            OrderEvent::MarkedReady(_) => Some(OrderStatus::Ready),
            OrderEvent::DeliveryAssigned(_) => Some(OrderStatus::OutForDelivery),
            OrderEvent::Completed(_) => Some(OrderStatus::Completed),
            OrderEvent::Cancelled(_) => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::Placed(e) => e.placed_at,
            OrderEvent::Confirmed(e) => e.confirmed_at,
            OrderEvent::PaymentCaptured(e) => e.captured_at,
            OrderEvent::PreparationStarted(e) => e.started_at,
            OrderEvent::ItemStarted(e) => e.started_at,
            OrderEvent::ItemCompleted(e) => e.completed_at,
            OrderEvent::MarkedReady(e) => e.ready_at,
            OrderEvent::DeliveryAssigned(e) => e.assignment.assigned_at,
            OrderEvent::DeliveryAccepted(e) => e.accepted_at,
            OrderEvent::PickedUp(e) => e.picked_up_at,
            OrderEvent::LocationUpdated(e) => e.recorded_at,
            OrderEvent::Delivered(e) => e.delivered_at,
            OrderEvent::Completed(e) => e.completed_at,
            OrderEvent::Cancelled(e) => e.cancelled_at,
        }
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Order Placed - admitted into fulfillment in CREATED
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderPlaced {
    pub restaurant_id: Uuid,
    pub customer_id: Uuid,
    pub order_type: OrderType,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub priority: i32,
    pub destination: Option<GeoPoint>,
    pub notes: Option<String>,
    pub placed_by: Uuid,
    pub placed_at: DateTime<Utc>,
}

/// Order Confirmed - accepted by the restaurant
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderConfirmed {
    pub confirmed_by: Uuid,
    pub notes: Option<String>,
    pub confirmed_at: DateTime<Utc>,
}

/// Payment Captured - charge succeeded at the configured trigger point
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PaymentCaptured {
    pub transaction_id: String,
    pub amount_cents: i64,
    pub captured_at: DateTime<Utc>,
}

/// Preparation Started - carries the fully built ticket so replay is exact
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PreparationStarted {
    pub ticket: KitchenTicket,
    pub estimated_minutes: i64,
    pub started_by: Uuid,
    pub notes: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Order Marked Ready - every ticket item is DONE
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderMarkedReady {
    pub marked_by: Uuid,
    pub ready_at: DateTime<Utc>,
}

/// Delivery Assigned - carries the new assignment as created
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DeliveryAssigned {
    pub assignment: DeliveryAssignment,
    pub assigned_by: Uuid,
}

/// Order Completed - handed over (counter) or delivered (delivery)
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderCompleted {
    pub completed_by: Uuid,
    pub completed_at: DateTime<Utc>,
}
