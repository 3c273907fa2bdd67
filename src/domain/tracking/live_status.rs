use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::delivery::{DeliveryAssignment, DeliveryStatus, GeoPoint, LocationPing};
use crate::domain::kitchen::{KitchenTicket, KitchenTicketItem};
use crate::domain::order::{OrderAggregate, OrderStatus, OrderType};
use super::progress::{LinearProgress, ProgressInput, ProgressStrategy};

// ============================================================================
// Live Status Aggregator
// ============================================================================
//
// Read-only: a deterministic function of the order state and the read time.
// Nothing computed here is written back.
//
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct KitchenSummary {
    pub total_items: usize,
    pub items_prepared: usize,
    pub items_in_progress: usize,
    pub completion_ratio: f64,
    pub on_time_percentage: f64,
    pub elapsed_minutes: i64,
    pub estimated_ready_at: Option<DateTime<Utc>>,
    pub halted: bool,
    pub items: Vec<KitchenTicketItem>,
}

impl KitchenSummary {
    pub fn of(ticket: &KitchenTicket, now: DateTime<Utc>) -> Self {
        Self {
            total_items: ticket.total_items(),
            items_prepared: ticket.items_prepared(),
            items_in_progress: ticket.items_in_progress(),
            completion_ratio: ticket.completion_ratio(),
            on_time_percentage: ticket.on_time_percentage(),
            elapsed_minutes: ticket.elapsed_minutes(now),
            estimated_ready_at: ticket.estimated_ready_at,
            halted: ticket.is_halted(),
            items: ticket.items().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliverySummary {
    pub assignment_id: Uuid,
    pub partner_id: Uuid,
    pub status: DeliveryStatus,
    pub current_position: Option<GeoPoint>,
    pub last_location_at: Option<DateTime<Utc>>,
    pub distance_remaining_km: Option<f64>,
    pub estimated_minutes_remaining: Option<i64>,
    pub estimated_pickup_at: DateTime<Utc>,
    pub estimated_delivery_at: DateTime<Utc>,
    pub total_delivery_minutes: Option<i64>,
    pub recent_locations: Vec<LocationPing>,
}

impl DeliverySummary {
    pub fn of(assignment: &DeliveryAssignment) -> Self {
        Self {
            assignment_id: assignment.id,
            partner_id: assignment.partner_id,
            status: assignment.status,
            current_position: assignment.current_position,
            last_location_at: assignment.last_location_at,
            distance_remaining_km: assignment.distance_remaining_km,
            estimated_minutes_remaining: assignment.estimated_minutes_remaining,
            estimated_pickup_at: assignment.estimated_pickup_at,
            estimated_delivery_at: assignment.estimated_delivery_at,
            total_delivery_minutes: assignment.total_delivery_minutes,
            recent_locations: assignment.history().iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveStatus {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub status_display: &'static str,
    pub status_message: &'static str,
    pub next_status: Option<OrderStatus>,
    pub progress_percentage: u8,
    pub remaining_minutes: Option<i64>,
    pub can_cancel: bool,
    pub can_track_delivery: bool,
    pub elapsed_minutes: i64,
    pub kitchen: KitchenSummary,
    pub delivery: Option<DeliverySummary>,
}

pub struct LiveStatusAggregator {
    strategy: Arc<dyn ProgressStrategy>,
}

impl Default for LiveStatusAggregator {
    fn default() -> Self {
        Self::new(Arc::new(LinearProgress::default()))
    }
}

impl LiveStatusAggregator {
    pub fn new(strategy: Arc<dyn ProgressStrategy>) -> Self {
        Self { strategy }
    }

    pub fn compose(&self, order: &OrderAggregate, now: DateTime<Utc>) -> LiveStatus {
        LiveStatus {
            order_id: order.id,
            status: order.status,
            status_display: order.status.display_text(),
            status_message: order.status.message(order.order_type),
            next_status: order.status.next(order.order_type),
            progress_percentage: self.progress_percentage(order),
            remaining_minutes: remaining_minutes(order, now),
            can_cancel: can_cancel(order.status),
            can_track_delivery: can_track_delivery(order),
            elapsed_minutes: (now - order.created_at).num_minutes().max(0),
            kitchen: KitchenSummary::of(&order.kitchen, now),
            delivery: order.delivery.as_ref().map(DeliverySummary::of),
        }
    }

    pub fn progress_percentage(&self, order: &OrderAggregate) -> u8 {
        self.strategy.percentage(&ProgressInput {
            status: order.status,
            order_type: order.order_type,
            kitchen_ratio: order.kitchen.completion_ratio(),
            delivery_ratio: order
                .delivery
                .as_ref()
                .map(DeliveryAssignment::distance_covered_ratio)
                .unwrap_or(0.0),
        })
    }
}

/// Kitchen estimate while PREPARING, delivery estimate while OUT_FOR_DELIVERY
pub fn remaining_minutes(order: &OrderAggregate, now: DateTime<Utc>) -> Option<i64> {
    match order.status {
        OrderStatus::Preparing => order
            .estimated_ready_at
            .map(|ready| (ready - now).num_minutes().max(0)),
        OrderStatus::OutForDelivery => order
            .delivery
            .as_ref()
            .and_then(|d| d.estimated_minutes_remaining),
        _ => None,
    }
}

/// The normal UI affordance; the explicit cancel command is more permissive
pub fn can_cancel(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Created | OrderStatus::Confirmed | OrderStatus::Preparing
    )
}

pub fn can_track_delivery(order: &OrderAggregate) -> bool {
    if order.order_type != OrderType::Delivery {
        return false;
    }
    match order.status {
        OrderStatus::OutForDelivery => true,
        OrderStatus::Ready => order.delivery.is_some(),
        _ => false,
    }
}
