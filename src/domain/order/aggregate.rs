use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};

use crate::domain::delivery::{DeliveryAssignment, DeliveryStatus, GeoPoint, NewAssignment};
use crate::domain::kitchen::{KitchenTicket, PreparationMetrics};
use crate::event_sourcing::core::Aggregate;
use super::value_objects::*;
use super::events::*;
use super::commands::{CommandContext, OrderCommand};
use super::errors::OrderError;

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================
//
// The order, its kitchen ticket and its delivery assignment form one
// consistency unit. Kitchen and delivery rules live in their own modules;
// this aggregate decides when they may run and folds their events in.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAggregate {
    // Identity
    pub id: Uuid,
    pub version: i64,

    // Facts fixed at placement
    pub restaurant_id: Uuid,
    pub customer_id: Uuid,
    pub order_type: OrderType,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub priority: i32,
    pub destination: Option<GeoPoint>,
    pub notes: Option<String>,

    // Current State (derived from events)
    pub status: OrderStatus,
    pub kitchen: KitchenTicket,
    pub delivery: Option<DeliveryAssignment>,
    pub preparation_metrics: PreparationMetrics,
    pub payment_transaction_id: Option<String>,
    pub cancellation: Option<CancellationRecord>,
    pub status_history: Vec<StatusChange>,

    // Audit Trail
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub preparation_started_at: Option<DateTime<Utc>>,
    pub estimated_ready_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub out_for_delivery_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl OrderAggregate {
    /// Validate a placed order and build the first event of its stream
    pub fn place(
        order_id: Uuid,
        order: &NewOrder,
        placed_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(Self, OrderEvent), OrderError> {
        Self::validate_items(&order.items)?;
        if order.totals.total_cents < 0 {
            return Err(OrderError::NegativeTotal(order.totals.total_cents));
        }
        if let Some(destination) = &order.destination {
            destination.validate()?;
        }

        let event = OrderEvent::Placed(OrderPlaced {
            restaurant_id: order.restaurant_id,
            customer_id: order.customer_id,
            order_type: order.order_type,
            items: order.items.clone(),
            totals: order.totals.clone(),
            priority: order.priority,
            destination: order.destination,
            notes: order.notes.clone(),
            placed_by,
            placed_at: at,
        });

        let aggregate = Self::apply_first_event(order_id, &event)?;
        Ok((aggregate, event))
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Cancelling now would pull back a partner who has already picked up.
    /// An ASSIGNED or ACCEPTED partner has not left the restaurant yet.
    pub fn is_in_transit(&self) -> bool {
        self.status == OrderStatus::OutForDelivery
            && self.delivery.as_ref().is_some_and(|d| d.status.is_in_transit())
    }

    fn validate_items(items: &[OrderItem]) -> Result<(), OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyItems);
        }

        for item in items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    name: item.name.clone(),
                    quantity: item.quantity,
                });
            }
        }

        Ok(())
    }

    fn require(&self, expected: OrderStatus, action: &'static str) -> Result<(), OrderError> {
        if self.is_terminal() {
            return Err(OrderError::AlreadyTerminal(self.status));
        }
        if self.status != expected {
            return Err(OrderError::InvalidTransition { from: self.status, action });
        }
        Ok(())
    }

    fn active_delivery(&self, action: &'static str) -> Result<&DeliveryAssignment, OrderError> {
        self.require(OrderStatus::OutForDelivery, action)?;
        self.delivery.as_ref().ok_or(OrderError::NoDeliveryAssignment)
    }

    fn transition(&mut self, to: OrderStatus, by: Uuid, notes: Option<String>, at: DateTime<Utc>) {
        self.status_history.push(StatusChange {
            from: Some(self.status),
            to,
            changed_by: by,
            notes,
            at,
        });
        self.status = to;
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for OrderAggregate {
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Context = CommandContext;
    type Error = OrderError;

    fn apply_first_event(aggregate_id: Uuid, event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            OrderEvent::Placed(e) => Ok(Self {
                id: aggregate_id,
                version: 1,
                restaurant_id: e.restaurant_id,
                customer_id: e.customer_id,
                order_type: e.order_type,
                items: e.items.clone(),
                totals: e.totals.clone(),
                priority: e.priority,
                destination: e.destination,
                notes: e.notes.clone(),
                status: OrderStatus::Created,
                kitchen: KitchenTicket::empty(aggregate_id, e.placed_at),
                delivery: None,
                preparation_metrics: PreparationMetrics::default(),
                payment_transaction_id: None,
                cancellation: None,
                status_history: vec![StatusChange {
                    from: None,
                    to: OrderStatus::Created,
                    changed_by: e.placed_by,
                    notes: e.notes.clone(),
                    at: e.placed_at,
                }],
                created_at: e.placed_at,
                updated_at: e.placed_at,
                confirmed_at: None,
                preparation_started_at: None,
                estimated_ready_at: None,
                ready_at: None,
                out_for_delivery_at: None,
                completed_at: None,
                cancelled_at: None,
            }),
            _ => Err(OrderError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) {
        self.version += 1;
        self.updated_at = event.occurred_at();

        match event {
            OrderEvent::Placed(_) => {
                // First event already applied
            }
            OrderEvent::Confirmed(e) => {
                self.transition(OrderStatus::Confirmed, e.confirmed_by, e.notes.clone(), e.confirmed_at);
                self.confirmed_at = Some(e.confirmed_at);
                self.preparation_metrics.record_confirmed(e.confirmed_at);
            }
            OrderEvent::PaymentCaptured(e) => {
                self.payment_transaction_id = Some(e.transaction_id.clone());
            }
            OrderEvent::PreparationStarted(e) => {
                self.transition(OrderStatus::Preparing, e.started_by, e.notes.clone(), e.started_at);
                self.kitchen = e.ticket.clone();
                self.preparation_started_at = Some(e.started_at);
                self.estimated_ready_at = e.ticket.estimated_ready_at;
                self.preparation_metrics
                    .record_kitchen_started(e.started_at, e.estimated_minutes);
            }
            OrderEvent::ItemStarted(e) => self.kitchen.apply_started(e),
            OrderEvent::ItemCompleted(e) => self.kitchen.apply_completed(e),
            OrderEvent::MarkedReady(e) => {
                self.transition(OrderStatus::Ready, e.marked_by, None, e.ready_at);
                self.ready_at = Some(e.ready_at);
                self.preparation_metrics.finalize(&self.kitchen, e.ready_at);
            }
            OrderEvent::DeliveryAssigned(e) => {
                let at = e.assignment.assigned_at;
                self.transition(OrderStatus::OutForDelivery, e.assigned_by, e.assignment.notes.clone(), at);
                self.delivery = Some(e.assignment.clone());
                self.out_for_delivery_at = Some(at);
            }
            OrderEvent::DeliveryAccepted(e) => {
                if let Some(delivery) = self.delivery.as_mut() {
                    delivery.apply_accepted(e);
                }
            }
            OrderEvent::PickedUp(e) => {
                if let Some(delivery) = self.delivery.as_mut() {
                    delivery.apply_picked_up(e);
                }
            }
            OrderEvent::LocationUpdated(e) => {
                if let Some(delivery) = self.delivery.as_mut() {
                    delivery.apply_location(e);
                }
            }
            OrderEvent::Delivered(e) => {
                if let Some(delivery) = self.delivery.as_mut() {
                    delivery.apply_delivered(e);
                }
            }
            OrderEvent::Completed(e) => {
                self.transition(OrderStatus::Completed, e.completed_by, None, e.completed_at);
                self.completed_at = Some(e.completed_at);
            }
            OrderEvent::Cancelled(e) => {
                self.transition(OrderStatus::Cancelled, e.cancelled_by, Some(e.reason.clone()), e.cancelled_at);
                self.cancelled_at = Some(e.cancelled_at);
                self.kitchen.halt(e.cancelled_at);
                if let Some(delivery) = self.delivery.as_mut() {
                    delivery.apply_failed(e.cancelled_at);
                }
                self.cancellation = Some(e.clone());
            }
        }
    }

    fn handle_command(
        &self,
        command: &Self::Command,
        ctx: &Self::Context,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::Confirm { notes } => {
                self.require(OrderStatus::Created, "confirm")?;

                Ok(vec![OrderEvent::Confirmed(OrderConfirmed {
                    confirmed_by: ctx.actor,
                    notes: notes.clone(),
                    confirmed_at: ctx.at,
                })])
            }

            OrderCommand::StartPreparation { estimated_minutes, assignments, notes } => {
                self.require(OrderStatus::Confirmed, "start preparing")?;
                if *estimated_minutes < 0 {
                    return Err(OrderError::InvalidEstimate(*estimated_minutes));
                }

                let ticket = KitchenTicket::initialize(
                    self.id,
                    self.created_at,
                    &self.items,
                    assignments,
                    self.priority,
                    ctx.at,
                    ctx.at + Duration::minutes(*estimated_minutes),
                )?;

                Ok(vec![OrderEvent::PreparationStarted(PreparationStarted {
                    ticket,
                    estimated_minutes: *estimated_minutes,
                    started_by: ctx.actor,
                    notes: notes.clone(),
                    started_at: ctx.at,
                })])
            }

            OrderCommand::StartItem { ticket_item_id, preparer, station, notes } => {
                self.require(OrderStatus::Preparing, "start an item of")?;

                let started = self.kitchen.start_item(
                    *ticket_item_id,
                    *preparer,
                    station.clone(),
                    notes.clone(),
                    ctx.at,
                )?;
                Ok(vec![OrderEvent::ItemStarted(started)])
            }

            OrderCommand::CompleteItem { ticket_item_id, notes } => {
                self.require(OrderStatus::Preparing, "complete an item of")?;

                let completed = self.kitchen.complete_item(*ticket_item_id, notes.clone(), ctx.at)?;
                Ok(vec![OrderEvent::ItemCompleted(completed)])
            }

            OrderCommand::MarkReady => {
                self.require(OrderStatus::Preparing, "mark ready")?;
                if !self.kitchen.all_done() {
                    return Err(OrderError::IncompletePreparation {
                        done: self.kitchen.items_prepared(),
                        total: self.kitchen.total_items(),
                    });
                }

                Ok(vec![OrderEvent::MarkedReady(OrderMarkedReady {
                    marked_by: ctx.actor,
                    ready_at: ctx.at,
                })])
            }

            OrderCommand::AssignDelivery { partner_id, estimated_minutes, notes } => {
                if self.is_terminal() {
                    return Err(OrderError::AlreadyTerminal(self.status));
                }
                if !self.order_type.is_delivery() {
                    return Err(OrderError::NotDeliveryOrder);
                }
                self.require(OrderStatus::Ready, "assign delivery for")?;
                if *estimated_minutes < 0 {
                    return Err(OrderError::InvalidEstimate(*estimated_minutes));
                }

                let assignment = DeliveryAssignment::assign(
                    NewAssignment {
                        order_id: self.id,
                        partner_id: *partner_id,
                        estimated_minutes: *estimated_minutes,
                        pickup_eta_minutes: ctx.pickup_eta_minutes,
                        destination: self.destination,
                        notes: notes.clone(),
                        history_capacity: ctx.location_history_capacity,
                    },
                    ctx.at,
                );

                Ok(vec![OrderEvent::DeliveryAssigned(DeliveryAssigned {
                    assignment,
                    assigned_by: ctx.actor,
                })])
            }

            OrderCommand::AcceptDelivery => {
                let delivery = self.active_delivery("accept delivery for")?;
                Ok(vec![OrderEvent::DeliveryAccepted(delivery.accept(ctx.actor, ctx.at)?)])
            }

            OrderCommand::PickUp { position } => {
                let delivery = self.active_delivery("pick up")?;
                Ok(vec![OrderEvent::PickedUp(delivery.pick_up(ctx.actor, *position, ctx.at)?)])
            }

            OrderCommand::UpdateLocation { position, distance_remaining_km } => {
                let delivery = self.active_delivery("track")?;
                let update = delivery.update_location(
                    ctx.actor,
                    *position,
                    *distance_remaining_km,
                    ctx.average_speed_kmh,
                    ctx.at,
                )?;
                Ok(vec![OrderEvent::LocationUpdated(update)])
            }

            OrderCommand::Deliver { notes, signature, proof_image } => {
                let delivery = self.active_delivery("deliver")?;
                let delivered = delivery.deliver(
                    ctx.actor,
                    notes.clone(),
                    signature.clone(),
                    proof_image.clone(),
                    ctx.at,
                )?;
                Ok(vec![OrderEvent::Delivered(delivered)])
            }

            OrderCommand::Complete => {
                if self.order_type.is_delivery() {
                    let delivery = self.active_delivery("complete")?;
                    if delivery.status != DeliveryStatus::Delivered {
                        return Err(OrderError::DeliveryNotCompleted(delivery.status));
                    }
                } else {
                    self.require(OrderStatus::Ready, "complete")?;
                }

                Ok(vec![OrderEvent::Completed(OrderCompleted {
                    completed_by: ctx.actor,
                    completed_at: ctx.at,
                })])
            }

            OrderCommand::Cancel { reason } => {
                if self.is_terminal() {
                    return Err(OrderError::AlreadyTerminal(self.status));
                }
                if reason.trim().is_empty() {
                    return Err(OrderError::MissingReason);
                }

                Ok(vec![OrderEvent::Cancelled(CancellationRecord {
                    reason: reason.clone(),
                    cancelled_by: ctx.actor,
                    previous_status: self.status,
                    in_transit: self.is_in_transit(),
                    compensations: Vec::new(),
                    cancelled_at: ctx.at,
                })])
            }
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
