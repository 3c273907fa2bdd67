use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::collaborators::{CurrentUser, Permission};
use crate::config::FulfillmentConfig;
use crate::domain::delivery::{DeliveryAssignment, GeoPoint, PartnerRoster};
use crate::domain::kitchen::{ItemAssignment, TicketItemState};
use crate::domain::order::{
    Collaborators, CommandOutcome, Compensation, NewOrder, OrderAggregate, OrderCommand,
    OrderCommandHandler, OrderEvent, OrderStatus,
};
use crate::domain::timeline::{TimelineEvent, TimelineRecorder};
use crate::domain::tracking::{LinearProgress, LiveStatus, LiveStatusAggregator};
use crate::errors::FulfillmentError;
use crate::event_sourcing::core::EventEnvelope;
use crate::event_sourcing::store::EventStore;
use crate::metrics::Metrics;
use crate::utils::Clock;

// ============================================================================
// Fulfillment Service - the public command and query surface
// ============================================================================
//
// Callers address kitchen work by ticket item id and delivery work by
// assignment id; both resolve to the owning order here and then run through
// the order's command handler under that order's lock.
//
// ============================================================================

/// What a cancel hands back to the caller
#[derive(Debug, Clone, Serialize)]
pub struct CancellationReceipt {
    pub order_id: Uuid,
    pub previous_status: OrderStatus,
    /// Set when a partner was already en route
    pub in_transit: bool,
    pub compensations: Vec<Compensation>,
    pub version: i64,
}

/// A consistent read of one order
#[derive(Debug, Clone, Serialize)]
pub struct OrderSnapshot {
    pub order: OrderAggregate,
    pub live: LiveStatus,
    pub timeline: Vec<TimelineEvent>,
}

/// Who may read an order without the `ViewOrder` capability
#[derive(Debug, Clone, Copy)]
struct Audience {
    customer_id: Uuid,
    restaurant_id: Uuid,
    partner_id: Option<Uuid>,
}

pub struct FulfillmentService {
    handler: OrderCommandHandler,
    timeline: Arc<TimelineRecorder>,
    roster: Arc<PartnerRoster>,
    live: LiveStatusAggregator,
    clock: Arc<dyn Clock>,
    ticket_items: RwLock<HashMap<Uuid, Uuid>>,
    assignments: RwLock<HashMap<Uuid, Uuid>>,
    audiences: RwLock<HashMap<Uuid, Audience>>,
}

impl FulfillmentService {
    pub fn new(
        config: FulfillmentConfig,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let store = Arc::new(EventStore::new("order", config.lock_timeout()));
        let timeline = Arc::new(TimelineRecorder::new(clock.clone()));
        let roster = Arc::new(PartnerRoster::new());
        let live = LiveStatusAggregator::new(Arc::new(LinearProgress::new(config.progress)));

        let handler = OrderCommandHandler::new(
            store,
            timeline.clone(),
            roster.clone(),
            collaborators,
            clock.clone(),
            metrics,
            config,
        );

        Self {
            handler,
            timeline,
            roster,
            live,
            clock,
            ticket_items: RwLock::new(HashMap::new()),
            assignments: RwLock::new(HashMap::new()),
            audiences: RwLock::new(HashMap::new()),
        }
    }

    // ========================================================================
    // Order state machine
    // ========================================================================

    pub async fn register_order(&self, user: &CurrentUser, order: NewOrder) -> Result<OrderAggregate, FulfillmentError> {
        let outcome = self.handler.place(user, order).await?;
        self.audiences.write().unwrap_or_else(|p| p.into_inner()).insert(
            outcome.order_id,
            Audience {
                customer_id: outcome.order.customer_id,
                restaurant_id: outcome.order.restaurant_id,
                partner_id: None,
            },
        );
        Ok(outcome.order)
    }

    pub async fn confirm(&self, user: &CurrentUser, order_id: Uuid) -> Result<OrderAggregate, FulfillmentError> {
        self.run(user, order_id, OrderCommand::Confirm { notes: None }).await
    }

    pub async fn start_preparation(
        &self,
        user: &CurrentUser,
        order_id: Uuid,
        estimated_minutes: i64,
        assignments: Vec<ItemAssignment>,
    ) -> Result<OrderAggregate, FulfillmentError> {
        let command = OrderCommand::StartPreparation {
            estimated_minutes,
            assignments,
            notes: None,
        };
        self.run(user, order_id, command).await
    }

    pub async fn mark_ready(&self, user: &CurrentUser, order_id: Uuid) -> Result<OrderAggregate, FulfillmentError> {
        self.run(user, order_id, OrderCommand::MarkReady).await
    }

    pub async fn assign_delivery(
        &self,
        user: &CurrentUser,
        order_id: Uuid,
        partner_id: Uuid,
        estimated_minutes: i64,
        notes: Option<String>,
    ) -> Result<DeliveryAssignment, FulfillmentError> {
        let command = OrderCommand::AssignDelivery {
            partner_id,
            estimated_minutes,
            notes,
        };
        let order = self.run(user, order_id, command).await?;

        order
            .delivery
            .ok_or(FulfillmentError::NotFound { entity: "delivery assignment", id: order_id })
    }

    pub async fn complete(&self, user: &CurrentUser, order_id: Uuid) -> Result<OrderAggregate, FulfillmentError> {
        self.run(user, order_id, OrderCommand::Complete).await
    }

    /// Accepted from any non-terminal status; the receipt flags in-transit cancels
    pub async fn cancel(
        &self,
        user: &CurrentUser,
        order_id: Uuid,
        reason: impl Into<String>,
    ) -> Result<CancellationReceipt, FulfillmentError> {
        let command = OrderCommand::Cancel { reason: reason.into() };
        let outcome = self.execute(user, order_id, command).await?;

        let record = outcome
            .order
            .cancellation
            .ok_or(FulfillmentError::NotFound { entity: "cancellation", id: order_id })?;

        Ok(CancellationReceipt {
            order_id,
            previous_status: record.previous_status,
            in_transit: record.in_transit,
            compensations: record.compensations,
            version: outcome.version,
        })
    }

    // ========================================================================
    // Kitchen ticket tracker
    // ========================================================================

    pub async fn start_item(
        &self,
        user: &CurrentUser,
        ticket_item_id: Uuid,
        preparer: Option<Uuid>,
        station: Option<String>,
    ) -> Result<OrderAggregate, FulfillmentError> {
        let order_id = self.order_for_ticket_item(ticket_item_id)?;
        let command = OrderCommand::StartItem {
            ticket_item_id,
            preparer,
            station,
            notes: None,
        };
        self.run(user, order_id, command).await
    }

    pub async fn complete_item(
        &self,
        user: &CurrentUser,
        ticket_item_id: Uuid,
        notes: Option<String>,
    ) -> Result<OrderAggregate, FulfillmentError> {
        let order_id = self.order_for_ticket_item(ticket_item_id)?;
        let command = OrderCommand::CompleteItem { ticket_item_id, notes };
        self.run(user, order_id, command).await
    }

    /// Kitchen display entry point: move one item to `IN_PROGRESS` or `DONE`
    pub async fn mark_item_status(
        &self,
        user: &CurrentUser,
        ticket_item_id: Uuid,
        status: TicketItemState,
        notes: Option<String>,
    ) -> Result<OrderAggregate, FulfillmentError> {
        let order_id = self.order_for_ticket_item(ticket_item_id)?;
        let command = match status {
            TicketItemState::InProgress => OrderCommand::StartItem {
                ticket_item_id,
                preparer: None,
                station: None,
                notes,
            },
            TicketItemState::Done => OrderCommand::CompleteItem { ticket_item_id, notes },
            TicketItemState::Queued => {
                return Err(FulfillmentError::InvalidInput(format!(
                    "ticket item {ticket_item_id} cannot be moved back to {}",
                    status.as_str()
                )))
            }
        };
        self.run(user, order_id, command).await
    }

    /// Whether every ticket item of the order is DONE
    pub async fn all_done(&self, order_id: Uuid) -> Result<bool, FulfillmentError> {
        Ok(self.handler.load(order_id).await?.kitchen.all_done())
    }

    // ========================================================================
    // Delivery coordinator
    // ========================================================================

    pub async fn accept_delivery(&self, partner: &CurrentUser, assignment_id: Uuid) -> Result<DeliveryAssignment, FulfillmentError> {
        self.run_delivery(partner, assignment_id, OrderCommand::AcceptDelivery).await
    }

    pub async fn pick_up(
        &self,
        partner: &CurrentUser,
        assignment_id: Uuid,
        position: Option<GeoPoint>,
    ) -> Result<DeliveryAssignment, FulfillmentError> {
        self.run_delivery(partner, assignment_id, OrderCommand::PickUp { position }).await
    }

    pub async fn update_location(
        &self,
        partner: &CurrentUser,
        assignment_id: Uuid,
        latitude: f64,
        longitude: f64,
        distance_remaining_km: Option<f64>,
    ) -> Result<DeliveryAssignment, FulfillmentError> {
        let command = OrderCommand::UpdateLocation {
            position: GeoPoint::new(latitude, longitude)?,
            distance_remaining_km,
        };
        self.run_delivery(partner, assignment_id, command).await
    }

    pub async fn deliver(
        &self,
        partner: &CurrentUser,
        assignment_id: Uuid,
        notes: Option<String>,
        signature: Option<String>,
        proof_image: Option<String>,
    ) -> Result<DeliveryAssignment, FulfillmentError> {
        let command = OrderCommand::Deliver {
            notes,
            signature,
            proof_image,
        };
        self.run_delivery(partner, assignment_id, command).await
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn order(&self, order_id: Uuid) -> Result<OrderAggregate, FulfillmentError> {
        self.handler.load(order_id).await
    }

    // Customer-facing reads: the ordering customer, the assigned partner, or
    // a user holding `ViewOrder` at the order's restaurant.

    pub async fn snapshot(&self, user: &CurrentUser, order_id: Uuid) -> Result<OrderSnapshot, FulfillmentError> {
        self.authorize_read(user, order_id).await?;
        let (order, timeline) = self.handler.load_with_timeline(order_id).await?;
        let live = self.live.compose(&order, self.clock.now());
        Ok(OrderSnapshot { order, live, timeline })
    }

    pub async fn live_status(&self, user: &CurrentUser, order_id: Uuid) -> Result<LiveStatus, FulfillmentError> {
        self.authorize_read(user, order_id).await?;
        let order = self.handler.load(order_id).await?;
        Ok(self.live.compose(&order, self.clock.now()))
    }

    /// Timeline reads do not wait on in-flight commands
    pub async fn timeline(&self, user: &CurrentUser, order_id: Uuid) -> Result<Vec<TimelineEvent>, FulfillmentError> {
        self.authorize_read(user, order_id).await?;
        Ok(self.timeline.events(order_id))
    }

    pub async fn milestones(&self, user: &CurrentUser, order_id: Uuid) -> Result<Vec<TimelineEvent>, FulfillmentError> {
        self.authorize_read(user, order_id).await?;
        Ok(self.timeline.milestones(order_id))
    }

    pub async fn order_events(&self, order_id: Uuid) -> Result<Vec<EventEnvelope<OrderEvent>>, FulfillmentError> {
        self.handler.load_events(order_id).await
    }

    /// CONFIRMED and PREPARING orders, highest priority first then oldest first
    pub async fn active_kitchen_orders(
        &self,
        restaurant_id: Uuid,
        station: Option<&str>,
    ) -> Result<Vec<OrderAggregate>, FulfillmentError> {
        let mut orders = self
            .orders_where(|order| {
                order.restaurant_id == restaurant_id
                    && matches!(order.status, OrderStatus::Confirmed | OrderStatus::Preparing)
                    && station.map_or(true, |s| order.kitchen.uses_station(s))
            })
            .await?;

        orders.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        Ok(orders)
    }

    /// READY delivery orders still waiting for a partner
    pub async fn available_delivery_orders(&self, restaurant_id: Uuid) -> Result<Vec<OrderAggregate>, FulfillmentError> {
        let mut orders = self
            .orders_where(|order| {
                order.restaurant_id == restaurant_id
                    && order.order_type.is_delivery()
                    && order.status == OrderStatus::Ready
                    && order.delivery.is_none()
            })
            .await?;

        orders.sort_by_key(|order| order.ready_at);
        Ok(orders)
    }

    pub async fn active_deliveries_for_partner(&self, partner_id: Uuid) -> Result<Vec<DeliveryAssignment>, FulfillmentError> {
        let Some(active) = self.roster.active_for(partner_id) else {
            return Ok(Vec::new());
        };

        let order = self.handler.load(active.order_id).await?;
        Ok(order
            .delivery
            .into_iter()
            .filter(|d| d.id == active.assignment_id && d.is_active())
            .collect())
    }

    /// Elapsed minutes since the order was placed, computed at read time
    pub async fn elapsed_minutes(&self, order_id: Uuid) -> Result<i64, FulfillmentError> {
        let order = self.handler.load(order_id).await?;
        Ok(order.kitchen.elapsed_minutes(self.clock.now()))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn run(&self, user: &CurrentUser, order_id: Uuid, command: OrderCommand) -> Result<OrderAggregate, FulfillmentError> {
        Ok(self.execute(user, order_id, command).await?.order)
    }

    async fn run_delivery(
        &self,
        partner: &CurrentUser,
        assignment_id: Uuid,
        command: OrderCommand,
    ) -> Result<DeliveryAssignment, FulfillmentError> {
        let order_id = self.order_for_assignment(assignment_id)?;
        let order = self.run(partner, order_id, command).await?;

        order
            .delivery
            .filter(|d| d.id == assignment_id)
            .ok_or(FulfillmentError::NotFound { entity: "delivery assignment", id: assignment_id })
    }

    async fn execute(&self, user: &CurrentUser, order_id: Uuid, command: OrderCommand) -> Result<CommandOutcome, FulfillmentError> {
        let outcome = self.handler.handle(user, order_id, command).await?;
        self.index(&outcome);
        Ok(outcome)
    }

    fn index(&self, outcome: &CommandOutcome) {
        for event in &outcome.events {
            match event {
                OrderEvent::PreparationStarted(e) => {
                    let mut ticket_items = self.ticket_items.write().unwrap_or_else(|p| p.into_inner());
                    for item in e.ticket.items() {
                        ticket_items.insert(item.id, outcome.order_id);
                    }
                }
                OrderEvent::DeliveryAssigned(e) => {
                    self.assignments
                        .write()
                        .unwrap_or_else(|p| p.into_inner())
                        .insert(e.assignment.id, outcome.order_id);
                    if let Some(audience) = self
                        .audiences
                        .write()
                        .unwrap_or_else(|p| p.into_inner())
                        .get_mut(&outcome.order_id)
                    {
                        audience.partner_id = Some(e.assignment.partner_id);
                    }
                }
                _ => {}
            }
        }
    }

    /// Reads resolve the owner from the index, so they never take the order lock
    async fn authorize_read(&self, user: &CurrentUser, order_id: Uuid) -> Result<(), FulfillmentError> {
        let audience = self
            .audiences
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&order_id)
            .copied()
            .ok_or(FulfillmentError::NotFound { entity: "order", id: order_id })?;

        if user.id == audience.customer_id || audience.partner_id == Some(user.id) {
            return Ok(());
        }
        self.handler
            .require(user, Permission::ViewOrder, audience.restaurant_id)
            .await
    }

    fn order_for_ticket_item(&self, ticket_item_id: Uuid) -> Result<Uuid, FulfillmentError> {
        self.ticket_items
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&ticket_item_id)
            .copied()
            .ok_or(FulfillmentError::NotFound { entity: "ticket item", id: ticket_item_id })
    }

    fn order_for_assignment(&self, assignment_id: Uuid) -> Result<Uuid, FulfillmentError> {
        self.assignments
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&assignment_id)
            .copied()
            .ok_or(FulfillmentError::NotFound { entity: "delivery assignment", id: assignment_id })
    }

    async fn orders_where<F>(&self, keep: F) -> Result<Vec<OrderAggregate>, FulfillmentError>
    where
        F: Fn(&OrderAggregate) -> bool,
    {
        let mut matching = Vec::new();
        for order_id in self.handler.order_ids() {
            let order = self.handler.load(order_id).await?;
            if keep(&order) {
                matching.push(order);
            }
        }
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderItem, OrderTotals, OrderType};
    use crate::utils::ManualClock;

    fn service() -> (FulfillmentService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let service = FulfillmentService::new(
            FulfillmentConfig::default(),
            Collaborators::default(),
            clock.clone(),
            Arc::new(Metrics::new().unwrap()),
        );
        (service, clock)
    }

    fn order_for(restaurant_id: Uuid, order_type: OrderType, priority: i32) -> NewOrder {
        NewOrder {
            restaurant_id,
            customer_id: Uuid::new_v4(),
            order_type,
            items: vec![OrderItem {
                id: Uuid::new_v4(),
                name: "Miso ramen".into(),
                quantity: 1,
                unit_price_cents: 1450,
                modifiers: vec![],
                special_instructions: None,
            }],
            totals: OrderTotals { subtotal_cents: 1450, total_cents: 1450, ..Default::default() },
            priority,
            destination: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_ticket_item_is_not_found() {
        let (service, _) = service();
        let staff = CurrentUser::new(Uuid::new_v4());
        let missing = Uuid::new_v4();

        let result = service.start_item(&staff, missing, None, None).await;
        assert_eq!(result.unwrap_err(), FulfillmentError::NotFound { entity: "ticket item", id: missing });
    }

    #[tokio::test]
    async fn test_kitchen_queue_orders_by_priority_then_age() {
        let (service, clock) = service();
        let staff = CurrentUser::new(Uuid::new_v4());
        let restaurant = Uuid::new_v4();

        let low = service.register_order(&staff, order_for(restaurant, OrderType::DineIn, 0)).await.unwrap();
        clock.advance_minutes(1);
        let high = service.register_order(&staff, order_for(restaurant, OrderType::DineIn, 5)).await.unwrap();
        clock.advance_minutes(1);
        let unconfirmed = service.register_order(&staff, order_for(restaurant, OrderType::DineIn, 9)).await.unwrap();

        service.confirm(&staff, low.id).await.unwrap();
        service.confirm(&staff, high.id).await.unwrap();

        let queue = service.active_kitchen_orders(restaurant, None).await.unwrap();
        let ids: Vec<_> = queue.iter().map(|o| o.id).collect();

        assert_eq!(ids, vec![high.id, low.id]);
        assert!(!ids.contains(&unconfirmed.id));
    }

    #[tokio::test]
    async fn test_kitchen_queue_station_filter() {
        let (service, _) = service();
        let staff = CurrentUser::new(Uuid::new_v4());
        let restaurant = Uuid::new_v4();

        let order = service.register_order(&staff, order_for(restaurant, OrderType::Takeaway, 0)).await.unwrap();
        service.confirm(&staff, order.id).await.unwrap();
        let assignments = vec![ItemAssignment {
            order_item_id: order.items[0].id,
            preparer: None,
            station: Some("grill".into()),
        }];
        service.start_preparation(&staff, order.id, 15, assignments).await.unwrap();

        assert_eq!(service.active_kitchen_orders(restaurant, Some("grill")).await.unwrap().len(), 1);
        assert!(service.active_kitchen_orders(restaurant, Some("fryer")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_item_status_drives_ticket() {
        let (service, _) = service();
        let staff = CurrentUser::new(Uuid::new_v4());

        let order = service.register_order(&staff, order_for(Uuid::new_v4(), OrderType::Takeaway, 0)).await.unwrap();
        service.confirm(&staff, order.id).await.unwrap();
        let order = service.start_preparation(&staff, order.id, 10, vec![]).await.unwrap();
        let item_id = order.kitchen.items()[0].id;

        let back = service.mark_item_status(&staff, item_id, TicketItemState::Queued, None).await;
        assert!(matches!(back, Err(FulfillmentError::InvalidInput(_))));

        service.mark_item_status(&staff, item_id, TicketItemState::InProgress, None).await.unwrap();
        service.mark_item_status(&staff, item_id, TicketItemState::Done, Some("plated".into())).await.unwrap();

        assert!(service.all_done(order.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_elapsed_minutes_refresh_on_read() {
        let (service, clock) = service();
        let staff = CurrentUser::new(Uuid::new_v4());
        let order = service.register_order(&staff, order_for(Uuid::new_v4(), OrderType::DineIn, 0)).await.unwrap();

        clock.advance_minutes(4);
        assert_eq!(service.elapsed_minutes(order.id).await.unwrap(), 4);
        clock.advance_minutes(3);
        assert_eq!(service.elapsed_minutes(order.id).await.unwrap(), 7);
    }
}
