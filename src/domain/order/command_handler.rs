use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::collaborators::{
    AllowAll, ApprovingGateway, Authorizer, CancellationPolicy, CurrentUser, NoCompensation,
    NotificationKind, Notifier, PaymentGateway, PaymentTrigger, Permission, TracingNotifier,
};
use crate::config::FulfillmentConfig;
use crate::domain::delivery::{ActiveAssignment, PartnerRoster};
use crate::domain::timeline::{entry_for, TimelineEvent, TimelineRecorder};
use crate::errors::FulfillmentError;
use crate::event_sourcing::core::{Aggregate, EventEnvelope};
use crate::event_sourcing::store::{EventStore, StoreError, StreamGuard};
use crate::metrics::Metrics;
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, Clock};

use super::aggregate::OrderAggregate;
use super::commands::{CommandContext, OrderCommand};
use super::events::{OrderEvent, PaymentCaptured};
use super::value_objects::{NewOrder, OrderStatus};

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Lock → Authorize → Aggregate → Payment → Commit → Timeline
//               → Unlock → Notify
//
// Everything up to and including the timeline append happens while the
// order's stream is held, so a reader that takes the same lock never sees a
// status without its dependent updates. Notifications go out after release
// and cannot fail the command.
//
// ============================================================================

/// External services the handler calls out to
#[derive(Clone)]
pub struct Collaborators {
    pub authorizer: Arc<dyn Authorizer>,
    pub notifier: Arc<dyn Notifier>,
    pub payments: Arc<dyn PaymentGateway>,
    pub cancellation_policy: Arc<dyn CancellationPolicy>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            authorizer: Arc::new(AllowAll),
            notifier: Arc::new(TracingNotifier),
            payments: Arc::new(ApprovingGateway::default()),
            cancellation_policy: Arc::new(NoCompensation),
        }
    }
}

/// Result of a committed command
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub order_id: Uuid,
    pub version: i64,
    pub events: Vec<OrderEvent>,
    pub order: OrderAggregate,
}

pub struct OrderCommandHandler {
    store: Arc<EventStore<OrderAggregate>>,
    timeline: Arc<TimelineRecorder>,
    roster: Arc<PartnerRoster>,
    collaborators: Collaborators,
    payment_breaker: CircuitBreaker,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
    config: FulfillmentConfig,
}

impl OrderCommandHandler {
    pub fn new(
        store: Arc<EventStore<OrderAggregate>>,
        timeline: Arc<TimelineRecorder>,
        roster: Arc<PartnerRoster>,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
        config: FulfillmentConfig,
    ) -> Self {
        Self {
            store,
            timeline,
            roster,
            collaborators,
            payment_breaker: CircuitBreaker::new("payment", CircuitBreakerConfig::default()),
            clock,
            metrics,
            config,
        }
    }

    /// Admit an already-priced order in CREATED
    pub async fn place(&self, user: &CurrentUser, order: NewOrder) -> Result<CommandOutcome, FulfillmentError> {
        let order_id = Uuid::new_v4();
        let at = self.clock.now();

        let (aggregate, event) = match OrderAggregate::place(order_id, &order, user.id, at) {
            Ok(placed) => placed,
            Err(error) => {
                let error = FulfillmentError::from(error);
                self.metrics.record_rejection("place", error.kind());
                tracing::warn!(restaurant_id = %order.restaurant_id, error = %error, "Order rejected");
                return Err(error);
            }
        };

        let version = self
            .store
            .create(aggregate.clone(), event.clone(), Uuid::new_v4(), user.id, at)?;
        self.timeline.record_entry(order_id, entry_for(&event, &aggregate));

        tracing::info!(
            order_id = %order_id,
            restaurant_id = %aggregate.restaurant_id,
            order_type = ?aggregate.order_type,
            items = aggregate.items.len(),
            "Order placed"
        );

        Ok(CommandOutcome {
            order_id,
            version,
            events: vec![event],
            order: aggregate,
        })
    }

    /// Run one command against one order
    pub async fn handle(
        &self,
        user: &CurrentUser,
        order_id: Uuid,
        command: OrderCommand,
    ) -> Result<CommandOutcome, FulfillmentError> {
        let name = command.name();

        match self.execute(user, order_id, command).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                self.metrics.record_rejection(name, error.kind());
                tracing::warn!(
                    order_id = %order_id,
                    command = name,
                    user_id = %user.id,
                    error = %error,
                    "Command rejected"
                );
                Err(error)
            }
        }
    }

    /// Current state under the order's lock
    pub async fn load(&self, order_id: Uuid) -> Result<OrderAggregate, FulfillmentError> {
        let stream = self.lock(order_id).await?;
        Ok(stream.state().clone())
    }

    /// State and timeline read together, so neither is ahead of the other
    pub async fn load_with_timeline(
        &self,
        order_id: Uuid,
    ) -> Result<(OrderAggregate, Vec<TimelineEvent>), FulfillmentError> {
        let stream = self.lock(order_id).await?;
        let timeline = self.timeline.events(order_id);
        Ok((stream.state().clone(), timeline))
    }

    /// Committed event history, oldest first
    pub async fn load_events(&self, order_id: Uuid) -> Result<Vec<EventEnvelope<OrderEvent>>, FulfillmentError> {
        let stream = self.lock(order_id).await?;
        Ok(stream.events().to_vec())
    }

    pub fn order_ids(&self) -> Vec<Uuid> {
        self.store.aggregate_ids()
    }

    async fn execute(
        &self,
        user: &CurrentUser,
        order_id: Uuid,
        command: OrderCommand,
    ) -> Result<CommandOutcome, FulfillmentError> {
        let mut stream = self.lock(order_id).await?;
        let at = self.clock.now();
        let ctx = self.context(user.id, at);

        // validate against the state read under the lock
        let (from, events) = {
            let order = stream.state();
            self.authorize(user, &command, order.restaurant_id).await?;

            let mut events = order.handle_command(&command, &ctx)?;
            self.apply_cancellation_policy(order, &mut events);

            if let Some(captured) = self.capture_payment(order, &command, at).await? {
                events.push(OrderEvent::PaymentCaptured(captured));
            }

            (order.status, events)
        };

        let claim = self.reserve_partner(&events)?;

        let expected_version = stream.version();
        let version = match stream.commit(expected_version, events.clone(), Uuid::new_v4(), user.id, at) {
            Ok(version) => version,
            Err(error) => {
                if let Some(claim) = claim {
                    self.roster.release(claim.0, claim.1);
                }
                return Err(error.into());
            }
        };

        let order = stream.state().clone();
        let entries = self.after_commit(&order, from, &events);
        drop(stream);

        self.notify(&order, &events, &entries).await;

        tracing::info!(
            order_id = %order_id,
            command = command.name(),
            from = %from,
            to = %order.status,
            version = version,
            "Command committed"
        );

        Ok(CommandOutcome {
            order_id,
            version,
            events,
            order,
        })
    }

    async fn lock(&self, order_id: Uuid) -> Result<StreamGuard<OrderAggregate>, FulfillmentError> {
        let started = Instant::now();
        let result = self.store.lock(order_id).await;
        self.metrics.record_lock_wait(started.elapsed().as_secs_f64());

        if let Err(StoreError::Busy { .. } | StoreError::LockTimeout { .. }) = &result {
            self.metrics.record_lock_timeout();
        }

        Ok(result?)
    }

    fn context(&self, actor: Uuid, at: DateTime<Utc>) -> CommandContext {
        CommandContext {
            actor,
            at,
            average_speed_kmh: self.config.average_speed_kmh,
            pickup_eta_minutes: self.config.default_pickup_eta_minutes,
            location_history_capacity: self.config.location_history_capacity,
        }
    }

    async fn authorize(
        &self,
        user: &CurrentUser,
        command: &OrderCommand,
        restaurant_id: Uuid,
    ) -> Result<(), FulfillmentError> {
        self.require(user, required_permission(command), restaurant_id).await
    }

    /// Ask the authorizer for one capability at one restaurant
    pub async fn require(
        &self,
        user: &CurrentUser,
        permission: Permission,
        restaurant_id: Uuid,
    ) -> Result<(), FulfillmentError> {
        let allowed = self
            .collaborators
            .authorizer
            .has_permission(user, permission, restaurant_id)
            .await
            .map_err(|e| FulfillmentError::dependency("authorization", e))?;

        if allowed {
            Ok(())
        } else {
            Err(FulfillmentError::PermissionDenied {
                user_id: user.id,
                permission: permission.key(),
            })
        }
    }

    fn apply_cancellation_policy(&self, order: &OrderAggregate, events: &mut [OrderEvent]) {
        for event in events.iter_mut() {
            if let OrderEvent::Cancelled(record) = event {
                if record.in_transit {
                    record.compensations = self
                        .collaborators
                        .cancellation_policy
                        .compensations(order, &record.reason);

                    tracing::warn!(
                        order_id = %order.id,
                        partner_id = ?order.delivery.as_ref().map(|d| d.partner_id),
                        compensations = record.compensations.len(),
                        "Order cancelled while out for delivery"
                    );
                }
            }
        }
    }

    /// Charge the order total when the configured trigger matches this command
    async fn capture_payment(
        &self,
        order: &OrderAggregate,
        command: &OrderCommand,
        at: DateTime<Utc>,
    ) -> Result<Option<PaymentCaptured>, FulfillmentError> {
        let due = matches!(
            (self.config.payment_trigger, command),
            (PaymentTrigger::OnConfirm, OrderCommand::Confirm { .. })
                | (PaymentTrigger::OnComplete, OrderCommand::Complete)
        );
        if !due || order.payment_transaction_id.is_some() {
            return Ok(None);
        }

        let amount_cents = order.totals.total_cents;
        let charge = self.collaborators.payments.charge(order.id, amount_cents);

        match self.payment_breaker.call(charge).await {
            Ok(transaction_id) => Ok(Some(PaymentCaptured {
                transaction_id,
                amount_cents,
                captured_at: at,
            })),
            Err(error) => {
                self.metrics.record_payment_failure();
                Err(FulfillmentError::dependency("payment", error))
            }
        }
    }

    fn reserve_partner(&self, events: &[OrderEvent]) -> Result<Option<(Uuid, Uuid)>, FulfillmentError> {
        let assigned = events.iter().find_map(|event| match event {
            OrderEvent::DeliveryAssigned(e) => Some(&e.assignment),
            _ => None,
        });

        let Some(assignment) = assigned else {
            return Ok(None);
        };

        self.roster.reserve(
            assignment.partner_id,
            ActiveAssignment {
                assignment_id: assignment.id,
                order_id: assignment.order_id,
            },
        )?;

        Ok(Some((assignment.partner_id, assignment.id)))
    }

    /// Still under the lock: feed entries, metrics, partner release
    fn after_commit(&self, order: &OrderAggregate, from: OrderStatus, events: &[OrderEvent]) -> Vec<TimelineEvent> {
        let mut current = from;
        let mut entries = Vec::with_capacity(events.len());

        for event in events {
            entries.push(self.timeline.record_entry(order.id, entry_for(event, order)));

            if let Some(to) = event.target_status() {
                self.metrics.record_transition(current.as_str(), to.as_str());
                current = to;
            }
        }

        if let Some(delivery) = order.delivery.as_ref().filter(|d| !d.is_active()) {
            if self.roster.release(delivery.partner_id, delivery.id) {
                tracing::debug!(
                    order_id = %order.id,
                    assignment_id = %delivery.id,
                    partner_id = %delivery.partner_id,
                    status = %delivery.status,
                    "Delivery partner released"
                );
            }
        }
        self.metrics.set_active_deliveries(self.roster.active_count());

        entries
    }

    async fn notify(&self, order: &OrderAggregate, events: &[OrderEvent], entries: &[TimelineEvent]) {
        for (event, entry) in events.iter().zip(entries) {
            let Some(kind) = NotificationKind::for_event(event) else {
                continue;
            };

            if let Err(error) = self.collaborators.notifier.notify(order.id, kind, &entry.title).await {
                self.metrics.record_notification_failure(kind.as_str());
                tracing::warn!(
                    order_id = %order.id,
                    kind = kind.as_str(),
                    error = %error,
                    "Notification failed; transition kept"
                );
            }
        }
    }
}

fn required_permission(command: &OrderCommand) -> Permission {
    match command {
        OrderCommand::Confirm { .. } => Permission::ConfirmOrder,
        OrderCommand::StartPreparation { .. }
        | OrderCommand::StartItem { .. }
        | OrderCommand::CompleteItem { .. }
        | OrderCommand::MarkReady => Permission::ManageKitchen,
        OrderCommand::AssignDelivery { .. } => Permission::AssignDelivery,
        OrderCommand::AcceptDelivery
        | OrderCommand::PickUp { .. }
        | OrderCommand::UpdateLocation { .. }
        | OrderCommand::Deliver { .. } => Permission::PerformDelivery,
        OrderCommand::Complete => Permission::CompleteOrder,
        OrderCommand::Cancel { .. } => Permission::CancelOrder,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
