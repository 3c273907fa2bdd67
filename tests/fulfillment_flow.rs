use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use uuid::Uuid;

use kitchen_flow::collaborators::{
    Authorizer, CollaboratorError, CurrentUser, DecliningGateway, NotificationKind, PaymentTrigger,
    Permission, RecordingNotifier, RefundAndRecall, RoleAuthorizer,
};
use kitchen_flow::domain::delivery::{DeliveryStatus, GeoPoint};
use kitchen_flow::domain::kitchen::TicketItemState;
use kitchen_flow::domain::order::{
    Collaborators, Compensation, NewOrder, OrderAggregate, OrderItem, OrderStatus, OrderTotals,
    OrderType,
};
use kitchen_flow::domain::timeline::TimelineEventType;
use kitchen_flow::event_sourcing::core::Aggregate;
use kitchen_flow::metrics::Metrics;
use kitchen_flow::utils::{IsTransient, ManualClock};
use kitchen_flow::{FulfillmentConfig, FulfillmentError, FulfillmentService};

// ============================================================================
// Harness
// ============================================================================

struct Kitchen {
    service: Arc<FulfillmentService>,
    clock: Arc<ManualClock>,
    notifier: Arc<RecordingNotifier>,
    staff: CurrentUser,
    restaurant_id: Uuid,
}

impl Kitchen {
    fn new() -> Self {
        Self::with(FulfillmentConfig::default(), |_| {})
    }

    fn with(config: FulfillmentConfig, customize: impl FnOnce(&mut Collaborators)) -> Self {
        Self::with_notifier(config, RecordingNotifier::new(), customize)
    }

    fn with_notifier(
        config: FulfillmentConfig,
        notifier: RecordingNotifier,
        customize: impl FnOnce(&mut Collaborators),
    ) -> Self {
        let clock = Arc::new(ManualClock::default());
        let notifier = Arc::new(notifier);
        let mut collaborators = Collaborators {
            notifier: notifier.clone(),
            ..Collaborators::default()
        };
        customize(&mut collaborators);

        let service = FulfillmentService::new(
            config,
            collaborators,
            clock.clone(),
            Arc::new(Metrics::new().unwrap()),
        );

        let restaurant_id = Uuid::new_v4();
        Self {
            service: Arc::new(service),
            clock,
            notifier,
            staff: CurrentUser::new(Uuid::new_v4()).at_restaurant(restaurant_id),
            restaurant_id,
        }
    }

    fn new_order(&self, order_type: OrderType, item_count: usize) -> NewOrder {
        let items: Vec<OrderItem> = (0..item_count)
            .map(|n| OrderItem {
                id: Uuid::new_v4(),
                name: format!("Dish {}", n + 1),
                quantity: 1,
                unit_price_cents: 900,
                modifiers: vec![],
                special_instructions: None,
            })
            .collect();
        let subtotal = 900 * item_count as i64;

        NewOrder {
            restaurant_id: self.restaurant_id,
            customer_id: Uuid::new_v4(),
            order_type,
            items,
            totals: OrderTotals {
                subtotal_cents: subtotal,
                total_cents: subtotal,
                ..Default::default()
            },
            priority: 0,
            destination: None,
            notes: None,
        }
    }

    async fn place(&self, order_type: OrderType, item_count: usize) -> OrderAggregate {
        self.service
            .register_order(&self.staff, self.new_order(order_type, item_count))
            .await
            .unwrap()
    }

    /// CREATED → PREPARING with every item still queued
    async fn preparing(&self, order_type: OrderType, item_count: usize) -> OrderAggregate {
        let order = self.place(order_type, item_count).await;
        self.service.confirm(&self.staff, order.id).await.unwrap();
        self.service
            .start_preparation(&self.staff, order.id, 20, vec![])
            .await
            .unwrap()
    }

    async fn cook_all(&self, order: &OrderAggregate) {
        for item in order.kitchen.items() {
            self.service
                .mark_item_status(&self.staff, item.id, TicketItemState::InProgress, None)
                .await
                .unwrap();
            self.clock.advance_minutes(2);
            self.service
                .mark_item_status(&self.staff, item.id, TicketItemState::Done, None)
                .await
                .unwrap();
        }
    }

    async fn ready(&self, order_type: OrderType) -> OrderAggregate {
        let order = self.preparing(order_type, 2).await;
        self.cook_all(&order).await;
        self.service.mark_ready(&self.staff, order.id).await.unwrap()
    }

    async fn progress(&self, order_id: Uuid) -> u8 {
        self.service.live_status(&self.staff, order_id).await.unwrap().progress_percentage
    }
}

fn partner() -> CurrentUser {
    CurrentUser::new(Uuid::new_v4()).with_role("delivery_partner")
}

/// Holds the order lock for as long as it takes to answer
struct SlowAuthorizer(Duration);

#[async_trait]
impl Authorizer for SlowAuthorizer {
    async fn has_permission(&self, _: &CurrentUser, _: Permission, _: Uuid) -> Result<bool, CollaboratorError> {
        tokio::time::sleep(self.0).await;
        Ok(true)
    }
}

// ============================================================================
// State machine properties
// ============================================================================

#[tokio::test]
async fn test_skipping_a_status_is_an_invalid_transition() {
    let k = Kitchen::new();
    let order = k.place(OrderType::Takeaway, 1).await;

    let ready = k.service.mark_ready(&k.staff, order.id).await;
    assert!(matches!(ready, Err(FulfillmentError::InvalidTransition(_))));

    let complete = k.service.complete(&k.staff, order.id).await;
    assert!(matches!(complete, Err(FulfillmentError::InvalidTransition(_))));

    let prep = k.service.start_preparation(&k.staff, order.id, 10, vec![]).await;
    assert!(matches!(prep, Err(FulfillmentError::InvalidTransition(_))));

    assert_eq!(k.service.order(order.id).await.unwrap().status, OrderStatus::Created);
}

#[tokio::test]
async fn test_non_delivery_orders_cannot_be_assigned() {
    let k = Kitchen::new();
    let order = k.ready(OrderType::DineIn).await;

    let result = k.service.assign_delivery(&k.staff, order.id, Uuid::new_v4(), 15, None).await;

    assert!(matches!(result, Err(FulfillmentError::InvalidTransition(_))));
    let completed = k.service.complete(&k.staff, order.id).await.unwrap();
    assert_eq!(completed.status, OrderStatus::Completed);
}

#[tokio::test]
async fn test_mark_ready_succeeds_iff_all_items_done() {
    for done in 0..=3 {
        let k = Kitchen::new();
        let order = k.preparing(OrderType::Takeaway, 3).await;

        for item in order.kitchen.items().iter().take(done) {
            k.service.start_item(&k.staff, item.id, None, None).await.unwrap();
            k.service.complete_item(&k.staff, item.id, None).await.unwrap();
        }

        let all_done = k.service.all_done(order.id).await.unwrap();
        let result = k.service.mark_ready(&k.staff, order.id).await;

        assert_eq!(all_done, result.is_ok(), "{done} of 3 items done");
        if done < 3 {
            assert_eq!(
                result.unwrap_err(),
                FulfillmentError::IncompletePreparation { done, total: 3 }
            );
        }
    }
}

#[tokio::test]
async fn test_item_must_be_queued_to_start() {
    let k = Kitchen::new();
    let order = k.preparing(OrderType::DineIn, 1).await;
    let item_id = order.kitchen.items()[0].id;

    let early = k.service.complete_item(&k.staff, item_id, None).await;
    assert!(matches!(early, Err(FulfillmentError::InvalidTransition(_))));

    k.service.start_item(&k.staff, item_id, None, None).await.unwrap();
    let twice = k.service.start_item(&k.staff, item_id, None, None).await;
    assert!(matches!(twice, Err(FulfillmentError::InvalidTransition(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_confirms_have_exactly_one_winner() {
    let k = Kitchen::new();
    let order = k.place(OrderType::Takeaway, 1).await;

    let attempts = (0..8).map(|_| {
        let service = k.service.clone();
        let staff = k.staff.clone();
        tokio::spawn(async move { service.confirm(&staff, order.id).await })
    });
    let results: Vec<_> = join_all(attempts).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, FulfillmentError::InvalidTransition(_))));

    let confirmations = k
        .service
        .timeline(&k.staff, order.id)
        .await
        .unwrap()
        .iter()
        .filter(|e| e.event_type == TimelineEventType::OrderConfirmed)
        .count();
    assert_eq!(confirmations, 1);
}

#[tokio::test]
async fn test_event_log_replays_to_live_state() {
    let k = Kitchen::new();
    let order = k.ready(OrderType::Takeaway).await;
    k.service.complete(&k.staff, order.id).await.unwrap();

    let envelopes = k.service.order_events(order.id).await.unwrap();
    let replayed = OrderAggregate::load_from_events(&envelopes).unwrap();
    let live = k.service.order(order.id).await.unwrap();

    assert_eq!(replayed.status, OrderStatus::Completed);
    assert_eq!(replayed.version, live.version);
    assert_eq!(replayed.status_history, live.status_history);
    assert!(envelopes.windows(2).all(|w| w[0].sequence_number < w[1].sequence_number));
}

// ============================================================================
// Timeline and live status
// ============================================================================

#[tokio::test]
async fn test_timeline_is_ordered_and_stable() {
    let k = Kitchen::new();
    let order = k.ready(OrderType::Takeaway).await;
    k.service.complete(&k.staff, order.id).await.unwrap();

    let first = k.service.timeline(&k.staff, order.id).await.unwrap();
    let second = k.service.timeline(&k.staff, order.id).await.unwrap();

    assert_eq!(first, second);
    assert!(first.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(first.windows(2).all(|w| w[0].sequence < w[1].sequence));

    let json = serde_json::to_string(&first).unwrap();
    let parsed: Vec<kitchen_flow::domain::timeline::TimelineEvent> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, first);

    let milestones: Vec<_> = k.service.milestones(&k.staff, order.id).await.unwrap().iter().map(|e| e.event_type).collect();
    assert_eq!(
        milestones,
        vec![
            TimelineEventType::OrderPlaced,
            TimelineEventType::OrderConfirmed,
            TimelineEventType::FoodReady,
            TimelineEventType::OrderCompleted,
        ]
    );
}

#[tokio::test]
async fn test_snapshot_reads_state_and_timeline_together() {
    let k = Kitchen::new();
    let order = k.preparing(OrderType::DineIn, 2).await;
    k.clock.advance_minutes(5);

    let snapshot = k.service.snapshot(&k.staff, order.id).await.unwrap();

    assert_eq!(snapshot.order.status, OrderStatus::Preparing);
    assert_eq!(snapshot.live.status, OrderStatus::Preparing);
    assert_eq!(snapshot.live.kitchen.total_items, 2);
    assert_eq!(snapshot.live.remaining_minutes, Some(15));
    assert_eq!(
        snapshot.timeline.last().map(|e| e.event_type),
        Some(TimelineEventType::KitchenStarted)
    );
}

#[tokio::test]
async fn test_progress_never_regresses_along_delivery_flow() {
    let k = Kitchen::new();
    let rider = partner();
    let mut seen = Vec::new();

    let order = k.place(OrderType::Delivery, 2).await;
    seen.push(k.progress(order.id).await);

    k.service.confirm(&k.staff, order.id).await.unwrap();
    seen.push(k.progress(order.id).await);

    let order = k.service.start_preparation(&k.staff, order.id, 20, vec![]).await.unwrap();
    seen.push(k.progress(order.id).await);

    for item in order.kitchen.items() {
        k.service.start_item(&k.staff, item.id, None, None).await.unwrap();
        seen.push(k.progress(order.id).await);
        k.service.complete_item(&k.staff, item.id, None).await.unwrap();
        seen.push(k.progress(order.id).await);
    }

    k.service.mark_ready(&k.staff, order.id).await.unwrap();
    seen.push(k.progress(order.id).await);

    let assignment = k.service.assign_delivery(&k.staff, order.id, rider.id, 20, None).await.unwrap();
    seen.push(k.progress(order.id).await);
    k.service.accept_delivery(&rider, assignment.id).await.unwrap();
    k.service.pick_up(&rider, assignment.id, None).await.unwrap();
    seen.push(k.progress(order.id).await);

    for km in [4.0, 3.0, 1.5, 0.5] {
        k.service.update_location(&rider, assignment.id, 40.71, -74.0, Some(km)).await.unwrap();
        seen.push(k.progress(order.id).await);
    }

    k.service.deliver(&rider, assignment.id, None, None, None).await.unwrap();
    seen.push(k.progress(order.id).await);
    k.service.complete(&k.staff, order.id).await.unwrap();
    seen.push(k.progress(order.id).await);

    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress regressed: {seen:?}");
    assert_eq!(seen.first(), Some(&0));
    assert_eq!(seen.last(), Some(&100));
}

#[tokio::test]
async fn test_detour_does_not_pull_progress_back() {
    let k = Kitchen::new();
    let rider = partner();
    let order = k.ready(OrderType::Delivery).await;
    let assignment = k.service.assign_delivery(&k.staff, order.id, rider.id, 20, None).await.unwrap();
    k.service.accept_delivery(&rider, assignment.id).await.unwrap();
    k.service.pick_up(&rider, assignment.id, None).await.unwrap();

    let mut seen = Vec::new();
    for km in [4.0, 2.0, 3.0] {
        k.service.update_location(&rider, assignment.id, 40.71, -74.0, Some(km)).await.unwrap();
        seen.push(k.progress(order.id).await);
    }

    assert!(seen[0] < seen[1], "progress should move on: {seen:?}");
    assert_eq!(seen[1], seen[2]);
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_three_items_cooked_then_ready() {
    let k = Kitchen::new();
    let order = k.preparing(OrderType::DineIn, 3).await;

    for item in order.kitchen.items() {
        k.service.mark_item_status(&k.staff, item.id, TicketItemState::InProgress, None).await.unwrap();
        k.service.mark_item_status(&k.staff, item.id, TicketItemState::Done, None).await.unwrap();
    }

    let before = k.progress(order.id).await;
    assert!((70..75).contains(&before), "before ready: {before}");

    let ready = k.service.mark_ready(&k.staff, order.id).await.unwrap();
    assert_eq!(ready.status, OrderStatus::Ready);
    assert!(ready.ready_at.is_some());
    assert_eq!(k.progress(order.id).await, 75);
}

#[tokio::test]
async fn test_location_update_recomputes_eta_from_distance() {
    let k = Kitchen::new();
    let rider = partner();
    let order = k.ready(OrderType::Delivery).await;

    let assignment = k.service.assign_delivery(&k.staff, order.id, rider.id, 20, None).await.unwrap();
    assert_eq!(assignment.status, DeliveryStatus::Assigned);
    assert_eq!(assignment.estimated_minutes_remaining, Some(20));

    k.service.accept_delivery(&rider, assignment.id).await.unwrap();
    k.service.pick_up(&rider, assignment.id, None).await.unwrap();
    let tracked = k
        .service
        .update_location(&rider, assignment.id, 40.7306, -73.9352, Some(2.5))
        .await
        .unwrap();

    assert_eq!(tracked.estimated_minutes_remaining, Some(5));
    assert_eq!(tracked.status, DeliveryStatus::OutForDelivery);
    assert_eq!(tracked.current_position, GeoPoint::new(40.7306, -73.9352).ok());
    assert!(k.service.live_status(&k.staff, order.id).await.unwrap().can_track_delivery);
}

#[tokio::test]
async fn test_partner_cannot_hold_two_active_assignments() {
    let k = Kitchen::new();
    let rider = partner();
    let first = k.ready(OrderType::Delivery).await;
    let second = k.ready(OrderType::Delivery).await;

    let assignment = k.service.assign_delivery(&k.staff, first.id, rider.id, 20, None).await.unwrap();
    let double = k.service.assign_delivery(&k.staff, second.id, rider.id, 20, None).await;

    assert_eq!(double.unwrap_err(), FulfillmentError::PartnerUnavailable { partner_id: rider.id });
    assert_eq!(k.service.order(second.id).await.unwrap().status, OrderStatus::Ready);
    assert_eq!(
        k.service.available_delivery_orders(k.restaurant_id).await.unwrap().len(),
        1
    );

    k.service.accept_delivery(&rider, assignment.id).await.unwrap();
    k.service.pick_up(&rider, assignment.id, None).await.unwrap();
    k.service.deliver(&rider, assignment.id, None, None, None).await.unwrap();

    assert!(k.service.active_deliveries_for_partner(rider.id).await.unwrap().is_empty());
    k.service.assign_delivery(&k.staff, second.id, rider.id, 20, None).await.unwrap();
}

#[tokio::test]
async fn test_second_cancel_is_rejected() {
    let k = Kitchen::new();
    let order = k.preparing(OrderType::Takeaway, 2).await;

    let receipt = k.service.cancel(&k.staff, order.id, "customer changed mind").await.unwrap();
    assert_eq!(receipt.previous_status, OrderStatus::Preparing);
    assert!(!receipt.in_transit);

    let again = k.service.cancel(&k.staff, order.id, "customer changed mind").await;
    assert!(matches!(again, Err(FulfillmentError::InvalidTransition(_))));

    let cancelled = k.service.order(order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(cancelled.kitchen.is_halted());

    let item_id = cancelled.kitchen.items()[0].id;
    let late = k.service.start_item(&k.staff, item_id, None, None).await;
    assert!(matches!(late, Err(FulfillmentError::InvalidTransition(_))));
}

#[tokio::test]
async fn test_blank_cancel_reason_is_invalid_input() {
    let k = Kitchen::new();
    let order = k.place(OrderType::DineIn, 1).await;

    let result = k.service.cancel(&k.staff, order.id, "   ").await;
    assert!(matches!(result, Err(FulfillmentError::InvalidInput(_))));
}

// ============================================================================
// Delivery rules
// ============================================================================

#[tokio::test]
async fn test_only_assigned_partner_may_act() {
    let k = Kitchen::new();
    let rider = partner();
    let stranger = partner();
    let order = k.ready(OrderType::Delivery).await;
    let assignment = k.service.assign_delivery(&k.staff, order.id, rider.id, 20, None).await.unwrap();

    let result = k.service.accept_delivery(&stranger, assignment.id).await;

    assert!(matches!(result, Err(FulfillmentError::PermissionDenied { .. })));
    let current = k.service.order(order.id).await.unwrap();
    assert_eq!(current.delivery.map(|d| d.status), Some(DeliveryStatus::Assigned));
}

#[tokio::test]
async fn test_location_rejected_before_pick_up() {
    let k = Kitchen::new();
    let rider = partner();
    let order = k.ready(OrderType::Delivery).await;
    let assignment = k.service.assign_delivery(&k.staff, order.id, rider.id, 20, None).await.unwrap();
    k.service.accept_delivery(&rider, assignment.id).await.unwrap();

    let result = k.service.update_location(&rider, assignment.id, 40.0, -74.0, Some(1.0)).await;
    assert!(matches!(result, Err(FulfillmentError::InvalidTransition(_))));

    k.service.pick_up(&rider, assignment.id, None).await.unwrap();
    let bad = k.service.update_location(&rider, assignment.id, 123.0, -74.0, None).await;
    assert!(matches!(bad, Err(FulfillmentError::InvalidInput(_))));
}

#[tokio::test]
async fn test_delivery_order_completes_only_after_delivered() {
    let k = Kitchen::new();
    let rider = partner();
    let order = k.ready(OrderType::Delivery).await;
    let assignment = k.service.assign_delivery(&k.staff, order.id, rider.id, 20, None).await.unwrap();
    k.service.accept_delivery(&rider, assignment.id).await.unwrap();
    k.service.pick_up(&rider, assignment.id, None).await.unwrap();

    let early = k.service.complete(&k.staff, order.id).await;
    assert!(matches!(early, Err(FulfillmentError::InvalidTransition(_))));

    k.clock.advance_minutes(18);
    let delivered = k
        .service
        .deliver(&rider, assignment.id, Some("left with concierge".into()), Some("sig".into()), None)
        .await
        .unwrap();
    assert_eq!(delivered.status, DeliveryStatus::Delivered);
    assert_eq!(delivered.total_delivery_minutes, Some(18));

    let completed = k.service.complete(&k.staff, order.id).await.unwrap();
    assert_eq!(completed.status, OrderStatus::Completed);
}

#[tokio::test]
async fn test_in_transit_cancel_is_flagged_and_compensated() {
    let k = Kitchen::with(FulfillmentConfig::default(), |c| {
        c.cancellation_policy = Arc::new(RefundAndRecall);
    });
    let rider = partner();
    let order = k.ready(OrderType::Delivery).await;
    let assignment = k.service.assign_delivery(&k.staff, order.id, rider.id, 20, None).await.unwrap();
    k.service.accept_delivery(&rider, assignment.id).await.unwrap();
    k.service.pick_up(&rider, assignment.id, None).await.unwrap();

    let receipt = k.service.cancel(&k.staff, order.id, "customer unreachable").await.unwrap();

    assert!(receipt.in_transit);
    assert_eq!(receipt.previous_status, OrderStatus::OutForDelivery);
    assert_eq!(receipt.compensations, vec![Compensation::RecallPartner { partner_id: rider.id }]);

    let cancelled = k.service.order(order.id).await.unwrap();
    assert_eq!(cancelled.delivery.map(|d| d.status), Some(DeliveryStatus::Failed));
    assert!(k.service.active_deliveries_for_partner(rider.id).await.unwrap().is_empty());
}

// ============================================================================
// Collaborators and lock bounds
// ============================================================================

#[tokio::test]
async fn test_role_permissions_gate_staff_commands() {
    let k = Kitchen::with(FulfillmentConfig::default(), |c| {
        c.authorizer = Arc::new(
            RoleAuthorizer::new()
                .grant("manager", &[Permission::ConfirmOrder, Permission::CancelOrder])
                .grant("chef", &[Permission::ManageKitchen]),
        );
    });
    let manager = CurrentUser::new(Uuid::new_v4()).with_role("manager");
    let chef = CurrentUser::new(Uuid::new_v4()).with_role("chef");

    let order = k.service.register_order(&manager, k.new_order(OrderType::DineIn, 1)).await.unwrap();

    let denied = k.service.confirm(&chef, order.id).await;
    assert_eq!(
        denied.unwrap_err(),
        FulfillmentError::PermissionDenied { user_id: chef.id, permission: Permission::ConfirmOrder.key() }
    );

    k.service.confirm(&manager, order.id).await.unwrap();
    k.service.start_preparation(&chef, order.id, 10, vec![]).await.unwrap();
}

#[tokio::test]
async fn test_order_reads_are_limited_to_owner_partner_and_staff() {
    let k = Kitchen::with(FulfillmentConfig::default(), |c| {
        c.authorizer = Arc::new(RoleAuthorizer::new().grant(
            "manager",
            &[
                Permission::ConfirmOrder,
                Permission::ManageKitchen,
                Permission::AssignDelivery,
                Permission::PerformDelivery,
                Permission::ViewOrder,
            ],
        ));
    });
    let manager = CurrentUser::new(Uuid::new_v4()).with_role("manager");
    let host = CurrentUser::new(Uuid::new_v4()).with_role("manager");
    let new_order = k.new_order(OrderType::Delivery, 1);
    let owner = CurrentUser::new(new_order.customer_id);
    let stranger = CurrentUser::new(Uuid::new_v4());

    let order = k.service.register_order(&manager, new_order).await.unwrap();

    let denied = k.service.live_status(&stranger, order.id).await;
    assert_eq!(
        denied.unwrap_err(),
        FulfillmentError::PermissionDenied { user_id: stranger.id, permission: Permission::ViewOrder.key() }
    );
    assert!(k.service.timeline(&stranger, order.id).await.is_err());
    assert!(k.service.milestones(&stranger, order.id).await.is_err());
    assert!(k.service.snapshot(&stranger, order.id).await.is_err());

    assert_eq!(k.service.live_status(&owner, order.id).await.unwrap().status, OrderStatus::Created);
    assert_eq!(k.service.timeline(&owner, order.id).await.unwrap().len(), 1);
    assert!(k.service.snapshot(&manager, order.id).await.is_ok());

    // a partner without ViewOrder can follow the order once assigned to it
    let courier = CurrentUser::new(Uuid::new_v4());
    assert!(k.service.live_status(&courier, order.id).await.is_err());
    k.service.confirm(&manager, order.id).await.unwrap();
    let order = k.service.start_preparation(&manager, order.id, 10, vec![]).await.unwrap();
    for item in order.kitchen.items() {
        k.service.start_item(&manager, item.id, None, None).await.unwrap();
        k.service.complete_item(&manager, item.id, None).await.unwrap();
    }
    k.service.mark_ready(&manager, order.id).await.unwrap();
    k.service.assign_delivery(&manager, order.id, courier.id, 20, None).await.unwrap();
    assert!(k.service.live_status(&courier, order.id).await.unwrap().can_track_delivery);
    assert!(k.service.live_status(&host, order.id).await.is_ok());

    let missing = Uuid::new_v4();
    assert_eq!(
        k.service.timeline(&owner, missing).await.unwrap_err(),
        FulfillmentError::NotFound { entity: "order", id: missing }
    );
}

#[tokio::test]
async fn test_declined_payment_rolls_back_completion() {
    let config = FulfillmentConfig {
        payment_trigger: PaymentTrigger::OnComplete,
        ..Default::default()
    };
    let k = Kitchen::with(config, |c| c.payments = Arc::new(DecliningGateway::default()));
    let order = k.ready(OrderType::Takeaway).await;
    let timeline_before = k.service.timeline(&k.staff, order.id).await.unwrap();

    let result = k.service.complete(&k.staff, order.id).await;

    assert!(matches!(result, Err(FulfillmentError::DependencyFailure { .. })));
    let current = k.service.order(order.id).await.unwrap();
    assert_eq!(current.status, OrderStatus::Ready);
    assert!(current.payment_transaction_id.is_none());
    assert_eq!(k.service.timeline(&k.staff, order.id).await.unwrap(), timeline_before);
}

#[tokio::test]
async fn test_failed_notifications_do_not_block_transitions() {
    let k = Kitchen::with_notifier(FulfillmentConfig::default(), RecordingNotifier::failing(), |_| {});
    let order = k.ready(OrderType::Takeaway).await;

    let completed = k.service.complete(&k.staff, order.id).await.unwrap();
    assert_eq!(completed.status, OrderStatus::Completed);
}

#[tokio::test]
async fn test_customer_notified_of_milestones_only() {
    let k = Kitchen::new();
    let order = k.ready(OrderType::Takeaway).await;
    k.service.complete(&k.staff, order.id).await.unwrap();

    assert_eq!(
        k.notifier.kinds_for(order.id),
        vec![
            NotificationKind::OrderConfirmed,
            NotificationKind::PreparationStarted,
            NotificationKind::OrderReady,
            NotificationKind::OrderCompleted,
        ]
    );
}

#[tokio::test]
async fn test_contended_order_reports_busy_with_zero_timeout() {
    let config = FulfillmentConfig { lock_timeout_ms: 0, ..Default::default() };
    let k = Kitchen::with(config, |c| c.authorizer = Arc::new(SlowAuthorizer(Duration::from_millis(200))));
    let order = k.place(OrderType::Takeaway, 1).await;

    let service = k.service.clone();
    let staff = k.staff.clone();
    let slow = tokio::spawn(async move { service.confirm(&staff, order.id).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let contended = k.service.cancel(&k.staff, order.id, "duplicate order").await;
    assert_eq!(contended.unwrap_err(), FulfillmentError::Busy { order_id: order.id });

    slow.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_contended_order_times_out_and_retry_succeeds() {
    let config = FulfillmentConfig { lock_timeout_ms: 20, ..Default::default() };
    let k = Kitchen::with(config, |c| c.authorizer = Arc::new(SlowAuthorizer(Duration::from_millis(100))));
    let order = k.place(OrderType::Takeaway, 1).await;

    let service = k.service.clone();
    let staff = k.staff.clone();
    let slow = tokio::spawn(async move { service.confirm(&staff, order.id).await });
    tokio::time::sleep(Duration::from_millis(30)).await;

    let contended = k.service.cancel(&k.staff, order.id, "duplicate order").await;
    let error = contended.unwrap_err();
    assert!(matches!(error, FulfillmentError::Timeout { .. }));
    assert!(error.is_transient());

    slow.await.unwrap().unwrap();
    k.service.cancel(&k.staff, order.id, "duplicate order").await.unwrap();
}
