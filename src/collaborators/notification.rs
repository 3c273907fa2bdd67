use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::OrderEvent;
use super::CollaboratorError;

// ============================================================================
// Notification - fire-and-forget
// ============================================================================
//
// The core never waits on a notification outcome to decide a transition.
// Errors are logged and counted by the caller, then dropped.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderConfirmed,
    PreparationStarted,
    OrderReady,
    DeliveryAssigned,
    DeliveryAccepted,
    OutForDelivery,
    OrderDelivered,
    OrderCompleted,
    OrderCancelled,
    PaymentReceived,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::OrderConfirmed => "order_confirmed",
            NotificationKind::PreparationStarted => "preparation_started",
            NotificationKind::OrderReady => "order_ready",
            NotificationKind::DeliveryAssigned => "delivery_assigned",
            NotificationKind::DeliveryAccepted => "delivery_accepted",
            NotificationKind::OutForDelivery => "out_for_delivery",
            NotificationKind::OrderDelivered => "order_delivered",
            NotificationKind::OrderCompleted => "order_completed",
            NotificationKind::OrderCancelled => "order_cancelled",
            NotificationKind::PaymentReceived => "payment_received",
        }
    }

    /// Customer-visible events only; item progress and location pings stay quiet
    pub fn for_event(event: &OrderEvent) -> Option<Self> {
        match event {
            OrderEvent::Confirmed(_) => Some(NotificationKind::OrderConfirmed),
            OrderEvent::PaymentCaptured(_) => Some(NotificationKind::PaymentReceived),
            OrderEvent::PreparationStarted(_) => Some(NotificationKind::PreparationStarted),
            OrderEvent::MarkedReady(_) => Some(NotificationKind::OrderReady),
            OrderEvent::DeliveryAssigned(_) => Some(NotificationKind::DeliveryAssigned),
            OrderEvent::DeliveryAccepted(_) => Some(NotificationKind::DeliveryAccepted),
            OrderEvent::PickedUp(_) => Some(NotificationKind::OutForDelivery),
            OrderEvent::Delivered(_) => Some(NotificationKind::OrderDelivered),
            OrderEvent::Completed(_) => Some(NotificationKind::OrderCompleted),
            OrderEvent::Cancelled(_) => Some(NotificationKind::OrderCancelled),
            OrderEvent::Placed(_)
            | OrderEvent::ItemStarted(_)
            | OrderEvent::ItemCompleted(_)
            | OrderEvent::LocationUpdated(_) => None,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        order_id: Uuid,
        kind: NotificationKind,
        message: &str,
    ) -> Result<(), CollaboratorError>;
}

/// Writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, order_id: Uuid, kind: NotificationKind, message: &str) -> Result<(), CollaboratorError> {
        tracing::info!(order_id = %order_id, kind = kind.as_str(), "📣 {}", message);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub order_id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
}

/// Keeps every notification in memory, optionally failing each call
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records nothing and fails every call
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn kinds_for(&self, order_id: Uuid) -> Vec<NotificationKind> {
        self.sent()
            .into_iter()
            .filter(|n| n.order_id == order_id)
            .map(|n| n.kind)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, order_id: Uuid, kind: NotificationKind, message: &str) -> Result<(), CollaboratorError> {
        if self.fail {
            return Err(CollaboratorError::Unavailable("notification channel down".into()));
        }

        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(SentNotification {
                order_id,
                kind,
                message: message.to_string(),
            });
        Ok(())
    }
}
