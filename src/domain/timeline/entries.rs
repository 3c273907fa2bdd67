use crate::domain::order::{OrderAggregate, OrderEvent};
use super::value_objects::TimelineEventType;

/// What a committed order event contributes to the activity feed
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub event_type: TimelineEventType,
    pub title: String,
    pub description: String,
    pub milestone: bool,
}

impl TimelineEntry {
    fn new(event_type: TimelineEventType, title: impl Into<String>, description: impl Into<String>, milestone: bool) -> Self {
        Self {
            event_type,
            title: title.into(),
            description: description.into(),
            milestone,
        }
    }
}

/// Feed entry for `event`, read against the order state after the commit
pub fn entry_for(event: &OrderEvent, order: &OrderAggregate) -> TimelineEntry {
    use TimelineEventType as T;

    let item_name = |ticket_item_id| {
        order
            .kitchen
            .item(ticket_item_id)
            .map(|item| item.name.clone())
            .unwrap_or_else(|| "Item".to_string())
    };

    match event {
        OrderEvent::Placed(_) => TimelineEntry::new(
            T::OrderPlaced,
            "Order placed",
            "We've received your order",
            true,
        ),
        OrderEvent::Confirmed(_) => TimelineEntry::new(
            T::OrderConfirmed,
            "Order confirmed",
            "The restaurant has accepted your order",
            true,
        ),
        OrderEvent::PaymentCaptured(e) => TimelineEntry::new(
            T::PaymentReceived,
            "Payment received",
            format!("Charged {}.{:02}", e.amount_cents / 100, e.amount_cents % 100),
            false,
        ),
        OrderEvent::PreparationStarted(e) => TimelineEntry::new(
            T::KitchenStarted,
            "Kitchen started preparing",
            format!("Estimated ready in {} minutes", e.estimated_minutes),
            false,
        ),
        OrderEvent::ItemStarted(e) => TimelineEntry::new(
            T::ItemStarted,
            format!("Preparing {}", item_name(e.ticket_item_id)),
            e.station.clone().map(|s| format!("Station: {s}")).unwrap_or_default(),
            false,
        ),
        OrderEvent::ItemCompleted(e) => TimelineEntry::new(
            T::ItemCompleted,
            format!("{} is done", item_name(e.ticket_item_id)),
            format!("Prepared in {} minutes", e.preparation_minutes),
            false,
        ),
        OrderEvent::MarkedReady(_) => TimelineEntry::new(
            T::FoodReady,
            "Order ready",
            order.status.message(order.order_type),
            true,
        ),
        OrderEvent::DeliveryAssigned(e) => TimelineEntry::new(
            T::DeliveryAssigned,
            "Out for delivery",
            format!(
                "A delivery partner has been assigned, estimated {} minutes",
                e.assignment.estimated_minutes_remaining.unwrap_or_default()
            ),
            true,
        ),
        OrderEvent::DeliveryAccepted(_) => TimelineEntry::new(
            T::DeliveryAccepted,
            "Delivery partner on the way",
            "Your delivery partner is heading to the restaurant",
            false,
        ),
        OrderEvent::PickedUp(_) => TimelineEntry::new(
            T::OutForDelivery,
            "Order is on the way!",
            "Your delivery partner is heading to your location",
            true,
        ),
        OrderEvent::LocationUpdated(e) => {
            let description = match (e.distance_remaining_km, e.estimated_minutes_remaining) {
                (Some(km), Some(minutes)) => format!("{km:.1} km away, about {minutes} minutes"),
                (None, Some(minutes)) => format!("About {minutes} minutes away"),
                _ => "Position updated".to_string(),
            };
            TimelineEntry::new(T::LocationUpdated, "Location updated", description, false)
        }
        OrderEvent::Delivered(_) => TimelineEntry::new(
            T::Delivered,
            "Order delivered!",
            "Your order has been delivered. Enjoy your meal!",
            true,
        ),
        OrderEvent::Completed(_) => TimelineEntry::new(
            T::OrderCompleted,
            "Order completed",
            "Thank you for your order",
            true,
        ),
        OrderEvent::Cancelled(e) => {
            let description = if e.in_transit {
                format!("{} (cancelled while the delivery partner was en route)", e.reason)
            } else {
                e.reason.clone()
            };
            TimelineEntry::new(T::Cancelled, "Order cancelled", description, true)
        }
    }
}
