use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Timeline Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineEventType {
    OrderPlaced,
    OrderConfirmed,
    PaymentReceived,
    KitchenStarted,
    ItemStarted,
    ItemCompleted,
    FoodReady,
    DeliveryAssigned,
    DeliveryAccepted,
    OutForDelivery,
    LocationUpdated,
    Delivered,
    OrderCompleted,
    Cancelled,
}

impl TimelineEventType {
    pub fn icon(&self) -> &'static str {
        match self {
            TimelineEventType::OrderPlaced => "🛒",
            TimelineEventType::OrderConfirmed => "✅",
            TimelineEventType::PaymentReceived => "💳",
            TimelineEventType::KitchenStarted => "👨‍🍳",
            TimelineEventType::ItemStarted => "🔥",
            TimelineEventType::ItemCompleted => "🍽️",
            TimelineEventType::FoodReady => "✨",
            TimelineEventType::DeliveryAssigned => "🚗",
            TimelineEventType::DeliveryAccepted => "👍",
            TimelineEventType::OutForDelivery => "🛵",
            TimelineEventType::LocationUpdated => "📍",
            TimelineEventType::Delivered => "🎉",
            TimelineEventType::OrderCompleted => "🏁",
            TimelineEventType::Cancelled => "❌",
        }
    }
}

/// One immutable entry of an order's activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: Uuid,
    pub order_id: Uuid,
    /// Position in the order's feed, starting at 1
    pub sequence: u64,
    pub event_type: TimelineEventType,
    pub title: String,
    pub description: String,
    pub milestone: bool,
    pub timestamp: DateTime<Utc>,
}

impl TimelineEvent {
    pub fn icon(&self) -> &'static str {
        self.event_type.icon()
    }

    /// "Just now", "5 minutes ago", "2 hours ago", "3 days ago"
    pub fn display_time(&self, now: DateTime<Utc>) -> String {
        let elapsed = now - self.timestamp;

        let minutes = elapsed.num_minutes();
        if minutes < 1 {
            return "Just now".to_string();
        }
        if minutes < 60 {
            return plural(minutes, "minute");
        }

        let hours = elapsed.num_hours();
        if hours < 24 {
            return plural(hours, "hour");
        }

        plural(elapsed.num_days(), "day")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(at: DateTime<Utc>) -> TimelineEvent {
        TimelineEvent {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            sequence: 1,
            event_type: TimelineEventType::FoodReady,
            title: "Order ready".into(),
            description: String::new(),
            milestone: true,
            timestamp: at,
        }
    }

    #[test]
    fn test_display_time_buckets() {
        let now = Utc::now();

        assert_eq!(entry(now - Duration::seconds(30)).display_time(now), "Just now");
        assert_eq!(entry(now - Duration::minutes(1)).display_time(now), "1 minute ago");
        assert_eq!(entry(now - Duration::minutes(45)).display_time(now), "45 minutes ago");
        assert_eq!(entry(now - Duration::hours(1)).display_time(now), "1 hour ago");
        assert_eq!(entry(now - Duration::hours(5)).display_time(now), "5 hours ago");
        assert_eq!(entry(now - Duration::days(3)).display_time(now), "3 days ago");
    }

    #[test]
    fn test_icon_follows_type() {
        assert_eq!(entry(Utc::now()).icon(), "✨");
    }
}
