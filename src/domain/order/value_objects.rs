use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::delivery::GeoPoint;

// ============================================================================
// Order Value Objects
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub modifiers: Vec<String>,
    pub special_instructions: Option<String>,
}

/// Monetary amounts, already computed upstream
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub delivery_fee_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    DineIn,
    Takeaway,
    Delivery,
}

impl OrderType {
    pub fn is_delivery(&self) -> bool {
        matches!(self, OrderType::Delivery)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Confirmed,
    Preparing,
    Ready,
    OutForDelivery,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Forward edge of the fulfillment graph for the given order type
    pub fn next(&self, order_type: OrderType) -> Option<OrderStatus> {
        match self {
            OrderStatus::Created => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready if order_type.is_delivery() => Some(OrderStatus::OutForDelivery),
            OrderStatus::Ready | OrderStatus::OutForDelivery => Some(OrderStatus::Completed),
            OrderStatus::Completed | OrderStatus::Cancelled => None,
        }
    }

    pub fn display_text(&self) -> &'static str {
        match self {
            OrderStatus::Created => "Order Placed",
            OrderStatus::Confirmed => "Order Confirmed",
            OrderStatus::Preparing => "Preparing Your Food",
            OrderStatus::Ready => "Order Ready",
            OrderStatus::OutForDelivery => "Out for Delivery",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Customer-facing sentence for the current status
    pub fn message(&self, order_type: OrderType) -> &'static str {
        match (self, order_type) {
            (OrderStatus::Created, _) => "We've received your order and are reviewing it",
            (OrderStatus::Confirmed, _) => "Your order has been confirmed and will be prepared soon",
            (OrderStatus::Preparing, _) => "Our chefs are preparing your food",
            (OrderStatus::Ready, OrderType::DineIn) => "Your food will be served shortly",
            (OrderStatus::Ready, OrderType::Takeaway) => "Your order is ready for pickup",
            (OrderStatus::Ready, OrderType::Delivery) => "Your order is ready and waiting for a delivery partner",
            (OrderStatus::OutForDelivery, _) => "Your order is on the way to you",
            (OrderStatus::Completed, _) => "Enjoy your meal!",
            (OrderStatus::Cancelled, _) => "This order has been cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An already-priced order handed to the core by the ordering front end
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub restaurant_id: Uuid,
    pub customer_id: Uuid,
    pub order_type: OrderType,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub destination: Option<GeoPoint>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One committed status change, kept alongside the timeline
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StatusChange {
    pub from: Option<OrderStatus>,
    pub to: OrderStatus,
    pub changed_by: Uuid,
    pub notes: Option<String>,
    pub at: DateTime<Utc>,
}

/// Follow-up actions requested when an order is cancelled mid-delivery
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Compensation {
    Refund { amount_cents: i64 },
    RecallPartner { partner_id: Uuid },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CancellationRecord {
    pub reason: String,
    pub cancelled_by: Uuid,
    pub previous_status: OrderStatus,
    /// Cancelled while the partner was en route
    pub in_transit: bool,
    pub compensations: Vec<Compensation>,
    pub cancelled_at: DateTime<Utc>,
}

// ============================================================================
// Unit Tests
// ============================================================================
