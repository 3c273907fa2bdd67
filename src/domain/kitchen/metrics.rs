use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ticket::KitchenTicket;

// ============================================================================
// Preparation Metrics
// ============================================================================
//
// Filled in step by step as the order moves through the kitchen and
// finalized when the order becomes READY.
//
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreparationMetrics {
    pub confirmed_at: Option<DateTime<Utc>>,
    pub kitchen_started_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub target_preparation_minutes: Option<i64>,
    pub actual_preparation_minutes: Option<i64>,
    pub was_on_time: Option<bool>,
    pub delay_minutes: Option<i64>,
    pub total_items: usize,
    pub items_completed_on_time: usize,
}

impl PreparationMetrics {
    pub fn record_confirmed(&mut self, at: DateTime<Utc>) {
        self.confirmed_at = Some(at);
    }

    pub fn record_kitchen_started(&mut self, at: DateTime<Utc>, target_minutes: i64) {
        self.kitchen_started_at = Some(at);
        self.target_preparation_minutes = Some(target_minutes);
    }

    /// Close the metrics at READY using the ticket's final item state
    pub fn finalize(&mut self, ticket: &KitchenTicket, ready_at: DateTime<Utc>) {
        self.ready_at = Some(ready_at);
        self.total_items = ticket.total_items();

        if let Some(started) = self.kitchen_started_at {
            self.actual_preparation_minutes = Some((ready_at - started).num_minutes().max(0));
        }

        if let Some(deadline) = ticket.estimated_ready_at {
            let late_by = (ready_at - deadline).num_minutes();
            self.was_on_time = Some(ready_at <= deadline);
            self.delay_minutes = Some(late_by.max(0));
            self.items_completed_on_time = ticket.items_on_time(deadline);
        }
    }
}
