use crate::domain::order::{Compensation, OrderAggregate};

// ============================================================================
// Cancellation Policy
// ============================================================================
//
// Consulted only when an order is cancelled while its partner is en route.
// The requested compensations are stored on the cancellation record; carrying
// them out belongs to whoever owns refunds and dispatch.
//
// ============================================================================

pub trait CancellationPolicy: Send + Sync {
    fn compensations(&self, order: &OrderAggregate, reason: &str) -> Vec<Compensation>;
}

/// Requests nothing; the in-transit flag alone is surfaced to the caller
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCompensation;

impl CancellationPolicy for NoCompensation {
    fn compensations(&self, _order: &OrderAggregate, _reason: &str) -> Vec<Compensation> {
        Vec::new()
    }
}

/// Recalls the partner and refunds the captured amount, if any
#[derive(Debug, Default, Clone, Copy)]
pub struct RefundAndRecall;

impl CancellationPolicy for RefundAndRecall {
    fn compensations(&self, order: &OrderAggregate, _reason: &str) -> Vec<Compensation> {
        let mut actions = Vec::new();

        if let Some(delivery) = &order.delivery {
            actions.push(Compensation::RecallPartner { partner_id: delivery.partner_id });
        }
        if order.payment_transaction_id.is_some() {
            actions.push(Compensation::Refund { amount_cents: order.totals.total_cents });
        }

        actions
    }
}
