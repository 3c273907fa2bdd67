use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CollaboratorError;

// ============================================================================
// Payment Gateway
// ============================================================================

/// When the core charges the order total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTrigger {
    /// Payment is handled entirely outside the core
    #[default]
    Never,
    OnConfirm,
    OnComplete,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns the gateway's transaction id
    async fn charge(&self, order_id: Uuid, amount_cents: i64) -> Result<String, CollaboratorError>;
}

/// Approves every charge with a sequential transaction id
#[derive(Debug, Default)]
pub struct ApprovingGateway {
    next: AtomicU64,
}

#[async_trait]
impl PaymentGateway for ApprovingGateway {
    async fn charge(&self, order_id: Uuid, amount_cents: i64) -> Result<String, CollaboratorError> {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(order_id = %order_id, amount_cents, "Charge approved");
        Ok(format!("txn-{n:06}"))
    }
}

/// Declines every charge
#[derive(Debug, Clone)]
pub struct DecliningGateway {
    pub reason: String,
}

impl Default for DecliningGateway {
    fn default() -> Self {
        Self { reason: "card declined".to_string() }
    }
}

#[async_trait]
impl PaymentGateway for DecliningGateway {
    async fn charge(&self, _order_id: Uuid, _amount_cents: i64) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Rejected(self.reason.clone()))
    }
}
