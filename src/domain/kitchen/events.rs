use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Kitchen Events - payloads carried inside the order event stream
// ============================================================================

/// A ticket item moved QUEUED → IN_PROGRESS
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ItemStarted {
    pub ticket_item_id: Uuid,
    pub preparer: Option<Uuid>,
    pub station: Option<String>,
    pub notes: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// A ticket item moved IN_PROGRESS → DONE
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ItemCompleted {
    pub ticket_item_id: Uuid,
    pub notes: Option<String>,
    pub completed_at: DateTime<Utc>,
    pub preparation_minutes: i64,
}
