use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Kitchen Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketItemState {
    Queued,
    InProgress,
    Done,
}

impl TicketItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketItemState::Queued => "QUEUED",
            TicketItemState::InProgress => "IN_PROGRESS",
            TicketItemState::Done => "DONE",
        }
    }
}

impl std::fmt::Display for TicketItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional preparer/station for one order item, supplied when preparation starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAssignment {
    pub order_item_id: Uuid,
    pub preparer: Option<Uuid>,
    pub station: Option<String>,
}

/// Preparation state of one order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitchenTicketItem {
    pub id: Uuid,
    pub order_item_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub modifiers: Vec<String>,
    pub special_instructions: Option<String>,
    pub state: TicketItemState,
    pub priority: i32,
    pub preparer: Option<Uuid>,
    pub station: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub preparation_minutes: Option<i64>,
    pub notes: Option<String>,
}

impl KitchenTicketItem {
    pub fn is_done(&self) -> bool {
        self.state == TicketItemState::Done
    }

    /// Completed no later than `deadline`
    pub fn completed_by(&self, deadline: DateTime<Utc>) -> bool {
        matches!(self.completed_at, Some(done) if done <= deadline)
    }
}
