use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::OrderItem;
use super::errors::KitchenError;
use super::events::{ItemCompleted, ItemStarted};
use super::value_objects::{ItemAssignment, KitchenTicketItem, TicketItemState};

// ============================================================================
// Kitchen Ticket Tracker
// ============================================================================
//
// Owns the per-item preparation state of exactly one order. Validation and
// mutation are split the same way as the aggregate: `start_item` /
// `complete_item` only check the rules and describe the change, the
// `apply_*` methods perform it once the whole order command commits.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitchenTicket {
    pub order_id: Uuid,
    pub order_placed_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub estimated_ready_at: Option<DateTime<Utc>>,
    pub halted_at: Option<DateTime<Utc>>,
    items: Vec<KitchenTicketItem>,
}

impl KitchenTicket {
    /// Ticket for an order that has not reached the kitchen yet
    pub fn empty(order_id: Uuid, order_placed_at: DateTime<Utc>) -> Self {
        Self {
            order_id,
            order_placed_at,
            started_at: None,
            estimated_ready_at: None,
            halted_at: None,
            items: Vec::new(),
        }
    }

    /// Build one QUEUED ticket item per order line, applying optional assignments.
    ///
    /// When several assignments name the same order item the first one wins.
    pub fn initialize(
        order_id: Uuid,
        order_placed_at: DateTime<Utc>,
        order_items: &[OrderItem],
        assignments: &[ItemAssignment],
        priority: i32,
        started_at: DateTime<Utc>,
        estimated_ready_at: DateTime<Utc>,
    ) -> Result<Self, KitchenError> {
        let mut by_item: HashMap<Uuid, &ItemAssignment> = HashMap::new();
        for assignment in assignments {
            if !order_items.iter().any(|item| item.id == assignment.order_item_id) {
                return Err(KitchenError::UnknownOrderItem(assignment.order_item_id));
            }
            by_item.entry(assignment.order_item_id).or_insert(assignment);
        }

        let items = order_items
            .iter()
            .map(|item| {
                let assignment = by_item.get(&item.id);
                KitchenTicketItem {
                    id: Uuid::new_v4(),
                    order_item_id: item.id,
                    name: item.name.clone(),
                    quantity: item.quantity,
                    modifiers: item.modifiers.clone(),
                    special_instructions: item.special_instructions.clone(),
                    state: TicketItemState::Queued,
                    priority,
                    preparer: assignment.and_then(|a| a.preparer),
                    station: assignment.and_then(|a| a.station.clone()),
                    started_at: None,
                    completed_at: None,
                    preparation_minutes: None,
                    notes: None,
                }
            })
            .collect();

        Ok(Self {
            order_id,
            order_placed_at,
            started_at: Some(started_at),
            estimated_ready_at: Some(estimated_ready_at),
            halted_at: None,
            items,
        })
    }

    pub fn items(&self) -> &[KitchenTicketItem] {
        &self.items
    }

    pub fn item(&self, ticket_item_id: Uuid) -> Option<&KitchenTicketItem> {
        self.items.iter().find(|item| item.id == ticket_item_id)
    }

    pub fn contains(&self, ticket_item_id: Uuid) -> bool {
        self.item(ticket_item_id).is_some()
    }

    pub fn is_initialized(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_halted(&self) -> bool {
        self.halted_at.is_some()
    }

    /// QUEUED → IN_PROGRESS; a missing preparer/station keeps the one assigned at initialization
    pub fn start_item(
        &self,
        ticket_item_id: Uuid,
        preparer: Option<Uuid>,
        station: Option<String>,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<ItemStarted, KitchenError> {
        let item = self.progressable(ticket_item_id)?;

        if item.state != TicketItemState::Queued {
            return Err(KitchenError::InvalidItemTransition {
                item_id: ticket_item_id,
                from: item.state,
                to: TicketItemState::InProgress,
            });
        }

        Ok(ItemStarted {
            ticket_item_id,
            preparer: preparer.or(item.preparer),
            station: station.or_else(|| item.station.clone()),
            notes,
            started_at: at,
        })
    }

    /// IN_PROGRESS → DONE
    pub fn complete_item(
        &self,
        ticket_item_id: Uuid,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<ItemCompleted, KitchenError> {
        let item = self.progressable(ticket_item_id)?;

        let started_at = match (item.state, item.started_at) {
            (TicketItemState::InProgress, Some(started_at)) => started_at,
            _ => {
                return Err(KitchenError::InvalidItemTransition {
                    item_id: ticket_item_id,
                    from: item.state,
                    to: TicketItemState::Done,
                })
            }
        };

        Ok(ItemCompleted {
            ticket_item_id,
            notes,
            completed_at: at,
            preparation_minutes: (at - started_at).num_minutes().max(0),
        })
    }

    pub fn apply_started(&mut self, event: &ItemStarted) {
        if let Some(item) = self.item_mut(event.ticket_item_id) {
            item.state = TicketItemState::InProgress;
            item.preparer = event.preparer;
            item.station = event.station.clone();
            item.started_at = Some(event.started_at);
            if event.notes.is_some() {
                item.notes = event.notes.clone();
            }
        }
    }

    pub fn apply_completed(&mut self, event: &ItemCompleted) {
        if let Some(item) = self.item_mut(event.ticket_item_id) {
            item.state = TicketItemState::Done;
            item.completed_at = Some(event.completed_at);
            item.preparation_minutes = Some(event.preparation_minutes);
            if event.notes.is_some() {
                item.notes = event.notes.clone();
            }
        }
    }

    /// Stop further progress on every item; finished items stay DONE
    pub fn halt(&mut self, at: DateTime<Utc>) {
        if self.halted_at.is_none() {
            self.halted_at = Some(at);
        }
    }

    /// True iff every ticket item is DONE
    pub fn all_done(&self) -> bool {
        self.items.iter().all(KitchenTicketItem::is_done)
    }

    pub fn total_items(&self) -> usize {
        self.items.len()
    }

    pub fn items_prepared(&self) -> usize {
        self.items.iter().filter(|item| item.is_done()).count()
    }

    pub fn items_in_progress(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.state == TicketItemState::InProgress)
            .count()
    }

    /// Share of items DONE, in [0, 1]
    pub fn completion_ratio(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.items_prepared() as f64 / self.items.len() as f64
    }

    /// Percentage of items completed within the order's estimated window
    pub fn on_time_percentage(&self) -> f64 {
        let deadline = match self.estimated_ready_at {
            Some(deadline) if !self.items.is_empty() => deadline,
            _ => return 0.0,
        };

        let on_time = self.items_on_time(deadline);
        on_time as f64 * 100.0 / self.items.len() as f64
    }

    pub fn items_on_time(&self, deadline: DateTime<Utc>) -> usize {
        self.items
            .iter()
            .filter(|item| item.completed_by(deadline))
            .count()
    }

    /// Minutes since the order was placed, computed at read time
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.order_placed_at).num_minutes().max(0)
    }

    pub fn uses_station(&self, station: &str) -> bool {
        self.items
            .iter()
            .any(|item| item.station.as_deref() == Some(station))
    }

    fn progressable(&self, ticket_item_id: Uuid) -> Result<&KitchenTicketItem, KitchenError> {
        let item = self
            .item(ticket_item_id)
            .ok_or(KitchenError::ItemNotFound(ticket_item_id))?;

        if self.is_halted() {
            return Err(KitchenError::Halted(ticket_item_id));
        }

        Ok(item)
    }

    fn item_mut(&mut self, ticket_item_id: Uuid) -> Option<&mut KitchenTicketItem> {
        self.items.iter_mut().find(|item| item.id == ticket_item_id)
    }
}
