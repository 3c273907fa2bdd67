use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::utils::Clock;
use super::entries::TimelineEntry;
use super::value_objects::{TimelineEvent, TimelineEventType};

// ============================================================================
// Timeline Recorder
// ============================================================================
//
// Append-only activity feed per order. Timestamps come from the recorder's
// clock and are clamped so a feed never goes backwards, even if the clock
// does. Written entries are never modified.
//
// ============================================================================

pub struct TimelineRecorder {
    clock: Arc<dyn Clock>,
    feeds: RwLock<HashMap<Uuid, Vec<TimelineEvent>>>,
}

impl TimelineRecorder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            feeds: RwLock::new(HashMap::new()),
        }
    }

    pub fn record(
        &self,
        order_id: Uuid,
        event_type: TimelineEventType,
        title: impl Into<String>,
        description: impl Into<String>,
        milestone: bool,
    ) -> TimelineEvent {
        let mut feeds = self.feeds.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let feed = feeds.entry(order_id).or_default();

        let now = self.clock.now();
        let timestamp = match feed.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        let event = TimelineEvent {
            id: Uuid::new_v4(),
            order_id,
            sequence: feed.len() as u64 + 1,
            event_type,
            title: title.into(),
            description: description.into(),
            milestone,
            timestamp,
        };
        feed.push(event.clone());

        tracing::debug!(
            order_id = %order_id,
            event_type = ?event_type,
            sequence = event.sequence,
            milestone,
            "Timeline event recorded"
        );

        event
    }

    pub fn record_entry(&self, order_id: Uuid, entry: TimelineEntry) -> TimelineEvent {
        self.record(order_id, entry.event_type, entry.title, entry.description, entry.milestone)
    }

    /// Every entry for the order, oldest first
    pub fn events(&self, order_id: Uuid) -> Vec<TimelineEvent> {
        self.feeds
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&order_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn milestones(&self, order_id: Uuid) -> Vec<TimelineEvent> {
        self.events(order_id).into_iter().filter(|e| e.milestone).collect()
    }

    pub fn latest(&self, order_id: Uuid) -> Option<TimelineEvent> {
        self.feeds
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&order_id)
            .and_then(|feed| feed.last().cloned())
    }
}
