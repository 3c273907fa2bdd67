use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geo::GeoPoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPing {
    pub position: GeoPoint,
    pub distance_remaining_km: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

// ============================================================================
// Location History - fixed-capacity ring buffer
// ============================================================================
//
// Slots are allocated once; `head` points at the oldest entry. When full, a
// push overwrites the oldest slot and advances `head`.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationHistory {
    slots: Vec<Option<LocationPing>>,
    head: usize,
    len: usize,
}

impl LocationHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, ping: LocationPing) {
        let capacity = self.capacity();
        let tail = (self.head + self.len) % capacity;
        self.slots[tail] = Some(ping);

        if self.len == capacity {
            self.head = (self.head + 1) % capacity;
        } else {
            self.len += 1;
        }
    }

    pub fn latest(&self) -> Option<&LocationPing> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.head + self.len - 1) % self.capacity();
        self.slots[idx].as_ref()
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &LocationPing> + '_ {
        let capacity = self.capacity();
        (0..self.len).filter_map(move |offset| self.slots[(self.head + offset) % capacity].as_ref())
    }
}
