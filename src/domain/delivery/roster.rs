use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use super::errors::DeliveryError;

// ============================================================================
// Partner Roster
// ============================================================================
//
// The one piece of delivery state shared across orders: which partner holds
// which active assignment. A partner holds at most one at a time.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveAssignment {
    pub assignment_id: Uuid,
    pub order_id: Uuid,
}

#[derive(Debug, Default)]
pub struct PartnerRoster {
    active: Mutex<HashMap<Uuid, ActiveAssignment>>,
}

impl PartnerRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `partner_id` for an assignment, failing if already claimed
    pub fn reserve(&self, partner_id: Uuid, claim: ActiveAssignment) -> Result<(), DeliveryError> {
        let mut active = self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(existing) = active.get(&partner_id) {
            return Err(DeliveryError::PartnerUnavailable {
                partner_id,
                assignment_id: existing.assignment_id,
            });
        }

        active.insert(partner_id, claim);
        Ok(())
    }

    /// Free the partner, but only from the assignment that holds it
    pub fn release(&self, partner_id: Uuid, assignment_id: Uuid) -> bool {
        let mut active = self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        match active.get(&partner_id) {
            Some(existing) if existing.assignment_id == assignment_id => {
                active.remove(&partner_id);
                true
            }
            _ => false,
        }
    }

    pub fn active_for(&self, partner_id: Uuid) -> Option<ActiveAssignment> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&partner_id)
            .copied()
    }

    pub fn active_count(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
