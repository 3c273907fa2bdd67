use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::event_sourcing::core::{Aggregate, DomainEvent, EventEnvelope};

// ============================================================================
// In-Memory Event Store
// ============================================================================
//
// Responsibilities:
// 1. Keep one append-only stream per aggregate together with its current state
// 2. Hand out exclusive, time-bounded access to a single stream
// 3. Enforce optimistic concurrency on append (expected version)
//
// Streams are independent: locking one order never blocks another. The map
// of streams is only write-locked for the instant a new stream is inserted.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("{aggregate_type} not found: {aggregate_id}")]
    NotFound {
        aggregate_type: &'static str,
        aggregate_id: Uuid,
    },

    #[error("{aggregate_type} already exists: {aggregate_id}")]
    AlreadyExists {
        aggregate_type: &'static str,
        aggregate_id: Uuid,
    },

    #[error("stream {aggregate_id} is locked by another command")]
    Busy { aggregate_id: Uuid },

    #[error("timed out after {waited:?} waiting for stream {aggregate_id}")]
    LockTimeout {
        aggregate_id: Uuid,
        waited: Duration,
    },

    #[error("concurrency conflict: expected version {expected}, but current is {actual}")]
    ConcurrencyConflict { expected: i64, actual: i64 },

    #[error("cannot append an empty event list")]
    EmptyAppend,
}

/// One aggregate's events plus the state they fold into
pub struct EventStream<A: Aggregate> {
    state: A,
    events: Vec<EventEnvelope<A::Event>>,
}

impl<A> EventStream<A>
where
    A: Aggregate,
    A::Event: DomainEvent,
{
    pub fn state(&self) -> &A {
        &self.state
    }

    pub fn events(&self) -> &[EventEnvelope<A::Event>] {
        &self.events
    }

    pub fn version(&self) -> i64 {
        self.state.version()
    }

    /// Apply `events` to a working copy and swap it in.
    ///
    /// Either every event is appended and the new state becomes visible, or
    /// the stream is left untouched.
    pub fn commit(
        &mut self,
        expected_version: i64,
        events: Vec<A::Event>,
        correlation_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        if events.is_empty() {
            return Err(StoreError::EmptyAppend);
        }

        let current = self.version();
        if current != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                expected: expected_version,
                actual: current,
            });
        }

        let mut working = self.state.clone();
        let mut envelopes = Vec::with_capacity(events.len());
        let mut sequence = current;

        for event in events {
            working.apply_event(&event);
            sequence += 1;
            envelopes.push(
                EventEnvelope::new(working.aggregate_id(), sequence, event, correlation_id, at)
                    .with_user(user_id),
            );
        }

        self.state = working;
        self.events.extend(envelopes);

        Ok(sequence)
    }
}

/// Exclusive handle on one stream; dropping it releases the stream
pub type StreamGuard<A> = OwnedMutexGuard<EventStream<A>>;

pub struct EventStore<A: Aggregate> {
    aggregate_type_name: &'static str,
    streams: RwLock<HashMap<Uuid, Arc<Mutex<EventStream<A>>>>>,
    lock_timeout: Duration,
}

impl<A> EventStore<A>
where
    A: Aggregate,
    A::Event: DomainEvent,
{
    /// A zero `lock_timeout` makes contended streams fail fast with `Busy`
    pub fn new(aggregate_type_name: &'static str, lock_timeout: Duration) -> Self {
        Self {
            aggregate_type_name,
            streams: RwLock::new(HashMap::new()),
            lock_timeout,
        }
    }

    /// Start a new stream from an already-validated first event
    pub fn create(
        &self,
        initial: A,
        first_event: A::Event,
        correlation_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let aggregate_id = initial.aggregate_id();
        let mut streams = self.streams.write().unwrap_or_else(|poisoned| poisoned.into_inner());

        if streams.contains_key(&aggregate_id) {
            return Err(StoreError::AlreadyExists {
                aggregate_type: self.aggregate_type_name,
                aggregate_id,
            });
        }

        let version = initial.version();
        let envelope = EventEnvelope::new(aggregate_id, version, first_event, correlation_id, at)
            .with_user(user_id);

        streams.insert(
            aggregate_id,
            Arc::new(Mutex::new(EventStream {
                state: initial,
                events: vec![envelope],
            })),
        );

        tracing::debug!(
            aggregate_id = %aggregate_id,
            aggregate_type = self.aggregate_type_name,
            "Created event stream"
        );

        Ok(version)
    }

    /// Acquire exclusive access to one stream, bounded by the lock timeout
    pub async fn lock(&self, aggregate_id: Uuid) -> Result<StreamGuard<A>, StoreError> {
        let stream = self.stream(aggregate_id)?;

        if self.lock_timeout.is_zero() {
            return stream
                .try_lock_owned()
                .map_err(|_| StoreError::Busy { aggregate_id });
        }

        tokio::time::timeout(self.lock_timeout, stream.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout {
                aggregate_id,
                waited: self.lock_timeout,
            })
    }

    pub async fn load_events(
        &self,
        aggregate_id: Uuid,
    ) -> Result<Vec<EventEnvelope<A::Event>>, StoreError> {
        let guard = self.lock(aggregate_id).await?;
        Ok(guard.events().to_vec())
    }

    pub fn aggregate_exists(&self, aggregate_id: Uuid) -> bool {
        self.streams
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(&aggregate_id)
    }

    pub fn aggregate_ids(&self) -> Vec<Uuid> {
        self.streams
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .copied()
            .collect()
    }

    fn stream(&self, aggregate_id: Uuid) -> Result<Arc<Mutex<EventStream<A>>>, StoreError> {
        self.streams
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&aggregate_id)
            .cloned()
            .ok_or(StoreError::NotFound {
                aggregate_type: self.aggregate_type_name,
                aggregate_id,
            })
    }
}
