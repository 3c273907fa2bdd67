use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

// ============================================================================
// Event Envelope
// ============================================================================
//
// Wraps a domain event with its position in the aggregate stream and the
// metadata needed to trace it back to the command that produced it.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EventEnvelope<E> {
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    pub sequence_number: i64,

    pub event_type: String,
    pub event_data: E,

    /// Groups every event produced by a single command
    pub correlation_id: Uuid,
    /// User that issued the command
    pub user_id: Option<Uuid>,

    pub timestamp: DateTime<Utc>,
}

impl<E: DomainEvent> EventEnvelope<E> {
    pub fn new(
        aggregate_id: Uuid,
        sequence_number: i64,
        event_data: E,
        correlation_id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            // time-ordered so ids sort with the log
            event_id: Uuid::now_v7(),
            aggregate_id,
            sequence_number,
            event_type: event_data.event_type().to_string(),
            event_data,
            correlation_id,
            user_id: None,
            timestamp,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// Implemented by every event enum stored in an `EventStore`
pub trait DomainEvent: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync {
    fn event_type(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Clone, Debug)]
    enum TestEvent {
        Opened,
        Closed { reason: String },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Opened => "TestOpened",
                TestEvent::Closed { .. } => "TestClosed",
            }
        }
    }

    #[test]
    fn test_envelope_takes_type_from_event() {
        let aggregate_id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Utc::now();

        let envelope = EventEnvelope::new(
            aggregate_id,
            3,
            TestEvent::Closed { reason: "done".to_string() },
            correlation_id,
            now,
        )
        .with_user(user);

        assert_eq!(envelope.aggregate_id, aggregate_id);
        assert_eq!(envelope.sequence_number, 3);
        assert_eq!(envelope.event_type, "TestClosed");
        assert_eq!(envelope.correlation_id, correlation_id);
        assert_eq!(envelope.user_id, Some(user));
        assert_eq!(envelope.timestamp, now);
    }

    #[test]
    fn test_envelope_serializes_with_payload() {
        let envelope = EventEnvelope::new(Uuid::new_v4(), 1, TestEvent::Opened, Uuid::new_v4(), Utc::now());

        let json = serde_json::to_string(&envelope).unwrap();
        let back: EventEnvelope<TestEvent> = serde_json::from_str(&json).unwrap();

        assert_eq!(back.event_id, envelope.event_id);
        assert!(matches!(back.event_data, TestEvent::Opened));
    }
}
