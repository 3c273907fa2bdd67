use uuid::Uuid;
use super::event::EventEnvelope;

// ============================================================================
// Aggregate Root Pattern
// ============================================================================
//
// 1. Commands are validated against the current state and turned into events
//    without mutating anything (`handle_command` takes `&self`).
// 2. Events carry every value they need (timestamps, computed ETAs), so
//    `apply_event` is deterministic and replaying a stream rebuilds the
//    exact same state.
// 3. A command is committed by applying all of its events to a working copy
//    and swapping that copy in; a rejected command leaves no trace.
//
// ============================================================================

pub trait Aggregate: Clone + Send + Sync + Sized {
    type Event: Clone + Send + Sync;
    type Command;
    /// Per-command data supplied by the handler (clock reading, acting user, tunables)
    type Context;
    type Error;

    /// Create the aggregate from the first event of its stream
    fn apply_first_event(aggregate_id: Uuid, event: &Self::Event) -> Result<Self, Self::Error>;

    /// Apply a subsequent event; must not fail for events produced by `handle_command`
    fn apply_event(&mut self, event: &Self::Event);

    /// Validate a command and return the events it produces
    fn handle_command(
        &self,
        command: &Self::Command,
        ctx: &Self::Context,
    ) -> Result<Vec<Self::Event>, Self::Error>;

    fn aggregate_id(&self) -> Uuid;

    /// Sequence number of the last applied event
    fn version(&self) -> i64;

    /// Rebuild from a full event history
    fn load_from_events(events: &[EventEnvelope<Self::Event>]) -> Result<Self, Self::Error>
    where
        Self::Error: From<EmptyStream>,
    {
        let (first, rest) = events.split_first().ok_or(EmptyStream)?;

        let mut aggregate = Self::apply_first_event(first.aggregate_id, &first.event_data)?;
        for envelope in rest {
            aggregate.apply_event(&envelope.event_data);
        }

        Ok(aggregate)
    }
}

/// Raised when replaying a stream that has no events
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot load aggregate from an empty event stream")]
pub struct EmptyStream;
