//! EventBus - broadcast-based progress events for pipeline runs.
//!
//! The pipeline publishes events as steps start, finish, replay or fail so
//! the CLI (or any other subscriber) can report progress. Events carry ids,
//! step names and short error strings only; step outputs stay in the journal.

use crate::workflow::RunStatus;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted during a pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Run has started
    RunStarted {
        /// Run identifier
        run_id: Uuid,
        /// Site slug
        slug: String,
    },
    /// A step began executing
    StepStarted {
        /// Run identifier
        run_id: Uuid,
        /// Step name
        step: String,
    },
    /// A step finished and its output was journaled
    StepCompleted {
        /// Run identifier
        run_id: Uuid,
        /// Step name
        step: String,
        /// Attempts used
        attempts: u32,
        /// Wall time in milliseconds
        duration_ms: u64,
    },
    /// A step's output was read back from the journal instead of re-running
    StepReplayed {
        /// Run identifier
        run_id: Uuid,
        /// Step name
        step: String,
    },
    /// A step failed permanently
    StepFailed {
        /// Run identifier
        run_id: Uuid,
        /// Step name
        step: String,
        /// Error description
        error: String,
    },
    /// Site status changed
    StatusChanged {
        /// Run identifier
        run_id: Uuid,
        /// New status
        status: RunStatus,
    },
    /// Run finished and the site is published
    RunCompleted {
        /// Run identifier
        run_id: Uuid,
    },
    /// Run aborted
    RunFailed {
        /// Run identifier
        run_id: Uuid,
        /// Error description
        error: String,
    },
}

impl PipelineEvent {
    /// Run id of any event
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::StepStarted { run_id, .. }
            | Self::StepCompleted { run_id, .. }
            | Self::StepReplayed { run_id, .. }
            | Self::StepFailed { run_id, .. }
            | Self::StatusChanged { run_id, .. }
            | Self::RunCompleted { run_id }
            | Self::RunFailed { run_id, .. } => *run_id,
        }
    }
}

/// Broadcast-based event bus
///
/// Slow subscribers lag and miss events rather than blocking the pipeline.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receiver for all future events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    /// Publish to every subscriber, returning how many received it
    pub fn publish(&self, event: PipelineEvent) -> usize {
        // no receivers is fine
        self.sender.send(event).unwrap_or(0)
    }

    /// Number of active subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let run_id = Uuid::new_v4();

        bus.publish(PipelineEvent::StepStarted {
            run_id,
            step: "research_profile".to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.run_id(), run_id);
        match event {
            PipelineEvent::StepStarted { step, .. } => assert_eq!(step, "research_profile"),
            _ => panic!("unexpected event type"),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(
            bus.publish(PipelineEvent::RunCompleted {
                run_id: Uuid::new_v4()
            }),
            0
        );
    }

    #[test]
    fn test_event_serialization() {
        let event = PipelineEvent::StatusChanged {
            run_id: Uuid::nil(),
            status: RunStatus::Generating,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status_changed");
        assert_eq!(json["status"], "generating");
    }
}
