//! Progress event emitted on every stage transition.

use super::{StageId, StageTransition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stage transition as seen by progress observers.
///
/// Sequence numbers start at 1 and are gapless and strictly increasing
/// within one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The run this event belongs to.
    pub run_id: Uuid,

    /// Position of this event within the run.
    pub sequence: u64,

    /// The stage that transitioned.
    pub stage: StageId,

    /// What happened to the stage.
    pub transition: StageTransition,

    /// When the event occurred (RFC 3339).
    pub timestamp: String,
}

impl ProgressEvent {
    /// Creates a new progress event stamped with the current time.
    #[must_use]
    pub fn new(run_id: Uuid, sequence: u64, stage: StageId, transition: StageTransition) -> Self {
        Self {
            run_id,
            sequence,
            stage,
            transition,
            timestamp: crate::utils::iso_timestamp(),
        }
    }

    /// Returns the dotted event type, e.g. `stage.started`.
    #[must_use]
    pub fn event_type(&self) -> String {
        format!("stage.{}", self.transition)
    }

    /// Returns a short status line suitable for a UI.
    #[must_use]
    pub fn status_line(&self) -> String {
        format!("[{}] {} {}", self.sequence, self.stage, self.transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let run_id = Uuid::new_v4();
        let event = ProgressEvent::new(run_id, 1, StageId::Generate, StageTransition::Started);

        assert_eq!(event.run_id, run_id);
        assert_eq!(event.sequence, 1);
        assert_eq!(event.event_type(), "stage.started");
        assert!(event.timestamp.contains('T'));
    }

    #[test]
    fn test_status_line() {
        let event = ProgressEvent::new(
            Uuid::new_v4(),
            4,
            StageId::TranslateFromPivot,
            StageTransition::Failed,
        );
        assert_eq!(event.status_line(), "[4] translate-from-pivot failed");
    }

    #[test]
    fn test_event_serialization() {
        let event = ProgressEvent::new(Uuid::new_v4(), 2, StageId::Summarize, StageTransition::Succeeded);
        let json = serde_json::to_string(&event).unwrap();
        let back: ProgressEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(event, back);
    }
}
