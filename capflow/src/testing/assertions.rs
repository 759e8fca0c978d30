//! Test assertions for pipeline outcomes and progress events.

use std::collections::HashSet;

use crate::core::{PipelineOutcome, ProgressEvent, RunOutcome, StageId, StageTransition};
use crate::pipeline::StagePlan;

/// Asserts that the run completed and returns its outcome.
pub fn assert_completed(outcome: &RunOutcome) -> &PipelineOutcome {
    match outcome {
        RunOutcome::Completed(outcome) => outcome,
        RunOutcome::Cancelled { reason } => panic!("Expected a completed run, got cancellation: {reason}"),
    }
}

/// Asserts that the outcome came from the fallback path with non-empty text.
pub fn assert_degraded(outcome: &PipelineOutcome) {
    assert!(
        outcome.metadata().degraded(),
        "Expected a degraded outcome, got: {:?}",
        outcome
    );
    assert!(
        !outcome.text().trim().is_empty(),
        "Degraded outcome has empty text"
    );
}

/// Asserts that the outcome completed its whole plan.
pub fn assert_not_degraded(outcome: &PipelineOutcome) {
    assert!(
        !outcome.metadata().degraded(),
        "Expected a normal outcome, got degraded (failed at {:?})",
        outcome.metadata().failed_at()
    );
}

/// Asserts that the plan has exactly the expected stages.
pub fn assert_plan(plan: &StagePlan, expected: &[StageId]) {
    assert_eq!(
        plan.stages(),
        expected,
        "Expected plan {:?}, got {}",
        expected,
        plan
    );
}

/// Asserts the progress-stream guarantees for one run.
///
/// Sequences start at 1 and increase by exactly one, every event carries
/// the same run id, and no stage succeeds twice.
pub fn assert_gapless(events: &[ProgressEvent]) {
    let Some(first) = events.first() else {
        return;
    };

    for (index, event) in events.iter().enumerate() {
        assert_eq!(
            event.sequence,
            index as u64 + 1,
            "Sequence gap at position {index}: {:?}",
            events.iter().map(|e| e.sequence).collect::<Vec<_>>()
        );
        assert_eq!(event.run_id, first.run_id, "Events from more than one run");
    }

    let mut succeeded = HashSet::new();
    for event in events.iter().filter(|e| e.transition == StageTransition::Succeeded) {
        assert!(
            succeeded.insert(event.stage),
            "Stage {} succeeded more than once",
            event.stage
        );
    }
}

/// Returns the stages that reported a transition, in order.
#[must_use]
pub fn stages_with(events: &[ProgressEvent], transition: StageTransition) -> Vec<StageId> {
    events
        .iter()
        .filter(|e| e.transition == transition)
        .map(|e| e.stage)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_gapless_accepts_valid_stream() {
        let run_id = Uuid::new_v4();
        let events = vec![
            ProgressEvent::new(run_id, 1, StageId::Generate, StageTransition::Started),
            ProgressEvent::new(run_id, 2, StageId::Generate, StageTransition::Succeeded),
        ];
        assert_gapless(&events);
        assert_eq!(stages_with(&events, StageTransition::Succeeded), vec![StageId::Generate]);
    }

    #[test]
    #[should_panic(expected = "Sequence gap")]
    fn test_gapless_rejects_gap() {
        let run_id = Uuid::new_v4();
        let events = vec![
            ProgressEvent::new(run_id, 1, StageId::Generate, StageTransition::Started),
            ProgressEvent::new(run_id, 3, StageId::Generate, StageTransition::Succeeded),
        ];
        assert_gapless(&events);
    }

    #[test]
    #[should_panic(expected = "succeeded more than once")]
    fn test_gapless_rejects_duplicate_success() {
        let run_id = Uuid::new_v4();
        let events = vec![
            ProgressEvent::new(run_id, 1, StageId::Generate, StageTransition::Succeeded),
            ProgressEvent::new(run_id, 2, StageId::Generate, StageTransition::Succeeded),
        ];
        assert_gapless(&events);
    }
}
