//! Per-run progress numbering and fan-out.

use super::ProgressObserver;
use crate::core::{ProgressEvent, StageId, StageTransition};
use crate::utils::panic_message;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Stamps sequence numbers for one run and delivers events to observers.
///
/// Owned by the executor of a single run, so sequence numbers are gapless
/// without any synchronization. The observer list is a copy taken when the
/// run starts; later registrations only affect later runs.
pub struct ProgressReporter {
    run_id: Uuid,
    next_sequence: u64,
    observers: Vec<Arc<dyn ProgressObserver>>,
}

impl ProgressReporter {
    /// Creates a reporter for a run.
    #[must_use]
    pub fn new(run_id: Uuid, observers: Vec<Arc<dyn ProgressObserver>>) -> Self {
        Self {
            run_id,
            next_sequence: 1,
            observers,
        }
    }

    /// Creates a reporter with no observers.
    #[must_use]
    pub fn silent(run_id: Uuid) -> Self {
        Self::new(run_id, Vec::new())
    }

    /// Returns the run id stamped on every event.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.next_sequence - 1
    }

    /// Emits a stage transition to every observer, in registration order.
    ///
    /// Never fails: observer errors and panics are logged and swallowed.
    pub fn emit(&mut self, stage: StageId, transition: StageTransition) -> ProgressEvent {
        let event = ProgressEvent::new(self.run_id, self.next_sequence, stage, transition);
        self.next_sequence += 1;

        for (index, observer) in self.observers.iter().enumerate() {
            match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| observer.on_event(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(
                        run_id = %self.run_id,
                        observer = index,
                        sequence = event.sequence,
                        error = %e,
                        "Progress observer failed"
                    );
                }
                Err(panic) => {
                    warn!(
                        run_id = %self.run_id,
                        observer = index,
                        sequence = event.sequence,
                        panic = %panic_message(panic.as_ref()),
                        "Progress observer panicked"
                    );
                }
            }
        }

        event
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("run_id", &self.run_id)
            .field("next_sequence", &self.next_sequence)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CollectingObserver, MockProgressObserver};

    struct PanickingObserver;

    impl ProgressObserver for PanickingObserver {
        fn on_event(&self, _event: &ProgressEvent) -> anyhow::Result<()> {
            panic!("observer exploded");
        }
    }

    #[test]
    fn test_sequences_start_at_one_and_are_gapless() {
        let collector = Arc::new(CollectingObserver::new());
        let mut reporter = ProgressReporter::new(Uuid::new_v4(), vec![collector.clone()]);

        reporter.emit(StageId::Generate, StageTransition::Started);
        reporter.emit(StageId::Generate, StageTransition::Succeeded);
        reporter.emit(StageId::Recommend, StageTransition::Started);

        let sequences: Vec<u64> = collector.events().iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert_eq!(reporter.emitted(), 3);
    }

    #[test]
    fn test_failing_observer_does_not_block_others() {
        let mut failing = MockProgressObserver::new();
        failing
            .expect_on_event()
            .times(2)
            .returning(|_| Err(anyhow::anyhow!("sink offline")));

        let collector = Arc::new(CollectingObserver::new());
        let mut reporter =
            ProgressReporter::new(Uuid::new_v4(), vec![Arc::new(failing), collector.clone()]);

        reporter.emit(StageId::Generate, StageTransition::Started);
        let last = reporter.emit(StageId::Generate, StageTransition::Failed);

        assert_eq!(last.sequence, 2);
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn test_panicking_observer_is_contained() {
        let collector = Arc::new(CollectingObserver::new());
        let mut reporter = ProgressReporter::new(
            Uuid::new_v4(),
            vec![Arc::new(PanickingObserver), collector.clone()],
        );

        reporter.emit(StageId::Summarize, StageTransition::Started);
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_observers_called_in_registration_order() {
        let mut seq = mockall::Sequence::new();
        let mut first = MockProgressObserver::new();
        first
            .expect_on_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let mut second = MockProgressObserver::new();
        second
            .expect_on_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let mut reporter =
            ProgressReporter::new(Uuid::new_v4(), vec![Arc::new(first), Arc::new(second)]);
        reporter.emit(StageId::Extract, StageTransition::Started);
    }
}
