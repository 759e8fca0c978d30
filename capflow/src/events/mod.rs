//! Progress reporting for pipeline runs.
//!
//! Observers are registered on a shared [`ObserverRegistry`]; every run
//! copies the current observer list into its own [`ProgressReporter`].

mod reporter;
mod sink;

pub use reporter::ProgressReporter;
#[cfg(test)]
pub use sink::MockProgressObserver;
pub use sink::{ChannelObserver, CollectingObserver, LoggingObserver, ProgressObserver};

use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// Handle returned by [`ObserverRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared, ordered list of progress observers.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<Vec<(ObserverId, Arc<dyn ProgressObserver>)>>,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer. Observers are notified in registration order.
    pub fn register(&self, observer: Arc<dyn ProgressObserver>) -> ObserverId {
        let id = ObserverId(crate::utils::generate_uuid());
        self.observers.write().push((id, observer));
        id
    }

    /// Removes an observer. Returns false if it was not registered.
    pub fn deregister(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Returns the number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Returns true if no observers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Copies the current observer list.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<dyn ProgressObserver>> {
        self.observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }

    /// Builds a reporter for a new run over the current observer list.
    #[must_use]
    pub fn reporter(&self, run_id: Uuid) -> ProgressReporter {
        ProgressReporter::new(run_id, self.snapshot())
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{StageId, StageTransition};

    #[test]
    fn test_register_and_deregister() {
        let registry = ObserverRegistry::new();
        let id = registry.register(Arc::new(CollectingObserver::new()));
        assert_eq!(registry.len(), 1);

        assert!(registry.deregister(id));
        assert!(!registry.deregister(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reporter_copies_observers_at_start() {
        let registry = ObserverRegistry::new();
        let early = Arc::new(CollectingObserver::new());
        registry.register(early.clone());

        let mut reporter = registry.reporter(Uuid::new_v4());

        let late = Arc::new(CollectingObserver::new());
        registry.register(late.clone());

        reporter.emit(StageId::Generate, StageTransition::Started);
        assert_eq!(early.len(), 1);
        assert!(late.is_empty());
    }
}
