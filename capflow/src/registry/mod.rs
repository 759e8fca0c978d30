//! Capability registry and per-request snapshots.
//!
//! The registry is shared, read-mostly state. Runs never read it directly:
//! they take a [`CapabilitySnapshot`] when they start, so registration
//! changes made while a run is in flight cannot affect that run.

mod snapshot;

pub use snapshot::{CapabilitySnapshot, Resolution};

use crate::core::CapabilityId;
use crate::providers::CapabilityProvider;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry of the providers known to the system.
#[derive(Default)]
pub struct CapabilityRegistry {
    providers: RwLock<HashMap<CapabilityId, Arc<dyn CapabilityProvider>>>,
}

impl CapabilityRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider, replacing any previous one for the capability.
    ///
    /// Returns the replaced provider, if any.
    pub fn register(
        &self,
        capability: CapabilityId,
        provider: Arc<dyn CapabilityProvider>,
    ) -> Option<Arc<dyn CapabilityProvider>> {
        if provider.capability() != capability {
            warn!(
                registered_as = %capability,
                implements = %provider.capability(),
                "Provider registered under a different capability than it implements"
            );
        }
        debug!(capability = %capability, "Registering capability provider");
        self.providers.write().insert(capability, provider)
    }

    /// Removes a provider. Returns true if one was registered.
    pub fn deregister(&self, capability: CapabilityId) -> bool {
        self.providers.write().remove(&capability).is_some()
    }

    /// Returns true if a provider is registered for the capability.
    #[must_use]
    pub fn is_registered(&self, capability: CapabilityId) -> bool {
        self.providers.read().contains_key(&capability)
    }

    /// Lists registered capabilities in a stable order.
    #[must_use]
    pub fn registered(&self) -> Vec<CapabilityId> {
        let mut caps: Vec<_> = self.providers.read().keys().copied().collect();
        caps.sort_unstable();
        caps
    }

    /// Captures an immutable view for one request.
    ///
    /// The view holds the core capabilities (generation and translation)
    /// plus the optional ones in `enabled`, each only if a provider is
    /// registered. Enabled capabilities without a provider resolve as
    /// unavailable; that is not an error.
    #[must_use]
    pub fn snapshot(&self, enabled: &BTreeSet<CapabilityId>) -> CapabilitySnapshot {
        let providers = self.providers.read();
        let resolved = CapabilityId::ALL
            .into_iter()
            .filter(|cap| !cap.is_optional() || enabled.contains(cap))
            .filter_map(|cap| providers.get(&cap).map(|p| (cap, Arc::clone(p))))
            .collect();

        CapabilitySnapshot::new(enabled.clone(), resolved)
    }

    /// Captures a snapshot from identifier strings; unknown ids are ignored.
    #[must_use]
    pub fn snapshot_ids<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> CapabilitySnapshot {
        let enabled = ids
            .into_iter()
            .filter_map(|id| {
                let cap = CapabilityId::from_id(id);
                if cap.is_none() {
                    debug!(capability = id, "Unknown capability resolves as unavailable");
                }
                cap
            })
            .collect();
        self.snapshot(&enabled)
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("registered", &self.registered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageOutcome;
    use crate::providers::FnProvider;

    fn provider(cap: CapabilityId) -> Arc<dyn CapabilityProvider> {
        Arc::new(FnProvider::new(cap, |_| StageOutcome::text("ok")))
    }

    #[test]
    fn test_register_and_replace() {
        let registry = CapabilityRegistry::new();
        assert!(registry.register(CapabilityId::Generate, provider(CapabilityId::Generate)).is_none());
        assert!(registry.register(CapabilityId::Generate, provider(CapabilityId::Generate)).is_some());
        assert_eq!(registry.registered(), vec![CapabilityId::Generate]);
    }

    #[test]
    fn test_deregister() {
        let registry = CapabilityRegistry::new();
        registry.register(CapabilityId::Recommend, provider(CapabilityId::Recommend));

        assert!(registry.deregister(CapabilityId::Recommend));
        assert!(!registry.deregister(CapabilityId::Recommend));
        assert!(!registry.is_registered(CapabilityId::Recommend));
    }

    #[test]
    fn test_snapshot_restricts_optional_capabilities() {
        let registry = CapabilityRegistry::new();
        for cap in CapabilityId::ALL {
            registry.register(cap, provider(cap));
        }

        let enabled: BTreeSet<_> = [CapabilityId::Recommend].into_iter().collect();
        let snapshot = registry.snapshot(&enabled);

        assert!(snapshot.is_available(CapabilityId::Generate));
        assert!(snapshot.is_available(CapabilityId::Translate));
        assert!(snapshot.is_available(CapabilityId::Recommend));
        assert!(!snapshot.is_available(CapabilityId::Summarize));
        assert!(!snapshot.is_available(CapabilityId::ExtractText));
    }

    #[test]
    fn test_enabled_but_unregistered_is_unavailable() {
        let registry = CapabilityRegistry::new();
        let enabled: BTreeSet<_> = [CapabilityId::Summarize].into_iter().collect();
        let snapshot = registry.snapshot(&enabled);

        assert!(snapshot.is_enabled(CapabilityId::Summarize));
        assert!(!snapshot.is_available(CapabilityId::Summarize));
        assert!(matches!(snapshot.resolve(CapabilityId::Summarize), Resolution::Unavailable));
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_changes() {
        let registry = CapabilityRegistry::new();
        registry.register(CapabilityId::Generate, provider(CapabilityId::Generate));
        let snapshot = registry.snapshot(&BTreeSet::new());

        registry.deregister(CapabilityId::Generate);
        registry.register(CapabilityId::Translate, provider(CapabilityId::Translate));

        assert!(snapshot.is_available(CapabilityId::Generate));
        assert!(!snapshot.is_available(CapabilityId::Translate));
    }

    #[test]
    fn test_snapshot_ids_ignores_unknown() {
        let registry = CapabilityRegistry::new();
        registry.register(CapabilityId::Recommend, provider(CapabilityId::Recommend));

        let snapshot = registry.snapshot_ids(["recommend", "mind-reading"]);
        assert!(snapshot.is_available(CapabilityId::Recommend));
        assert_eq!(snapshot.enabled().len(), 1);
    }
}
