//! Immutable per-request view of the registry.

use crate::core::CapabilityId;
use crate::providers::CapabilityProvider;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Result of resolving a capability on a snapshot.
#[derive(Clone)]
pub enum Resolution {
    /// A provider is available for this run.
    Available(Arc<dyn CapabilityProvider>),
    /// Not registered, not enabled, or unknown.
    Unavailable,
}

impl Resolution {
    /// Returns true if a provider was resolved.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available(p) => f.debug_tuple("Available").field(p).finish(),
            Self::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// Frozen set of providers one run may use.
///
/// Built by [`CapabilityRegistry::snapshot`](super::CapabilityRegistry::snapshot);
/// it owns its provider handles, so it never observes later registry edits.
#[derive(Clone, Default)]
pub struct CapabilitySnapshot {
    enabled: BTreeSet<CapabilityId>,
    providers: HashMap<CapabilityId, Arc<dyn CapabilityProvider>>,
}

impl CapabilitySnapshot {
    pub(crate) fn new(
        enabled: BTreeSet<CapabilityId>,
        providers: HashMap<CapabilityId, Arc<dyn CapabilityProvider>>,
    ) -> Self {
        Self { enabled, providers }
    }

    /// Resolves a capability. Never panics.
    #[must_use]
    pub fn resolve(&self, capability: CapabilityId) -> Resolution {
        self.providers
            .get(&capability)
            .map_or(Resolution::Unavailable, |p| Resolution::Available(Arc::clone(p)))
    }

    /// Returns true if the capability resolves to a provider.
    #[must_use]
    pub fn is_available(&self, capability: CapabilityId) -> bool {
        self.providers.contains_key(&capability)
    }

    /// Returns true if the capability was toggled on in the request.
    #[must_use]
    pub fn is_enabled(&self, capability: CapabilityId) -> bool {
        self.enabled.contains(&capability)
    }

    /// The enabled set the snapshot was taken with.
    #[must_use]
    pub fn enabled(&self) -> &BTreeSet<CapabilityId> {
        &self.enabled
    }

    /// Capabilities that resolve, in a stable order.
    #[must_use]
    pub fn available(&self) -> Vec<CapabilityId> {
        let mut caps: Vec<_> = self.providers.keys().copied().collect();
        caps.sort_unstable();
        caps
    }
}

impl std::fmt::Debug for CapabilitySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilitySnapshot")
            .field("enabled", &self.enabled)
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot_resolves_nothing() {
        let snapshot = CapabilitySnapshot::default();
        for cap in CapabilityId::ALL {
            assert!(!snapshot.resolve(cap).is_available());
        }
        assert!(snapshot.available().is_empty());
    }

    #[test]
    fn test_debug_lists_available() {
        let snapshot = CapabilitySnapshot::default();
        assert!(format!("{snapshot:?}").contains("available: []"));
    }
}
