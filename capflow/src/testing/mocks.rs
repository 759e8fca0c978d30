//! Fake capability providers for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use crate::core::{CapabilityId, StageId, StageOutcome};
use crate::providers::{CapabilityProvider, ProviderInput};

/// A provider that records its inputs and returns scripted outcomes.
///
/// Outcomes can be scripted per stage, which matters for `translate`: one
/// provider serves both translation legs.
#[derive(Debug)]
pub struct ScriptedProvider {
    capability: CapabilityId,
    default: Mutex<StageOutcome>,
    per_stage: Mutex<HashMap<StageId, StageOutcome>>,
    calls: Mutex<Vec<ProviderInput>>,
}

impl ScriptedProvider {
    /// Creates a provider that always returns `outcome`.
    #[must_use]
    pub fn new(capability: CapabilityId, outcome: StageOutcome) -> Self {
        Self {
            capability,
            default: Mutex::new(outcome),
            per_stage: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a provider that always succeeds with `text`.
    #[must_use]
    pub fn text(capability: CapabilityId, text: impl Into<String>) -> Self {
        Self::new(capability, StageOutcome::text(text))
    }

    /// Scripts the outcome returned for one stage.
    #[must_use]
    pub fn with_stage_reply(self, stage: StageId, outcome: StageOutcome) -> Self {
        self.per_stage.lock().insert(stage, outcome);
        self
    }

    /// Replaces the default outcome.
    pub fn set_outcome(&self, outcome: StageOutcome) {
        *self.default.lock() = outcome;
    }

    /// Returns the number of times the provider was invoked.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns every input the provider received.
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderInput> {
        self.calls.lock().clone()
    }

    /// Returns the stages the provider was invoked for, in order.
    #[must_use]
    pub fn stages_called(&self) -> Vec<StageId> {
        self.calls.lock().iter().map(|input| input.stage).collect()
    }

    /// Clears recorded calls.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl CapabilityProvider for ScriptedProvider {
    fn capability(&self) -> CapabilityId {
        self.capability
    }

    async fn invoke(&self, input: &ProviderInput) -> StageOutcome {
        self.calls.lock().push(input.clone());
        let scripted = self.per_stage.lock().get(&input.stage).cloned();
        scripted.unwrap_or_else(|| self.default.lock().clone())
    }
}

/// A provider that always fails.
#[derive(Debug)]
pub struct FailingProvider {
    capability: CapabilityId,
    reason: String,
}

impl FailingProvider {
    /// Creates a new failing provider.
    #[must_use]
    pub fn new(capability: CapabilityId, reason: impl Into<String>) -> Self {
        Self {
            capability,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CapabilityProvider for FailingProvider {
    fn capability(&self) -> CapabilityId {
        self.capability
    }

    async fn invoke(&self, input: &ProviderInput) -> StageOutcome {
        StageOutcome::failure(input.stage, &self.reason)
    }
}

/// A provider that takes time before answering.
#[derive(Debug)]
pub struct SlowProvider {
    capability: CapabilityId,
    delay: Duration,
    text: String,
}

impl SlowProvider {
    /// Creates a provider that answers `text` after `delay`.
    #[must_use]
    pub fn new(capability: CapabilityId, delay: Duration, text: impl Into<String>) -> Self {
        Self {
            capability,
            delay,
            text: text.into(),
        }
    }

    /// Creates a slow provider with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(capability: CapabilityId, ms: u64) -> Self {
        Self::new(capability, Duration::from_millis(ms), "slow reply")
    }
}

#[async_trait]
impl CapabilityProvider for SlowProvider {
    fn capability(&self) -> CapabilityId {
        self.capability
    }

    async fn invoke(&self, _input: &ProviderInput) -> StageOutcome {
        tokio::time::sleep(self.delay).await;
        StageOutcome::text(&self.text)
    }
}

/// A provider that panics inside its future.
#[derive(Debug)]
pub struct PanickingProvider {
    capability: CapabilityId,
}

impl PanickingProvider {
    /// Creates a new panicking provider.
    #[must_use]
    pub fn new(capability: CapabilityId) -> Self {
        Self { capability }
    }
}

#[async_trait]
impl CapabilityProvider for PanickingProvider {
    fn capability(&self) -> CapabilityId {
        self.capability
    }

    async fn invoke(&self, input: &ProviderInput) -> StageOutcome {
        panic!("provider for {} panicked", input.stage);
    }
}
