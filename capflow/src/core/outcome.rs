//! The terminal object returned to the caller.

use super::{CapabilityId, Language, StageId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Run diagnostics attached to every outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeMetadata {
    capabilities_used: Vec<CapabilityId>,
    #[serde(rename = "elapsed_ms", with = "duration_ms")]
    elapsed: Duration,
    degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failed_at: Option<StageId>,
}

impl OutcomeMetadata {
    /// Capabilities whose stages completed, in first-use order.
    #[must_use]
    pub fn capabilities_used(&self) -> &[CapabilityId] {
        &self.capabilities_used
    }

    /// Total wall time of the run, fallback included.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// True if the fallback path produced the response.
    #[must_use]
    pub fn degraded(&self) -> bool {
        self.degraded
    }

    /// The stage whose failure triggered the fallback.
    #[must_use]
    pub fn failed_at(&self) -> Option<StageId> {
        self.failed_at
    }
}

/// The composed response of one run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    text: String,
    language: Language,
    recommendations: Vec<String>,
    metadata: OutcomeMetadata,
}

impl PipelineOutcome {
    /// Builds the outcome of a run that completed its whole plan.
    pub(crate) fn completed(
        text: String,
        language: Language,
        recommendations: Vec<String>,
        capabilities_used: Vec<CapabilityId>,
        elapsed: Duration,
    ) -> Self {
        Self {
            text,
            language,
            recommendations,
            metadata: OutcomeMetadata {
                capabilities_used,
                elapsed,
                degraded: false,
                failed_at: None,
            },
        }
    }

    /// Builds a degraded outcome produced by the fallback path.
    pub(crate) fn degraded(
        text: String,
        language: Language,
        recommendations: Vec<String>,
        capabilities_used: Vec<CapabilityId>,
        elapsed: Duration,
        failed_at: StageId,
    ) -> Self {
        Self {
            text,
            language,
            recommendations,
            metadata: OutcomeMetadata {
                capabilities_used,
                elapsed,
                degraded: true,
                failed_at: Some(failed_at),
            },
        }
    }

    /// The final response text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The language `text` is rendered in.
    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    /// Collected recommendations, possibly empty.
    #[must_use]
    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    /// Run diagnostics.
    #[must_use]
    pub fn metadata(&self) -> &OutcomeMetadata {
        &self.metadata
    }

    /// Shorthand for `metadata().degraded()`.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.metadata.degraded
    }
}

/// What the caller receives for one submitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run produced an outcome (normal or degraded).
    Completed(PipelineOutcome),
    /// The run was cancelled or superseded; no outcome exists.
    Cancelled {
        /// The cancellation reason.
        reason: String,
    },
}

impl RunOutcome {
    /// Returns true if the run was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns the outcome, if the run completed.
    #[must_use]
    pub fn outcome(&self) -> Option<&PipelineOutcome> {
        match self {
            Self::Completed(outcome) => Some(outcome),
            Self::Cancelled { .. } => None,
        }
    }

    /// Consumes self, returning the outcome if the run completed.
    #[must_use]
    pub fn into_outcome(self) -> Option<PipelineOutcome> {
        match self {
            Self::Completed(outcome) => Some(outcome),
            Self::Cancelled { .. } => None,
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(ms.max(0.0) / 1000.0))
    }
}
