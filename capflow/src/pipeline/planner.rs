//! Stage planning.
//!
//! Planning is a pure function of the request, the configured pivot
//! language and the capability snapshot. It never fails: capabilities that
//! are disabled, unknown or unregistered are simply left out of the plan.

use crate::core::{CapabilityId, Language, PipelineRequest, StageId};
use crate::registry::CapabilitySnapshot;
use serde::Serialize;
use std::fmt;

/// The ordered stages one run will execute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StagePlan {
    stages: Vec<StageId>,
}

impl StagePlan {
    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageId] {
        &self.stages
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Plans always contain `generate`, so they are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns true if the plan contains the stage.
    #[must_use]
    pub fn contains(&self, stage: StageId) -> bool {
        self.stages.contains(&stage)
    }
}

impl fmt::Display for StagePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(|s| s.as_str()).collect();
        f.write_str(&names.join(" -> "))
    }
}

/// Derives stage plans for a fixed pivot language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePlanner {
    pivot: Language,
}

impl StagePlanner {
    /// Creates a planner for the given pivot language.
    #[must_use]
    pub fn new(pivot: Language) -> Self {
        Self { pivot }
    }

    /// Returns the pivot language.
    #[must_use]
    pub fn pivot(&self) -> Language {
        self.pivot
    }

    /// Plans the stages for a request.
    ///
    /// `generate` is always planned, even when no provider backs it; the
    /// executor then fails it and the run degrades. Translation legs are
    /// planned from the languages alone, since a missing translator is an
    /// execution failure rather than a planning decision.
    #[must_use]
    pub fn plan(&self, request: &PipelineRequest, snapshot: &CapabilitySnapshot) -> StagePlan {
        let mut stages = Vec::with_capacity(6);

        if request.has_attachments() && snapshot.is_available(CapabilityId::ExtractText) {
            stages.push(StageId::Extract);
        }
        if request.source_language() != self.pivot {
            stages.push(StageId::TranslateToPivot);
        }

        stages.push(StageId::Generate);

        if snapshot.is_available(CapabilityId::Recommend) {
            stages.push(StageId::Recommend);
        }
        if snapshot.is_available(CapabilityId::Summarize) {
            stages.push(StageId::Summarize);
        }
        if request.display_language() != self.pivot {
            stages.push(StageId::TranslateFromPivot);
        }

        StagePlan { stages }
    }
}

impl Default for StagePlanner {
    fn default() -> Self {
        Self::new(Language::default())
    }
}
