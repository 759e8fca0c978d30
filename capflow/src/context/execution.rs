//! Mutable accumulator for one pipeline run.

use super::StageOutputs;
use crate::core::{CapabilityId, Language, PipelineOutcome, PipelineRequest, StageId, StagePayload};
use crate::errors::OutputConflictError;
use crate::providers::ProviderInput;
use std::time::Duration;
use uuid::Uuid;

/// The context threaded through the stages of one run.
///
/// Owned exclusively by the executor run that created it and dropped when
/// the run ends, is cancelled, or is handed to the fallback controller.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineContext {
    run_id: Uuid,
    working_text: String,
    text_language: Language,
    generation_prompt: Option<String>,
    outputs: StageOutputs,
    recommendations: Vec<String>,
}

impl PipelineContext {
    /// Creates a fresh context seeded from the request text.
    #[must_use]
    pub fn new(run_id: Uuid, request: &PipelineRequest) -> Self {
        Self {
            run_id,
            working_text: request.text().to_string(),
            text_language: request.source_language(),
            generation_prompt: None,
            outputs: StageOutputs::new(),
            recommendations: Vec::new(),
        }
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the current working text.
    #[must_use]
    pub fn working_text(&self) -> &str {
        &self.working_text
    }

    /// Returns the language the working text is in.
    #[must_use]
    pub fn text_language(&self) -> Language {
        self.text_language
    }

    /// Returns the text the generation stage received, once it has run.
    #[must_use]
    pub fn generation_prompt(&self) -> Option<&str> {
        self.generation_prompt.as_deref()
    }

    /// Returns the raw stage outputs.
    #[must_use]
    pub fn outputs(&self) -> &StageOutputs {
        &self.outputs
    }

    /// Returns the recommendations collected so far.
    #[must_use]
    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    /// Returns true if the stage completed in this run.
    #[must_use]
    pub fn has_completed(&self, stage: StageId) -> bool {
        self.outputs.contains(stage)
    }

    /// Capabilities of the completed stages, deduplicated, in first-use order.
    #[must_use]
    pub fn capabilities_used(&self) -> Vec<CapabilityId> {
        let mut used = Vec::new();
        for stage in self.outputs.stages() {
            let cap = stage.capability();
            if !used.contains(&cap) {
                used.push(cap);
            }
        }
        used
    }

    /// Builds the provider input for the next stage.
    #[must_use]
    pub fn provider_input(
        &self,
        stage: StageId,
        request: &PipelineRequest,
        pivot: Language,
        char_budget: usize,
    ) -> ProviderInput {
        let target_language = match stage {
            StageId::TranslateToPivot => pivot,
            StageId::TranslateFromPivot => request.display_language(),
            _ => self.text_language,
        };

        ProviderInput {
            stage,
            text: self.working_text.clone(),
            text_language: self.text_language,
            target_language,
            attachments: if stage == StageId::Extract {
                request.attachments().to_vec()
            } else {
                Vec::new()
            },
            prior_outputs: self.outputs.to_vec(),
            char_budget: (stage == StageId::Summarize).then_some(char_budget),
        }
    }

    /// Merges a successful stage payload.
    ///
    /// Extraction appends to the working text; the other carrier stages
    /// replace it. Recommendations are appended in order. The raw payload
    /// is recorded under the stage id either way.
    ///
    /// # Errors
    ///
    /// Returns `OutputConflictError` if the stage already has an output; the
    /// context is left unchanged.
    pub fn apply(
        &mut self,
        stage: StageId,
        payload: StagePayload,
        target_language: Language,
    ) -> Result<(), OutputConflictError> {
        if self.outputs.contains(stage) {
            return Err(OutputConflictError::new(stage.as_str()));
        }

        match (stage, payload.text.as_deref()) {
            (StageId::Recommend, _) => {
                self.recommendations
                    .extend(payload.recommendations.iter().cloned());
            }
            (StageId::Extract, Some(extracted)) => {
                if self.working_text.trim().is_empty() {
                    self.working_text = extracted.to_string();
                } else {
                    self.working_text = format!("{}\n\n{extracted}", self.working_text);
                }
            }
            (StageId::Generate, Some(generated)) => {
                self.generation_prompt =
                    Some(std::mem::replace(&mut self.working_text, generated.to_string()));
                self.text_language = payload.language.unwrap_or(target_language);
            }
            (_, Some(text)) => {
                self.working_text = text.to_string();
                self.text_language = payload.language.unwrap_or(target_language);
            }
            (_, None) => {}
        }

        self.outputs.record(stage, payload)
    }

    /// Consumes the context into the outcome of a completed run.
    #[must_use]
    pub fn into_outcome(self, elapsed: Duration) -> PipelineOutcome {
        let capabilities_used = self.capabilities_used();
        PipelineOutcome::completed(
            self.working_text,
            self.text_language,
            self.recommendations,
            capabilities_used,
            elapsed,
        )
    }
}
