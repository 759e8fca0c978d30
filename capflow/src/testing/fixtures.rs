//! Request fixtures and a scripted provider harness.

use std::sync::Arc;

use super::mocks::{FailingProvider, ScriptedProvider};
use crate::config::PipelineConfig;
use crate::core::{
    Attachment, CapabilityId, Language, MediaKind, PipelineRequest, StageId, StageOutcome,
    StagePayload,
};
use crate::errors::CapflowError;
use crate::events::CollectingObserver;
use crate::pipeline::Orchestrator;
use crate::registry::CapabilityRegistry;

/// Text returned by the scripted extractor.
pub const EXTRACTED_TEXT: &str = "Chlorophyll in the leaf captures sunlight.";
/// Text returned by the scripted translator towards the pivot.
pub const PIVOT_TEXT: &str = "God bless you abundantly";
/// Text returned by the scripted translator towards the display language.
pub const LOCALIZED_TEXT: &str = "Natotela sana, Lesa amipale";
/// Text returned by the scripted generator.
pub const GENERATED_TEXT: &str =
    "Photosynthesis is how plants turn sunlight, water and carbon dioxide into sugar and oxygen.";
/// Text returned by the scripted summarizer.
pub const SUMMARY_TEXT: &str = "Plants turn light into sugar.";
/// Recommendation returned by the scripted recommender.
pub const RECOMMENDATION: &str = "Learn more about chlorophyll";

/// "Explain photosynthesis", English in and out, nothing enabled.
#[must_use]
pub fn plain_english_request() -> PipelineRequest {
    PipelineRequest::new("Explain photosynthesis", Language::English)
}

/// A Bemba greeting with recommendations enabled.
#[must_use]
pub fn bemba_request() -> PipelineRequest {
    PipelineRequest::new("Lesa mwamupampila", Language::Bemba).enable(CapabilityId::Recommend)
}

/// An English request with one PDF, extraction and summarization enabled.
#[must_use]
pub fn document_request() -> PipelineRequest {
    PipelineRequest::new("Summarise the attached notes", Language::English)
        .with_attachment(Attachment::inline(
            "notes.pdf",
            MediaKind::Document,
            EXTRACTED_TEXT.as_bytes(),
        ))
        .with_enabled([CapabilityId::ExtractText, CapabilityId::Summarize])
}

/// An English request with recommendations and summarization enabled.
#[must_use]
pub fn full_english_request() -> PipelineRequest {
    plain_english_request().with_enabled([CapabilityId::Recommend, CapabilityId::Summarize])
}

/// A registry of scripted providers, one per capability.
pub struct TestFixture {
    /// The shared registry every provider is registered on.
    pub registry: Arc<CapabilityRegistry>,
    /// Scripted `extract-text` provider.
    pub extractor: Arc<ScriptedProvider>,
    /// Scripted `translate` provider serving both legs.
    pub translator: Arc<ScriptedProvider>,
    /// Scripted `generate` provider.
    pub generator: Arc<ScriptedProvider>,
    /// Scripted `recommend` provider.
    pub recommender: Arc<ScriptedProvider>,
    /// Scripted `summarize` provider.
    pub summarizer: Arc<ScriptedProvider>,
    /// Observer registered by [`orchestrator`](Self::orchestrator).
    pub observer: Arc<CollectingObserver>,
}

impl TestFixture {
    /// Creates a fixture with every capability registered.
    #[must_use]
    pub fn new() -> Self {
        let extractor = Arc::new(ScriptedProvider::text(CapabilityId::ExtractText, EXTRACTED_TEXT));
        let translator = Arc::new(
            ScriptedProvider::text(CapabilityId::Translate, PIVOT_TEXT)
                .with_stage_reply(StageId::TranslateFromPivot, StageOutcome::text(LOCALIZED_TEXT)),
        );
        let generator = Arc::new(ScriptedProvider::text(CapabilityId::Generate, GENERATED_TEXT));
        let recommender = Arc::new(ScriptedProvider::new(
            CapabilityId::Recommend,
            StageOutcome::success(StagePayload::recommendations(vec![RECOMMENDATION.to_string()])),
        ));
        let summarizer = Arc::new(ScriptedProvider::text(CapabilityId::Summarize, SUMMARY_TEXT));

        let registry = Arc::new(CapabilityRegistry::new());
        registry.register(CapabilityId::ExtractText, extractor.clone());
        registry.register(CapabilityId::Translate, translator.clone());
        registry.register(CapabilityId::Generate, generator.clone());
        registry.register(CapabilityId::Recommend, recommender.clone());
        registry.register(CapabilityId::Summarize, summarizer.clone());

        Self {
            registry,
            extractor,
            translator,
            generator,
            recommender,
            summarizer,
            observer: Arc::new(CollectingObserver::new()),
        }
    }

    /// Replaces the generator with one that always fails.
    pub fn fail_generation(&self, reason: &str) {
        self.registry.register(
            CapabilityId::Generate,
            Arc::new(FailingProvider::new(CapabilityId::Generate, reason)),
        );
    }

    /// Builds an orchestrator over the fixture registry with the fixture
    /// observer registered.
    pub fn orchestrator(&self, config: PipelineConfig) -> Result<Orchestrator, CapflowError> {
        let orchestrator = Orchestrator::new(config, Arc::clone(&self.registry))?;
        orchestrator.observers().register(self.observer.clone());
        Ok(orchestrator)
    }

    /// Total provider invocations across the fixture.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        [
            &self.extractor,
            &self.translator,
            &self.generator,
            &self.recommender,
            &self.summarizer,
        ]
        .iter()
        .map(|p| p.call_count())
        .sum()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
