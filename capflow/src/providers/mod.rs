//! Capability provider trait and adapters.
//!
//! A provider is one named unit of work. It is stateless from the pipeline's
//! point of view: it receives a [`ProviderInput`] assembled by the executor
//! and answers with a [`StageOutcome`]. Providers never signal failure by
//! panicking or erroring; every failure is a `StageOutcome::Failure`.

pub mod local;

use crate::core::{Attachment, CapabilityId, Language, StageId, StageOutcome, StagePayload};
use async_trait::async_trait;
use std::fmt::Debug;

/// Everything a provider may read for one stage invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderInput {
    /// The stage being executed.
    pub stage: StageId,
    /// Current working text.
    pub text: String,
    /// Language the working text is in.
    pub text_language: Language,
    /// Language the stage is expected to produce.
    pub target_language: Language,
    /// Request attachments, in order.
    pub attachments: Vec<Attachment>,
    /// Raw outputs of the stages that already ran, in execution order.
    pub prior_outputs: Vec<(StageId, StagePayload)>,
    /// Character budget for size-constrained stages.
    pub char_budget: Option<usize>,
}

impl ProviderInput {
    /// Creates an input carrying only text, in one language.
    #[must_use]
    pub fn new(stage: StageId, text: impl Into<String>, language: Language) -> Self {
        Self {
            stage,
            text: text.into(),
            text_language: language,
            target_language: language,
            attachments: Vec::new(),
            prior_outputs: Vec::new(),
            char_budget: None,
        }
    }

    /// Sets the target language.
    #[must_use]
    pub fn with_target_language(mut self, language: Language) -> Self {
        self.target_language = language;
        self
    }

    /// Sets the attachments.
    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Sets the character budget.
    #[must_use]
    pub fn with_char_budget(mut self, budget: usize) -> Self {
        self.char_budget = Some(budget);
        self
    }

    /// Returns the raw output of an earlier stage.
    #[must_use]
    pub fn prior(&self, stage: StageId) -> Option<&StagePayload> {
        self.prior_outputs
            .iter()
            .find(|(id, _)| *id == stage)
            .map(|(_, payload)| payload)
    }
}

/// Trait for capability providers.
///
/// Implementations must be cheap to share: the registry hands out
/// `Arc<dyn CapabilityProvider>` to every concurrent run.
#[async_trait]
pub trait CapabilityProvider: Send + Sync + Debug {
    /// Returns the capability this provider implements.
    fn capability(&self) -> CapabilityId;

    /// Invokes the provider for one stage.
    async fn invoke(&self, input: &ProviderInput) -> StageOutcome;
}

/// A provider backed by a plain function.
pub struct FnProvider<F>
where
    F: Fn(&ProviderInput) -> StageOutcome + Send + Sync,
{
    capability: CapabilityId,
    func: F,
}

impl<F> FnProvider<F>
where
    F: Fn(&ProviderInput) -> StageOutcome + Send + Sync,
{
    /// Creates a new function-backed provider.
    pub fn new(capability: CapabilityId, func: F) -> Self {
        Self { capability, func }
    }
}

impl<F> Debug for FnProvider<F>
where
    F: Fn(&ProviderInput) -> StageOutcome + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProvider")
            .field("capability", &self.capability)
            .finish()
    }
}

#[async_trait]
impl<F> CapabilityProvider for FnProvider<F>
where
    F: Fn(&ProviderInput) -> StageOutcome + Send + Sync,
{
    fn capability(&self) -> CapabilityId {
        self.capability
    }

    async fn invoke(&self, input: &ProviderInput) -> StageOutcome {
        (self.func)(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_provider() {
        let provider = FnProvider::new(CapabilityId::Generate, |input| {
            StageOutcome::text(format!("echo: {}", input.text))
        });

        assert_eq!(provider.capability(), CapabilityId::Generate);

        let input = ProviderInput::new(StageId::Generate, "hello", Language::English);
        let outcome = provider.invoke(&input).await;
        assert_eq!(outcome.payload().unwrap().text.as_deref(), Some("echo: hello"));
    }

    #[test]
    fn test_prior_lookup() {
        let mut input = ProviderInput::new(StageId::Recommend, "answer", Language::English);
        input
            .prior_outputs
            .push((StageId::Generate, StagePayload::text("answer")));

        assert!(input.prior(StageId::Generate).is_some());
        assert!(input.prior(StageId::Extract).is_none());
    }

    #[test]
    fn test_debug_hides_closure() {
        let provider = FnProvider::new(CapabilityId::Summarize, |_| StageOutcome::text(""));
        let debug = format!("{provider:?}");
        assert!(debug.contains("Summarize"));
    }
}
