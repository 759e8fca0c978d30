//! Degraded-mode replies for failed runs.
//!
//! The controller walks an ordered list of [`FallbackSource`]s and takes the
//! first non-empty reply. Sources only read what the run already has in
//! memory, so the fallback path performs no network I/O. When every source
//! comes up empty the configured apology is returned, which makes
//! [`OfflineFallbackController::fallback`] total.

use super::cache::ResponseCache;
use crate::config::{PipelineConfig, EXCERPT_PLACEHOLDER};
use crate::context::PipelineContext;
use crate::core::{Language, PipelineOutcome, PipelineRequest, StageId};
use crate::utils::panic_message;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Maximum number of characters of working text quoted in a template.
pub const EXCERPT_CHARS: usize = 120;

/// Used when the configured apology is blank.
pub const DEFAULT_APOLOGY: &str = "Sorry, something went wrong. Please try again later.";

/// What a fallback source may inspect about the failed run.
#[derive(Debug, Clone, Copy)]
pub struct FailureContext<'a> {
    /// The original request.
    pub request: &'a PipelineRequest,
    /// The run context as it was when the stage failed.
    pub context: &'a PipelineContext,
    /// The failing stage.
    pub failed_at: StageId,
    /// The failure reason reported by the stage.
    pub reason: &'a str,
    /// The configured pivot language.
    pub pivot: Language,
}

/// A reply produced by a fallback source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackReply {
    /// The reply text.
    pub text: String,
    /// The language of `text`.
    pub language: Language,
    /// Recommendations to deliver with the reply.
    pub recommendations: Vec<String>,
}

impl FallbackReply {
    /// Creates a reply without recommendations.
    #[must_use]
    pub fn new(text: impl Into<String>, language: Language) -> Self {
        Self {
            text: text.into(),
            language,
            recommendations: Vec::new(),
        }
    }
}

/// One way of producing a degraded reply.
pub trait FallbackSource: Send + Sync + Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Produces a reply, or `None` if this source has nothing to offer.
    fn reply(&self, failure: &FailureContext<'_>) -> Option<FallbackReply>;
}

/// Reuses the generated response when the failure came after generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartialResultSource;

impl FallbackSource for PartialResultSource {
    fn name(&self) -> &'static str {
        "partial_result"
    }

    fn reply(&self, failure: &FailureContext<'_>) -> Option<FallbackReply> {
        let ctx = failure.context;
        if !ctx.has_completed(StageId::Generate) {
            return None;
        }
        Some(FallbackReply {
            text: ctx.working_text().to_string(),
            language: ctx.text_language(),
            recommendations: ctx.recommendations().to_vec(),
        })
    }
}

/// Replays a reply cached by an earlier successful run.
#[derive(Debug, Clone)]
pub struct CachedReplySource {
    cache: Arc<ResponseCache>,
}

impl CachedReplySource {
    /// Creates a source reading from the shared cache.
    #[must_use]
    pub fn new(cache: Arc<ResponseCache>) -> Self {
        Self { cache }
    }
}

impl FallbackSource for CachedReplySource {
    fn name(&self) -> &'static str {
        "cached_reply"
    }

    fn reply(&self, failure: &FailureContext<'_>) -> Option<FallbackReply> {
        let cached = self.cache.lookup(
            failure.request.display_language(),
            failure.context.working_text(),
        )?;
        Some(FallbackReply {
            text: cached.text,
            language: cached.language,
            recommendations: cached.recommendations,
        })
    }
}

/// Fills a per-language offline template with an excerpt of the working text.
#[derive(Debug, Clone, Default)]
pub struct TemplateSource {
    templates: HashMap<Language, String>,
}

impl TemplateSource {
    /// Creates a source over the given templates.
    #[must_use]
    pub fn new(templates: HashMap<Language, String>) -> Self {
        Self { templates }
    }

    fn excerpt(text: &str) -> String {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.chars().count() <= EXCERPT_CHARS {
            return collapsed;
        }
        let cut: String = collapsed.chars().take(EXCERPT_CHARS).collect();
        format!("{}…", cut.trim_end())
    }
}

impl FallbackSource for TemplateSource {
    fn name(&self) -> &'static str {
        "template"
    }

    fn reply(&self, failure: &FailureContext<'_>) -> Option<FallbackReply> {
        let display = failure.request.display_language();
        let (language, template) = self
            .templates
            .get(&display)
            .map(|t| (display, t))
            .or_else(|| self.templates.get(&failure.pivot).map(|t| (failure.pivot, t)))?;

        let text = template.replace(EXCERPT_PLACEHOLDER, &Self::excerpt(failure.context.working_text()));
        Some(FallbackReply::new(text, language))
    }
}

/// Produces the degraded outcome of a failed run.
#[derive(Debug, Clone)]
pub struct OfflineFallbackController {
    sources: Vec<Arc<dyn FallbackSource>>,
    apology_text: String,
    pivot: Language,
}

impl OfflineFallbackController {
    /// Creates a controller with no sources; every fallback yields the apology.
    #[must_use]
    pub fn new(apology_text: impl Into<String>, pivot: Language) -> Self {
        Self {
            sources: Vec::new(),
            apology_text: apology_text.into(),
            pivot,
        }
    }

    /// Creates the standard chain: partial result, cached reply, template.
    #[must_use]
    pub fn from_config(config: &PipelineConfig, cache: Arc<ResponseCache>) -> Self {
        Self::new(config.apology_text.clone(), config.pivot_language)
            .with_source(Arc::new(PartialResultSource))
            .with_source(Arc::new(CachedReplySource::new(cache)))
            .with_source(Arc::new(TemplateSource::new(config.offline_templates.clone())))
    }

    /// Appends a source to the chain.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn FallbackSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Returns the source names in the order they are tried.
    #[must_use]
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Builds the degraded outcome for a run that failed at `failed_at`.
    ///
    /// Never fails and never returns empty text.
    #[must_use]
    pub fn fallback(
        &self,
        request: &PipelineRequest,
        context: &PipelineContext,
        failed_at: StageId,
        reason: &str,
        started: Instant,
    ) -> PipelineOutcome {
        let failure = FailureContext {
            request,
            context,
            failed_at,
            reason,
            pivot: self.pivot,
        };

        let reply = self.first_reply(&failure).unwrap_or_else(|| {
            info!(
                run_id = %context.run_id(),
                failed_at = %failed_at,
                "No fallback source produced a reply, using apology"
            );
            let text = if self.apology_text.trim().is_empty() {
                DEFAULT_APOLOGY.to_string()
            } else {
                self.apology_text.clone()
            };
            FallbackReply::new(text, self.pivot)
        });

        PipelineOutcome::degraded(
            reply.text,
            reply.language,
            reply.recommendations,
            context.capabilities_used(),
            started.elapsed(),
            failed_at,
        )
    }

    fn first_reply(&self, failure: &FailureContext<'_>) -> Option<FallbackReply> {
        for source in &self.sources {
            match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| source.reply(failure))) {
                Ok(Some(reply)) if !reply.text.trim().is_empty() => {
                    debug!(
                        run_id = %failure.context.run_id(),
                        source = source.name(),
                        "Fallback source produced a reply"
                    );
                    return Some(reply);
                }
                Ok(Some(_)) => {
                    debug!(source = source.name(), "Fallback source produced empty text, skipping");
                }
                Ok(None) => {}
                Err(panic) => {
                    warn!(
                        run_id = %failure.context.run_id(),
                        source = source.name(),
                        panic = %panic_message(panic.as_ref()),
                        "Fallback source panicked"
                    );
                }
            }
        }
        None
    }
}
