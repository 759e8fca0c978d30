//! Sequential stage execution with abort-on-failure.

use super::cache::{CachedReply, ResponseCache};
use super::fallback::OfflineFallbackController;
use super::planner::StagePlan;
use crate::cancellation::CancellationToken;
use crate::config::PipelineConfig;
use crate::context::PipelineContext;
use crate::core::{
    Language, PipelineOutcome, PipelineRequest, RunOutcome, StageId, StageOutcome, StagePayload,
    StageTransition,
};
use crate::events::ProgressReporter;
use crate::observability::SpanTimer;
use crate::providers::{CapabilityProvider, ProviderInput};
use crate::registry::{CapabilitySnapshot, Resolution};
use crate::utils::panic_message;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Failure reason for a stage whose capability does not resolve.
pub const CAPABILITY_UNAVAILABLE: &str = "capability unavailable";

/// Reason reported when a cancelled token carries none.
const DEFAULT_CANCEL_REASON: &str = "cancelled";

/// Runs stage plans.
///
/// Stages run strictly in plan order. The first failure aborts the run and
/// hands the context to the fallback controller; nothing is retried or
/// reordered. Provider calls are the only suspension points.
#[derive(Debug, Clone)]
pub struct PipelineExecutor {
    fallback: OfflineFallbackController,
    pivot: Language,
    stage_timeout: Option<Duration>,
    char_budget: usize,
    reply_cache: Option<Arc<ResponseCache>>,
}

impl PipelineExecutor {
    /// Creates an executor with no stage timeout and no reply cache.
    #[must_use]
    pub fn new(fallback: OfflineFallbackController, pivot: Language) -> Self {
        Self {
            fallback,
            pivot,
            stage_timeout: None,
            char_budget: crate::config::BandwidthTier::default().summary_char_budget(),
            reply_cache: None,
        }
    }

    /// Creates an executor from configuration, sharing `cache` with the
    /// fallback controller.
    #[must_use]
    pub fn from_config(config: &PipelineConfig, cache: Arc<ResponseCache>) -> Self {
        Self::new(
            OfflineFallbackController::from_config(config, Arc::clone(&cache)),
            config.pivot_language,
        )
        .with_stage_timeout(config.stage_timeout())
        .with_char_budget(config.bandwidth.summary_char_budget())
        .with_reply_cache(cache)
    }

    /// Bounds every provider call. `None` disables the bound.
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Sets the character budget handed to the summarization stage.
    #[must_use]
    pub fn with_char_budget(mut self, budget: usize) -> Self {
        self.char_budget = budget;
        self
    }

    /// Stores replies of completed runs for later offline fallback.
    #[must_use]
    pub fn with_reply_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.reply_cache = Some(cache);
        self
    }

    /// Returns the pivot language.
    #[must_use]
    pub fn pivot(&self) -> Language {
        self.pivot
    }

    /// Executes a plan.
    ///
    /// Returns `Completed` with a normal or degraded outcome, or `Cancelled`
    /// if the token fired. A cancelled run produces no outcome and its
    /// context is dropped.
    pub async fn execute(
        &self,
        plan: &StagePlan,
        request: &PipelineRequest,
        snapshot: &CapabilitySnapshot,
        reporter: &mut ProgressReporter,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let started = Instant::now();
        let mut ctx = PipelineContext::new(reporter.run_id(), request);

        for &stage in plan.stages() {
            if cancel.is_cancelled() {
                return Self::cancelled(&ctx, cancel, stage);
            }

            reporter.emit(stage, StageTransition::Started);
            let timer = SpanTimer::start(stage.as_str());
            let input = ctx.provider_input(stage, request, self.pivot, self.char_budget);

            let outcome = match snapshot.resolve(stage.capability()) {
                Resolution::Available(provider) => {
                    match self.invoke(provider, &input, cancel).await {
                        Some(outcome) => outcome,
                        None => return Self::cancelled(&ctx, cancel, stage),
                    }
                }
                Resolution::Unavailable => StageOutcome::failure(stage, CAPABILITY_UNAVAILABLE),
            };

            // A result that arrives after cancellation is discarded.
            if cancel.is_cancelled() {
                debug!(
                    run_id = %ctx.run_id(),
                    stage = %stage,
                    "Discarding stage result that arrived after cancellation"
                );
                return Self::cancelled(&ctx, cancel, stage);
            }

            let applied = match outcome {
                StageOutcome::Success(payload) => Self::accept(stage, payload)
                    .and_then(|payload| {
                        ctx.apply(stage, payload, input.target_language)
                            .map_err(|e| e.to_string())
                    }),
                StageOutcome::Failure { reason, .. } => Err(reason),
            };

            match applied {
                Ok(()) => {
                    reporter.emit(stage, StageTransition::Succeeded);
                    debug!(
                        run_id = %ctx.run_id(),
                        stage = %stage,
                        duration_ms = timer.finish(),
                        "Stage succeeded"
                    );
                }
                Err(reason) => {
                    reporter.emit(stage, StageTransition::Failed);
                    warn!(
                        run_id = %ctx.run_id(),
                        stage = %stage,
                        reason = %reason,
                        duration_ms = timer.finish(),
                        "Stage failed, switching to offline fallback"
                    );
                    let outcome = self.fallback.fallback(request, &ctx, stage, &reason, started);
                    return RunOutcome::Completed(outcome);
                }
            }
        }

        let outcome = self.complete(ctx, request.display_language(), started.elapsed());
        info!(
            stages = plan.len(),
            elapsed_ms = outcome.metadata().elapsed().as_millis(),
            "Run completed"
        );
        RunOutcome::Completed(outcome)
    }

    /// Invokes a provider, converting panics and timeouts into failures.
    ///
    /// Returns `None` if the token fired while the call was in flight.
    async fn invoke(
        &self,
        provider: Arc<dyn CapabilityProvider>,
        input: &ProviderInput,
        cancel: &CancellationToken,
    ) -> Option<StageOutcome> {
        let stage = input.stage;
        let call = AssertUnwindSafe(provider.invoke(input)).catch_unwind();

        let bounded = async {
            match self.stage_timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => Ok(StageOutcome::failure(
                        stage,
                        format!("timed out after {}ms", limit.as_millis()),
                    )),
                },
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = bounded => Some(match result {
                Ok(outcome) => outcome.attributed_to(stage),
                Err(panic) => StageOutcome::failure(
                    stage,
                    format!("provider panicked: {}", panic_message(panic.as_ref())),
                ),
            }),
        }
    }

    /// Rejects carrier successes that carry no text.
    fn accept(stage: StageId, payload: StagePayload) -> Result<StagePayload, String> {
        let has_text = payload.text.as_deref().is_some_and(|t| !t.trim().is_empty());
        if stage.is_text_carrier() && !has_text {
            return Err("stage produced no text".to_string());
        }
        Ok(payload)
    }

    /// Builds the final outcome and caches it under the text the generation
    /// stage saw, scoped to the display language.
    fn complete(&self, ctx: PipelineContext, display: Language, elapsed: Duration) -> PipelineOutcome {
        let prompt = ctx.generation_prompt().map(str::to_string);
        let outcome = ctx.into_outcome(elapsed);

        if let (Some(cache), Some(prompt)) = (&self.reply_cache, prompt) {
            let reply = CachedReply::new(
                outcome.text(),
                outcome.language(),
                outcome.recommendations().to_vec(),
            );
            cache.store(display, &prompt, reply);
        }

        outcome
    }

    fn cancelled(ctx: &PipelineContext, cancel: &CancellationToken, stage: StageId) -> RunOutcome {
        let reason = cancel
            .reason()
            .unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string());
        info!(
            run_id = %ctx.run_id(),
            stage = %stage,
            reason = %reason,
            "Run cancelled"
        );
        RunOutcome::Cancelled { reason }
    }
}
