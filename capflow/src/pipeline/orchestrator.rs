//! Entry point tying planning, execution and fallback together.

use super::cache::ResponseCache;
use super::executor::PipelineExecutor;
use super::planner::{StagePlan, StagePlanner};
use crate::cancellation::CancellationToken;
use crate::config::PipelineConfig;
use crate::core::{PipelineRequest, RunOutcome};
use crate::errors::CapflowError;
use crate::events::ObserverRegistry;
use crate::providers::local::local_registry;
use crate::registry::CapabilityRegistry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Cancellation reason used when a newer request replaces a run.
pub const SUPERSEDED: &str = "superseded";

#[derive(Debug)]
struct SessionSlot {
    generation: u64,
    token: Arc<CancellationToken>,
}

/// Handle to a run executing on the tokio runtime.
#[derive(Debug)]
pub struct RunHandle {
    run_id: Uuid,
    token: Arc<CancellationToken>,
    join: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Requests cancellation. The run stops before its next stage, or
    /// abandons the in-flight provider call.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.token.cancel(reason);
    }

    /// Returns true if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for the run to finish.
    pub async fn outcome(self) -> RunOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(run_id = %self.run_id, error = %e, "Run task did not complete");
                RunOutcome::Cancelled {
                    reason: if e.is_cancelled() {
                        "aborted".to_string()
                    } else {
                        "run task panicked".to_string()
                    },
                }
            }
        }
    }
}

/// Accepts requests and produces exactly one result per run.
///
/// Runs are independent: they share only the registries and the reply
/// cache, and each takes its own capability snapshot and observer list
/// when it starts.
pub struct Orchestrator {
    config: PipelineConfig,
    registry: Arc<CapabilityRegistry>,
    observers: Arc<ObserverRegistry>,
    planner: StagePlanner,
    executor: PipelineExecutor,
    cache: Arc<ResponseCache>,
    sessions: DashMap<String, SessionSlot>,
    generation: AtomicU64,
}

impl Orchestrator {
    /// Creates an orchestrator over a shared registry.
    pub fn new(config: PipelineConfig, registry: Arc<CapabilityRegistry>) -> Result<Self, CapflowError> {
        config.validate()?;
        let cache = Arc::new(ResponseCache::new(config.cache_capacity));
        Ok(Self {
            planner: StagePlanner::new(config.pivot_language),
            executor: PipelineExecutor::from_config(&config, Arc::clone(&cache)),
            config,
            registry,
            observers: Arc::new(ObserverRegistry::new()),
            cache,
            sessions: DashMap::new(),
            generation: AtomicU64::new(0),
        })
    }

    /// Creates an orchestrator backed by the built-in local providers.
    pub fn local(config: PipelineConfig) -> Result<Self, CapflowError> {
        let registry = Arc::new(local_registry(config.bandwidth));
        Self::new(config, registry)
    }

    /// Shares an existing observer registry.
    #[must_use]
    pub fn with_observers(mut self, observers: Arc<ObserverRegistry>) -> Self {
        self.observers = observers;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the capability registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Returns the observer registry.
    #[must_use]
    pub fn observers(&self) -> &Arc<ObserverRegistry> {
        &self.observers
    }

    /// Returns the reply cache used by the offline fallback.
    #[must_use]
    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Returns the number of sessions with a run in flight.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Validates a request and returns the plan it would run with now.
    pub fn plan(&self, request: &PipelineRequest) -> Result<StagePlan, CapflowError> {
        request.validate()?;
        let snapshot = self.registry.snapshot(request.enabled());
        Ok(self.planner.plan(request, &snapshot))
    }

    /// Runs a request to completion on the current task.
    pub async fn run(&self, request: PipelineRequest) -> Result<RunOutcome, CapflowError> {
        self.run_with_cancel(request, Arc::new(CancellationToken::new()))
            .await
    }

    /// Runs a request on the current task, observing an external token.
    pub async fn run_with_cancel(
        &self,
        request: PipelineRequest,
        cancel: Arc<CancellationToken>,
    ) -> Result<RunOutcome, CapflowError> {
        request.validate()?;
        let run_id = crate::utils::generate_run_id();
        Ok(self.execute_validated(run_id, request, &cancel).await)
    }

    /// Spawns a run and returns a handle to it.
    pub fn spawn(self: &Arc<Self>, request: PipelineRequest) -> Result<RunHandle, CapflowError> {
        request.validate()?;
        let run_id = crate::utils::generate_run_id();
        let token = Arc::new(CancellationToken::new());

        let this = Arc::clone(self);
        let run_token = Arc::clone(&token);
        let join = tokio::spawn(async move { this.execute_validated(run_id, request, &run_token).await });

        Ok(RunHandle { run_id, token, join })
    }

    /// Spawns a run that supersedes any in-flight run of the same session.
    ///
    /// The earlier run is cancelled with reason `"superseded"`; if it still
    /// finishes, its result is discarded.
    pub fn submit_in_session(
        self: &Arc<Self>,
        session: impl Into<String>,
        request: PipelineRequest,
    ) -> Result<RunHandle, CapflowError> {
        request.validate()?;
        let session = session.into();
        let run_id = crate::utils::generate_run_id();
        let token = Arc::new(CancellationToken::new());
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);

        let slot = SessionSlot {
            generation,
            token: Arc::clone(&token),
        };
        if let Some(previous) = self.sessions.insert(session.clone(), slot) {
            debug!(session = %session, "Superseding in-flight run");
            previous.token.cancel(SUPERSEDED);
        }

        let this = Arc::clone(self);
        let run_token = Arc::clone(&token);
        let join = tokio::spawn(async move {
            let outcome = this.execute_validated(run_id, request, &run_token).await;
            this.sessions
                .remove_if(&session, |_, slot| slot.generation == generation);

            if run_token.is_cancelled() && !outcome.is_cancelled() {
                debug!(
                    run_id = %run_id,
                    session = %session,
                    "Discarding outcome of a run superseded while finishing"
                );
                return RunOutcome::Cancelled {
                    reason: run_token.reason().unwrap_or_else(|| SUPERSEDED.to_string()),
                };
            }
            outcome
        });

        Ok(RunHandle { run_id, token, join })
    }

    async fn execute_validated(
        &self,
        run_id: Uuid,
        request: PipelineRequest,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let snapshot = self.registry.snapshot(request.enabled());
        let plan = self.planner.plan(&request, &snapshot);
        let mut reporter = self.observers.reporter(run_id);

        let span = info_span!(
            "capflow.run",
            run_id = %run_id,
            source = %request.source_language(),
            display = %request.display_language(),
        );

        async {
            info!(plan = %plan, "Run started");
            self.executor
                .execute(&plan, &request, &snapshot, &mut reporter, cancel)
                .await
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("pivot", &self.config.pivot_language)
            .field("registered", &self.registry.registered())
            .field("observers", &self.observers.len())
            .field("active_sessions", &self.sessions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CapabilityId, Language, StageId};
    use crate::errors::InvalidRequestError;
    use crate::events::CollectingObserver;
    use pretty_assertions::assert_eq;

    fn orchestrator() -> Orchestrator {
        Orchestrator::local(PipelineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_request_is_rejected() {
        let observer = Arc::new(CollectingObserver::new());
        let orchestrator = orchestrator();
        orchestrator.observers().register(observer.clone());

        let err = orchestrator
            .run(PipelineRequest::new("   ", Language::English))
            .await
            .unwrap_err();

        assert!(matches!(err, CapflowError::InvalidRequest(InvalidRequestError::EmptyRequest)));
        assert!(observer.is_empty());
    }

    #[tokio::test]
    async fn test_local_run_completes() {
        let orchestrator = orchestrator();
        let outcome = orchestrator
            .run(PipelineRequest::new("Explain photosynthesis", Language::English))
            .await
            .unwrap()
            .into_outcome()
            .unwrap();

        assert!(!outcome.is_degraded());
        assert!(!outcome.text().is_empty());
    }

    #[test]
    fn test_plan_preview() {
        let orchestrator = orchestrator();
        let plan = orchestrator
            .plan(&PipelineRequest::new("Lesa", Language::Bemba).enable(CapabilityId::Recommend))
            .unwrap();

        assert_eq!(
            plan.stages(),
            &[
                StageId::TranslateToPivot,
                StageId::Generate,
                StageId::Recommend,
                StageId::TranslateFromPivot,
            ]
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = PipelineConfig::default().with_apology_text("");
        assert!(matches!(
            Orchestrator::local(config),
            Err(CapflowError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_spawned_run_handle() {
        let orchestrator = Arc::new(orchestrator());
        let handle = orchestrator
            .spawn(PipelineRequest::new("Why is the sky blue?", Language::English))
            .unwrap();

        assert!(!handle.is_cancelled());
        let outcome = handle.outcome().await;
        assert!(!outcome.is_cancelled());
    }

    #[tokio::test]
    async fn test_session_slot_released_after_run() {
        let orchestrator = Arc::new(orchestrator());
        let handle = orchestrator
            .submit_in_session("chat-1", PipelineRequest::new("Hello", Language::English))
            .unwrap();

        let _ = handle.outcome().await;
        assert_eq!(orchestrator.active_sessions(), 0);
    }
}
