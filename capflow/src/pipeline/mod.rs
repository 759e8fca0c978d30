//! Planning and execution of capability pipelines.
//!
//! This module provides:
//! - The stage planner (pure request-to-plan derivation)
//! - The sequential executor with abort-on-failure
//! - The offline fallback controller and its reply cache
//! - The orchestrator handling validation, cancellation and supersession

mod cache;
mod executor;
mod fallback;
mod orchestrator;
mod planner;

pub use cache::{cache_key, normalize_prompt, CachedReply, ResponseCache};
pub use executor::{PipelineExecutor, CAPABILITY_UNAVAILABLE};
pub use fallback::{
    CachedReplySource, FailureContext, FallbackReply, FallbackSource, OfflineFallbackController,
    PartialResultSource, TemplateSource, DEFAULT_APOLOGY, EXCERPT_CHARS,
};
pub use orchestrator::{Orchestrator, RunHandle, SUPERSEDED};
pub use planner::{StagePlan, StagePlanner};
