//! # Capflow
//!
//! Multi-stage AI capability orchestration with a guaranteed degraded mode.
//!
//! A single request (text, optional attachments, languages and a set of
//! enabled capabilities) is routed through an ordered sequence of
//! independently failable stages:
//!
//! - **Extraction** of text from attachments
//! - **Translation** into a pivot language and back into the display language
//! - **Generation** of the response, the one stage every plan contains
//! - **Recommendation** of follow-ups
//! - **Summarization** sized for the available bandwidth
//!
//! When any stage fails the run does not error: an offline fallback builds
//! a degraded response from what is already known.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use capflow::prelude::*;
//!
//! # async fn demo() -> Result<(), CapflowError> {
//! let orchestrator = Orchestrator::local(PipelineConfig::default())?;
//!
//! let request = PipelineRequest::new("Lesa mwamupampila", Language::Bemba)
//!     .enable(CapabilityId::Recommend);
//!
//! if let Some(outcome) = orchestrator.run(request).await?.into_outcome() {
//!     println!("{} ({})", outcome.text(), outcome.language());
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod providers;
pub mod registry;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{BandwidthTier, PipelineConfig};
    pub use crate::context::{PipelineContext, StageOutputs};
    pub use crate::core::{
        Attachment, CapabilityId, Language, MediaKind, OutcomeMetadata, PipelineOutcome,
        PipelineRequest, ProgressEvent, RunOutcome, StageId, StageOutcome, StagePayload,
        StageTransition,
    };
    pub use crate::errors::{
        CapflowError, ConfigError, InvalidRequestError, OutputConflictError, UnknownLanguageError,
    };
    pub use crate::events::{
        ChannelObserver, CollectingObserver, LoggingObserver, ObserverId, ObserverRegistry,
        ProgressObserver, ProgressReporter,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{
        OfflineFallbackController, Orchestrator, PipelineExecutor, ResponseCache, RunHandle,
        StagePlan, StagePlanner,
    };
    pub use crate::providers::{CapabilityProvider, FnProvider, ProviderInput};
    pub use crate::registry::{CapabilityRegistry, CapabilitySnapshot, Resolution};
    pub use crate::utils::{generate_run_id, generate_uuid, iso_timestamp, Timestamp};
}
