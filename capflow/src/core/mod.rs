//! Core domain model types for capflow.
//!
//! This module contains the fundamental types used throughout the pipeline:
//! - Language, capability and stage identifiers
//! - The request and the composed outcome
//! - Stage outcomes and progress events

mod event;
mod language;
mod outcome;
mod output;
mod request;
mod status;

pub use event::ProgressEvent;
pub use language::Language;
pub use outcome::{OutcomeMetadata, PipelineOutcome, RunOutcome};
pub use output::{StageOutcome, StagePayload};
pub use request::{Attachment, AttachmentSource, MediaKind, PipelineRequest};
pub use status::{CapabilityId, StageId, StageTransition};
