//! Per-run context management.
//!
//! This module provides:
//! - The mutable pipeline context owned by one executor run
//! - An insertion-ordered bag of raw stage outputs

mod bags;
mod execution;

pub use bags::StageOutputs;
pub use execution::PipelineContext;
