//! Testing utilities for capflow pipelines.
//!
//! This module provides:
//! - Fake capability providers
//! - Request fixtures and a scripted registry harness
//! - Assertions for outcomes, plans and progress streams

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_completed, assert_degraded, assert_gapless, assert_not_degraded, assert_plan,
    stages_with,
};
pub use fixtures::{
    bemba_request, document_request, full_english_request, plain_english_request, TestFixture,
    EXTRACTED_TEXT, GENERATED_TEXT, LOCALIZED_TEXT, PIVOT_TEXT, RECOMMENDATION, SUMMARY_TEXT,
};
pub use mocks::{FailingProvider, PanickingProvider, ScriptedProvider, SlowProvider};
