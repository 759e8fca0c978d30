//! Stage outcome type with factory methods.

use super::{Language, StageId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The payload of a successful stage.
///
/// Carrier stages set `text`; the recommendation stage fills
/// `recommendations`. Anything else a provider wants to report goes into
/// `metadata` and is kept verbatim in the run's stage output record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StagePayload {
    /// Text produced by the stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Language of `text`, when the stage knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,

    /// Recommendation strings, in the order produced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,

    /// Additional provider metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl StagePayload {
    /// Creates an empty payload.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a payload carrying text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Creates a payload carrying recommendations.
    #[must_use]
    pub fn recommendations(items: Vec<String>) -> Self {
        Self {
            recommendations: items,
            ..Self::default()
        }
    }

    /// Sets the language of the payload text.
    #[must_use]
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Adds a single metadata entry.
    #[must_use]
    pub fn add_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// The result of one stage execution.
///
/// A stage either succeeds with a payload or fails with a reason; the enum
/// makes "both" unrepresentable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    /// The stage completed.
    Success(StagePayload),
    /// The stage declined or could not complete.
    Failure {
        /// Human-readable reason.
        reason: String,
        /// The stage that failed.
        stage: StageId,
    },
}

impl StageOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn success(payload: StagePayload) -> Self {
        Self::Success(payload)
    }

    /// Creates a successful outcome carrying text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Success(StagePayload::text(text))
    }

    /// Creates a failure outcome.
    #[must_use]
    pub fn failure(stage: StageId, reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
            stage,
        }
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true if the stage failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Returns the payload if the stage succeeded.
    #[must_use]
    pub fn payload(&self) -> Option<&StagePayload> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the failure reason, if any.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure { reason, .. } => Some(reason),
        }
    }

    /// Re-attributes a failure to the stage that actually ran.
    ///
    /// Providers serve several stages (both translation legs share one), so
    /// the executor stamps the failing stage itself.
    #[must_use]
    pub fn attributed_to(self, stage: StageId) -> Self {
        match self {
            Self::Failure { reason, .. } => Self::Failure { reason, stage },
            success @ Self::Success(_) => success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_factory() {
        let outcome = StageOutcome::text("hello");
        assert!(outcome.is_success());
        assert_eq!(outcome.payload().unwrap().text.as_deref(), Some("hello"));
        assert!(outcome.failure_reason().is_none());
    }

    #[test]
    fn test_failure_factory() {
        let outcome = StageOutcome::failure(StageId::Generate, "provider unreachable");
        assert!(outcome.is_failure());
        assert!(outcome.payload().is_none());
        assert_eq!(outcome.failure_reason(), Some("provider unreachable"));
    }

    #[test]
    fn test_attributed_to_rewrites_failures_only() {
        let failed = StageOutcome::failure(StageId::TranslateToPivot, "no glossary")
            .attributed_to(StageId::TranslateFromPivot);
        assert_eq!(
            failed,
            StageOutcome::failure(StageId::TranslateFromPivot, "no glossary")
        );

        let ok = StageOutcome::text("x").attributed_to(StageId::Summarize);
        assert!(ok.is_success());
    }

    #[test]
    fn test_payload_builders() {
        let payload = StagePayload::text("Muli shani")
            .with_language(Language::Bemba)
            .add_metadata("glossary_hits", serde_json::json!(2));

        assert_eq!(payload.language, Some(Language::Bemba));
        assert_eq!(payload.metadata.get("glossary_hits"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn test_outcome_serialization_is_tagged() {
        let json = serde_json::to_value(StageOutcome::failure(StageId::Recommend, "busy")).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["stage"], "recommend");
    }
}
