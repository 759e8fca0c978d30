//! Capability and stage identifiers, and stage transition kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named, independently toggleable unit of AI-assisted processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityId {
    /// Text extraction from attachments.
    ExtractText,
    /// Translation between a user language and the pivot language.
    Translate,
    /// Content generation.
    Generate,
    /// Follow-up recommendations.
    Recommend,
    /// Bandwidth-aware summarization.
    Summarize,
}

impl CapabilityId {
    /// Every capability, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::ExtractText,
        Self::Translate,
        Self::Generate,
        Self::Recommend,
        Self::Summarize,
    ];

    /// Returns the identifier string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExtractText => "extract-text",
            Self::Translate => "translate",
            Self::Generate => "generate",
            Self::Recommend => "recommend",
            Self::Summarize => "summarize",
        }
    }

    /// Returns true for capabilities gated by the request's toggles.
    ///
    /// Generation and translation are core: they are always in a snapshot
    /// when a provider is registered, because every request generates and
    /// the language legs follow from the request's languages alone.
    #[must_use]
    pub const fn is_optional(self) -> bool {
        matches!(self, Self::ExtractText | Self::Recommend | Self::Summarize)
    }

    /// Looks up a capability by identifier.
    ///
    /// Unknown identifiers yield `None`; callers treat them as unavailable.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cap| cap.as_str() == id)
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of an executed plan.
///
/// Each stage is bound to exactly one capability; the two translation legs
/// share the `translate` capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageId {
    /// Pull text out of attachments and append it to the working text.
    Extract,
    /// Translate the working text from the source language into the pivot.
    TranslateToPivot,
    /// Generate the response. The only non-optional stage.
    Generate,
    /// Produce follow-up recommendations.
    Recommend,
    /// Shorten the current response for constrained bandwidth.
    Summarize,
    /// Translate the current response into the display language.
    TranslateFromPivot,
}

impl StageId {
    /// Returns the stage identifier string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::TranslateToPivot => "translate-to-pivot",
            Self::Generate => "generate",
            Self::Recommend => "recommend",
            Self::Summarize => "summarize",
            Self::TranslateFromPivot => "translate-from-pivot",
        }
    }

    /// Returns the capability this stage invokes.
    #[must_use]
    pub const fn capability(self) -> CapabilityId {
        match self {
            Self::Extract => CapabilityId::ExtractText,
            Self::TranslateToPivot | Self::TranslateFromPivot => CapabilityId::Translate,
            Self::Generate => CapabilityId::Generate,
            Self::Recommend => CapabilityId::Recommend,
            Self::Summarize => CapabilityId::Summarize,
        }
    }

    /// Returns true if a successful run of this stage changes the working
    /// text. Non-carrier stages are only recorded under their key.
    #[must_use]
    pub const fn is_text_carrier(self) -> bool {
        !matches!(self, Self::Recommend)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of stage transition reported to progress observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageTransition {
    /// The stage was handed to its provider.
    Started,
    /// The provider returned a success payload.
    Succeeded,
    /// The provider failed, or could not be resolved.
    Failed,
}

impl StageTransition {
    /// Returns true if the transition ends the stage.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for StageTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
