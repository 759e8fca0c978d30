//! Pipeline configuration.
//!
//! Every field has a serde default, so a partial JSON document (or none at
//! all) yields a usable configuration. Environment variables can override
//! the handful of settings operators change per deployment.

use crate::core::Language;
use crate::errors::{CapflowError, ConfigError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable overriding the pivot language.
pub const ENV_PIVOT: &str = "CAPFLOW_PIVOT";
/// Environment variable overriding the per-stage timeout in milliseconds.
pub const ENV_STAGE_TIMEOUT_MS: &str = "CAPFLOW_STAGE_TIMEOUT_MS";
/// Environment variable overriding the bandwidth tier.
pub const ENV_BANDWIDTH: &str = "CAPFLOW_BANDWIDTH";

/// Placeholder replaced by an excerpt of the working text in offline templates.
pub const EXCERPT_PLACEHOLDER: &str = "{excerpt}";

/// Connection quality the summarizer sizes its output for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandwidthTier {
    /// 2G-class links and metered data.
    Low,
    /// Typical mobile data.
    Standard,
    /// Broadband.
    High,
}

impl BandwidthTier {
    /// Maximum characters a summary may contain on this tier.
    #[must_use]
    pub const fn summary_char_budget(self) -> usize {
        match self {
            Self::Low => 280,
            Self::Standard => 800,
            Self::High => 2000,
        }
    }
}

impl Default for BandwidthTier {
    fn default() -> Self {
        Self::Standard
    }
}

impl FromStr for BandwidthTier {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "standard" => Ok(Self::Standard),
            "high" => Ok(Self::High),
            other => Err(ConfigError::new(
                "bandwidth",
                format!("unknown tier '{other}', expected low, standard or high"),
            )),
        }
    }
}

/// Configuration for the orchestration pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// The language generation providers understand.
    #[serde(default)]
    pub pivot_language: Language,
    /// Upper bound on a single provider call. `None` disables the bound.
    #[serde(default = "default_stage_timeout_ms")]
    pub stage_timeout_ms: Option<u64>,
    /// Bandwidth tier used by the summarization stage.
    #[serde(default)]
    pub bandwidth: BandwidthTier,
    /// Maximum number of replies kept for offline fallback.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Last-resort reply when no fallback source produces content.
    #[serde(default = "default_apology_text")]
    pub apology_text: String,
    /// Offline reply templates per language, with an `{excerpt}` placeholder.
    #[serde(default = "default_offline_templates")]
    pub offline_templates: HashMap<Language, String>,
}

#[allow(clippy::unnecessary_wraps)]
fn default_stage_timeout_ms() -> Option<u64> {
    Some(30_000)
}

fn default_cache_capacity() -> usize {
    256
}

fn default_apology_text() -> String {
    "Sorry, I can't answer right now. Please try again in a moment.".to_string()
}

fn default_offline_templates() -> HashMap<Language, String> {
    let mut templates = HashMap::new();
    templates.insert(
        Language::English,
        "You appear to be offline, so I can't give a full answer yet. \
         I saved your question: \"{excerpt}\". Please try again when your connection improves."
            .to_string(),
    );
    templates
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pivot_language: Language::default(),
            stage_timeout_ms: default_stage_timeout_ms(),
            bandwidth: BandwidthTier::default(),
            cache_capacity: default_cache_capacity(),
            apology_text: default_apology_text(),
            offline_templates: default_offline_templates(),
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, CapflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CapflowError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Applies `CAPFLOW_*` environment variable overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_PIVOT) {
            self.pivot_language = raw
                .parse()
                .map_err(|e: crate::errors::UnknownLanguageError| {
                    ConfigError::new("pivot_language", e.to_string())
                })?;
        }
        if let Some(raw) = lookup(ENV_STAGE_TIMEOUT_MS) {
            self.stage_timeout_ms = match raw.trim() {
                "" | "none" | "off" => None,
                value => Some(value.parse().map_err(|_| {
                    ConfigError::new("stage_timeout_ms", format!("not a number: '{value}'"))
                })?),
            };
        }
        if let Some(raw) = lookup(ENV_BANDWIDTH) {
            self.bandwidth = raw.parse()?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stage_timeout_ms == Some(0) {
            return Err(ConfigError::new("stage_timeout_ms", "must be positive"));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::new("cache_capacity", "must be positive"));
        }
        if self.apology_text.trim().is_empty() {
            return Err(ConfigError::new("apology_text", "must not be empty"));
        }
        Ok(())
    }

    /// Sets the pivot language.
    #[must_use]
    pub fn with_pivot_language(mut self, language: Language) -> Self {
        self.pivot_language = language;
        self
    }

    /// Sets the per-stage timeout.
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout_ms = timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the bandwidth tier.
    #[must_use]
    pub fn with_bandwidth(mut self, tier: BandwidthTier) -> Self {
        self.bandwidth = tier;
        self
    }

    /// Sets the fallback cache capacity.
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Sets the last-resort apology text.
    #[must_use]
    pub fn with_apology_text(mut self, text: impl Into<String>) -> Self {
        self.apology_text = text.into();
        self
    }

    /// Adds or replaces an offline template.
    #[must_use]
    pub fn with_offline_template(mut self, language: Language, template: impl Into<String>) -> Self {
        self.offline_templates.insert(language, template.into());
        self
    }

    /// Returns the stage timeout as a duration.
    #[must_use]
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_ms.map(Duration::from_millis)
    }
}
