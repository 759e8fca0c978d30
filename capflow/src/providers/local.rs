//! Local providers that need no remote backend.
//!
//! They give every capability a working default so a deployment without any
//! AI vendor still answers, and they double as realistic fakes in tests.

use super::{CapabilityProvider, ProviderInput};
use crate::config::BandwidthTier;
use crate::core::{
    AttachmentSource, CapabilityId, Language, MediaKind, StageOutcome, StagePayload,
};
use crate::registry::CapabilityRegistry;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use regex::Regex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Extracts text from attachments.
///
/// Inline documents are decoded as UTF-8 text. Images and by-reference
/// documents cannot be read locally and are represented by a short marker so
/// generation still knows they were attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineTextExtractor;

#[async_trait]
impl CapabilityProvider for InlineTextExtractor {
    fn capability(&self) -> CapabilityId {
        CapabilityId::ExtractText
    }

    async fn invoke(&self, input: &ProviderInput) -> StageOutcome {
        if input.attachments.is_empty() {
            return StageOutcome::failure(input.stage, "no attachments to extract");
        }

        let mut sections = Vec::with_capacity(input.attachments.len());
        for attachment in &input.attachments {
            match (&attachment.kind, &attachment.source) {
                (MediaKind::Document, AttachmentSource::Inline { data }) => {
                    let bytes = match STANDARD.decode(data) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            return StageOutcome::failure(
                                input.stage,
                                format!("cannot decode '{}': {e}", attachment.name),
                            )
                        }
                    };
                    let text = String::from_utf8_lossy(&bytes).trim().to_string();
                    if text.is_empty() {
                        return StageOutcome::failure(
                            input.stage,
                            format!("'{}' contains no text", attachment.name),
                        );
                    }
                    sections.push(text);
                }
                (MediaKind::Document, AttachmentSource::Uri { uri }) => {
                    sections.push(format!("[document: {} at {uri}]", attachment.name));
                }
                (MediaKind::Image, _) => {
                    sections.push(format!("[image: {}]", attachment.name));
                }
            }
        }

        StageOutcome::success(
            StagePayload::text(sections.join("\n\n"))
                .add_metadata("attachments", json!(input.attachments.len())),
        )
    }
}

/// Phrase-glossary translator.
///
/// Replaces known phrases case-insensitively, longest phrase first. Text
/// without glossary matches passes through unchanged but is relabelled with
/// the target language, which is how a low-resource deployment behaves when
/// it has no model for a pair.
#[derive(Debug, Clone, Default)]
pub struct GlossaryTranslator {
    entries: HashMap<(Language, Language), Vec<(String, String)>>,
}

impl GlossaryTranslator {
    /// Creates a translator with an empty glossary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a one-directional phrase mapping.
    #[must_use]
    pub fn with_phrase(
        mut self,
        from: Language,
        to: Language,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        let phrases = self.entries.entry((from, to)).or_default();
        phrases.push((source.into(), target.into()));
        phrases.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        self
    }

    /// Adds a phrase mapping in both directions.
    #[must_use]
    pub fn with_pair(
        self,
        a: Language,
        b: Language,
        a_text: impl Into<String>,
        b_text: impl Into<String>,
    ) -> Self {
        let a_text = a_text.into();
        let b_text = b_text.into();
        self.with_phrase(a, b, a_text.clone(), b_text.clone())
            .with_phrase(b, a, b_text, a_text)
    }

    fn translate(&self, text: &str, from: Language, to: Language) -> (String, usize) {
        let Some(phrases) = self.entries.get(&(from, to)) else {
            return (text.to_string(), 0);
        };

        let mut out = text.to_string();
        let mut hits = 0;
        for (source, target) in phrases {
            let Ok(pattern) = Regex::new(&format!("(?i){}", regex::escape(source))) else {
                continue;
            };
            let found = pattern.find_iter(&out).count();
            if found > 0 {
                hits += found;
                out = pattern.replace_all(&out, regex::NoExpand(target)).into_owned();
            }
        }
        (out, hits)
    }
}

#[async_trait]
impl CapabilityProvider for GlossaryTranslator {
    fn capability(&self) -> CapabilityId {
        CapabilityId::Translate
    }

    async fn invoke(&self, input: &ProviderInput) -> StageOutcome {
        let (from, to) = (input.text_language, input.target_language);
        let (text, hits) = if from == to {
            (input.text.clone(), 0)
        } else {
            self.translate(&input.text, from, to)
        };

        StageOutcome::success(
            StagePayload::text(text)
                .with_language(to)
                .add_metadata("from", json!(from))
                .add_metadata("glossary_hits", json!(hits)),
        )
    }
}

/// Placeholder replaced by the prompt in generator templates.
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// Template-based generator.
#[derive(Debug, Clone)]
pub struct TemplateGenerator {
    template: String,
}

impl Default for TemplateGenerator {
    fn default() -> Self {
        Self::new("Here is what I can tell you about \"{prompt}\".")
    }
}

impl TemplateGenerator {
    /// Creates a generator from a template containing `{prompt}`.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

#[async_trait]
impl CapabilityProvider for TemplateGenerator {
    fn capability(&self) -> CapabilityId {
        CapabilityId::Generate
    }

    async fn invoke(&self, input: &ProviderInput) -> StageOutcome {
        let prompt = input.text.trim();
        if prompt.is_empty() {
            return StageOutcome::failure(input.stage, "nothing to answer");
        }
        StageOutcome::success(
            StagePayload::text(self.template.replace(PROMPT_PLACEHOLDER, prompt))
                .with_language(input.text_language),
        )
    }
}

fn keyword_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    PATTERN.get_or_init(|| Regex::new(r"\p{L}{5,}").expect("keyword pattern is valid"))
}

const STOPWORDS: &[&str] = &[
    "about", "after", "again", "being", "could", "every", "first", "there", "their", "these",
    "thing", "those", "through", "under", "where", "which", "while", "would", "should", "other",
    "shall", "still", "since", "answer", "question",
];

/// Suggests follow-up topics from the most frequent keywords.
#[derive(Debug, Clone)]
pub struct KeywordRecommender {
    max_items: usize,
}

impl Default for KeywordRecommender {
    fn default() -> Self {
        Self { max_items: 3 }
    }
}

impl KeywordRecommender {
    /// Creates a recommender producing at most `max_items` suggestions.
    #[must_use]
    pub fn new(max_items: usize) -> Self {
        Self { max_items }
    }

    fn keywords(&self, text: &str) -> Vec<String> {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        for (position, m) in keyword_pattern().find_iter(text).enumerate() {
            let word = m.as_str().to_lowercase();
            if STOPWORDS.contains(&word.as_str()) {
                continue;
            }
            counts.entry(word).or_insert((0, position)).0 += 1;
        }

        let mut ranked: Vec<_> = counts.into_iter().collect();
        ranked.sort_by(|(_, (ca, pa)), (_, (cb, pb))| cb.cmp(ca).then(pa.cmp(pb)));
        ranked
            .into_iter()
            .take(self.max_items)
            .map(|(word, _)| word)
            .collect()
    }
}

#[async_trait]
impl CapabilityProvider for KeywordRecommender {
    fn capability(&self) -> CapabilityId {
        CapabilityId::Recommend
    }

    async fn invoke(&self, input: &ProviderInput) -> StageOutcome {
        let items = self
            .keywords(&input.text)
            .into_iter()
            .map(|word| format!("Learn more about {word}"))
            .collect();
        StageOutcome::success(StagePayload::recommendations(items))
    }
}

/// Shortens text to a character budget, preferring sentence boundaries.
#[derive(Debug, Clone)]
pub struct BandwidthSummarizer {
    default_budget: usize,
}

impl Default for BandwidthSummarizer {
    fn default() -> Self {
        Self::for_tier(BandwidthTier::default())
    }
}

impl BandwidthSummarizer {
    /// Creates a summarizer sized for a bandwidth tier.
    #[must_use]
    pub fn for_tier(tier: BandwidthTier) -> Self {
        Self {
            default_budget: tier.summary_char_budget(),
        }
    }

    fn summarize(text: &str, budget: usize) -> String {
        if text.chars().count() <= budget {
            return text.to_string();
        }
        let head: String = text.chars().take(budget).collect();
        if budget < 2 {
            // No room for an ellipsis.
            return head;
        }

        let sentence_end = head
            .char_indices()
            .filter(|(i, c)| {
                matches!(c, '.' | '!' | '?')
                    && head[i + c.len_utf8()..].starts_with(char::is_whitespace)
            })
            .map(|(i, c)| i + c.len_utf8())
            .last();
        if let Some(end) = sentence_end.filter(|end| *end >= head.len() / 3) {
            return head[..end].to_string();
        }

        let head: String = text.chars().take(budget - 1).collect();
        let cut = head.rfind(char::is_whitespace).unwrap_or(head.len());
        format!("{}…", head[..cut].trim_end())
    }
}

#[async_trait]
impl CapabilityProvider for BandwidthSummarizer {
    fn capability(&self) -> CapabilityId {
        CapabilityId::Summarize
    }

    async fn invoke(&self, input: &ProviderInput) -> StageOutcome {
        let budget = input.char_budget.unwrap_or(self.default_budget);
        let summary = Self::summarize(&input.text, budget);
        let original_chars = input.text.chars().count();
        let summary_chars = summary.chars().count();

        StageOutcome::success(
            StagePayload::text(summary)
                .add_metadata("original_chars", json!(original_chars))
                .add_metadata("summary_chars", json!(summary_chars)),
        )
    }
}

/// Builds a registry with every local provider registered.
#[must_use]
pub fn local_registry(tier: BandwidthTier) -> CapabilityRegistry {
    let registry = CapabilityRegistry::new();
    registry.register(CapabilityId::ExtractText, Arc::new(InlineTextExtractor));
    registry.register(CapabilityId::Translate, Arc::new(GlossaryTranslator::new()));
    registry.register(CapabilityId::Generate, Arc::new(TemplateGenerator::default()));
    registry.register(CapabilityId::Recommend, Arc::new(KeywordRecommender::default()));
    registry.register(CapabilityId::Summarize, Arc::new(BandwidthSummarizer::for_tier(tier)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Attachment, StageId};
    use pretty_assertions::assert_eq;

    fn text_of(outcome: &StageOutcome) -> &str {
        outcome.payload().and_then(|p| p.text.as_deref()).unwrap()
    }

    #[tokio::test]
    async fn test_extractor_decodes_inline_documents() {
        let input = ProviderInput::new(StageId::Extract, "", Language::English).with_attachments(vec![
            Attachment::inline("notes.txt", MediaKind::Document, b"Chlorophyll absorbs light."),
            Attachment::image("leaf.png", "file:///leaf.png"),
        ]);

        let outcome = InlineTextExtractor.invoke(&input).await;
        assert_eq!(text_of(&outcome), "Chlorophyll absorbs light.\n\n[image: leaf.png]");
    }

    #[tokio::test]
    async fn test_extractor_fails_without_attachments() {
        let input = ProviderInput::new(StageId::Extract, "hi", Language::English);
        let outcome = InlineTextExtractor.invoke(&input).await;
        assert_eq!(outcome.failure_reason(), Some("no attachments to extract"));
    }

    #[tokio::test]
    async fn test_translator_applies_longest_phrase_first() {
        let translator = GlossaryTranslator::new()
            .with_phrase(Language::Bemba, Language::English, "muli", "are you")
            .with_phrase(Language::Bemba, Language::English, "muli shani", "how are you");

        let input = ProviderInput::new(StageId::TranslateToPivot, "Muli shani?", Language::Bemba)
            .with_target_language(Language::English);
        let outcome = translator.invoke(&input).await;
        let payload = outcome.payload().unwrap();

        assert_eq!(payload.text.as_deref(), Some("how are you?"));
        assert_eq!(payload.language, Some(Language::English));
        assert_eq!(payload.metadata["glossary_hits"], json!(1));
    }

    #[tokio::test]
    async fn test_translator_passes_unknown_text_through() {
        let translator = GlossaryTranslator::new();
        let input = ProviderInput::new(StageId::TranslateFromPivot, "Good morning", Language::English)
            .with_target_language(Language::Lozi);
        let outcome = translator.invoke(&input).await;

        assert_eq!(text_of(&outcome), "Good morning");
        assert_eq!(outcome.payload().unwrap().language, Some(Language::Lozi));
    }

    #[test]
    fn test_translator_pair_is_bidirectional() {
        let translator = GlossaryTranslator::new().with_pair(
            Language::English,
            Language::Nyanja,
            "thank you",
            "zikomo",
        );
        assert_eq!(
            translator.translate("Zikomo!", Language::Nyanja, Language::English).0,
            "thank you!"
        );
        assert_eq!(
            translator.translate("Thank you", Language::English, Language::Nyanja).0,
            "zikomo"
        );
    }

    #[tokio::test]
    async fn test_generator_fills_template() {
        let generator = TemplateGenerator::new("A: {prompt}");
        let input = ProviderInput::new(StageId::Generate, "  Explain photosynthesis ", Language::English);
        assert_eq!(text_of(&generator.invoke(&input).await), "A: Explain photosynthesis");

        let empty = ProviderInput::new(StageId::Generate, "   ", Language::English);
        assert!(generator.invoke(&empty).await.is_failure());
    }

    #[test]
    fn test_recommender_ranks_by_frequency_then_position() {
        let recommender = KeywordRecommender::new(2);
        let words = recommender.keywords("Plants need sunlight. Sunlight powers plants and water helps plants.");
        assert_eq!(words, vec!["plants".to_string(), "sunlight".to_string()]);
    }

    #[tokio::test]
    async fn test_recommender_may_return_nothing() {
        let input = ProviderInput::new(StageId::Recommend, "ok", Language::English);
        let outcome = KeywordRecommender::default().invoke(&input).await;
        assert!(outcome.payload().unwrap().recommendations.is_empty());
    }

    #[test]
    fn test_summarizer_prefers_sentence_boundary() {
        let text = "Photosynthesis makes sugar. It needs light and water. Oxygen is released as a by-product.";
        let summary = BandwidthSummarizer::summarize(text, 60);
        assert_eq!(summary, "Photosynthesis makes sugar. It needs light and water.");
    }

    #[test]
    fn test_summarizer_falls_back_to_word_boundary() {
        let summary = BandwidthSummarizer::summarize("alpha beta gamma delta epsilon", 14);
        assert_eq!(summary, "alpha beta…");
        assert!(summary.chars().count() <= 14);
    }

    #[test]
    fn test_summarizer_never_exceeds_tiny_budgets() {
        let text = "Photosynthesis makes sugar.";
        for budget in 0..4 {
            let summary = BandwidthSummarizer::summarize(text, budget);
            assert!(summary.chars().count() <= budget, "budget {budget}: {summary:?}");
        }
        assert_eq!(BandwidthSummarizer::summarize(text, 1), "P");
        assert_eq!(BandwidthSummarizer::summarize(text, 0), "");
    }

    #[test]
    fn test_summarizer_keeps_short_text() {
        assert_eq!(BandwidthSummarizer::summarize("short", 280), "short");
    }

    #[tokio::test]
    async fn test_summarizer_uses_input_budget() {
        let input = ProviderInput::new(StageId::Summarize, "one two three four five six", Language::English)
            .with_char_budget(10);
        let outcome = BandwidthSummarizer::default().invoke(&input).await;
        assert!(text_of(&outcome).chars().count() <= 10);
        assert_eq!(outcome.payload().unwrap().metadata["original_chars"], json!(27));
    }

    #[test]
    fn test_local_registry_covers_every_capability() {
        let registry = local_registry(BandwidthTier::Low);
        for cap in CapabilityId::ALL {
            assert!(registry.is_registered(cap), "{cap} missing");
        }
    }
}
