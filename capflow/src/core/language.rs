//! Supported language identifiers.

use crate::errors::UnknownLanguageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A language the pipeline can accept requests in and render responses in.
///
/// The set is fixed and small; anything else is rejected at the request
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    /// English (`en`).
    #[serde(rename = "en")]
    English,
    /// Bemba (`bem`).
    #[serde(rename = "bem")]
    Bemba,
    /// Nyanja / Chewa (`ny`).
    #[serde(rename = "ny")]
    Nyanja,
    /// Tonga (`toi`).
    #[serde(rename = "toi")]
    Tonga,
    /// Lozi (`loz`).
    #[serde(rename = "loz")]
    Lozi,
    /// Kaonde (`kqn`).
    #[serde(rename = "kqn")]
    Kaonde,
    /// Lunda (`lun`).
    #[serde(rename = "lun")]
    Lunda,
    /// Luvale (`lue`).
    #[serde(rename = "lue")]
    Luvale,
}

impl Language {
    /// All supported languages, in tag order.
    pub const ALL: [Self; 8] = [
        Self::English,
        Self::Bemba,
        Self::Nyanja,
        Self::Tonga,
        Self::Lozi,
        Self::Kaonde,
        Self::Lunda,
        Self::Luvale,
    ];

    /// Returns the short tag for this language.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Bemba => "bem",
            Self::Nyanja => "ny",
            Self::Tonga => "toi",
            Self::Lozi => "loz",
            Self::Kaonde => "kqn",
            Self::Lunda => "lun",
            Self::Luvale => "lue",
        }
    }

    /// Returns the English display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Bemba => "Bemba",
            Self::Nyanja => "Nyanja",
            Self::Tonga => "Tonga",
            Self::Lozi => "Lozi",
            Self::Kaonde => "Kaonde",
            Self::Lunda => "Lunda",
            Self::Luvale => "Luvale",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::English
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for Language {
    type Err = UnknownLanguageError;

    /// Parses a tag case-insensitively; display names are accepted too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|lang| {
                lang.tag().eq_ignore_ascii_case(needle)
                    || lang.display_name().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| UnknownLanguageError::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags_and_names() {
        assert_eq!("bem".parse::<Language>().unwrap(), Language::Bemba);
        assert_eq!("EN".parse::<Language>().unwrap(), Language::English);
        assert_eq!(" Lozi ".parse::<Language>().unwrap(), Language::Lozi);
    }

    #[test]
    fn test_parse_unknown_tag() {
        let err = "xx".parse::<Language>().unwrap_err();
        assert_eq!(err.tag, "xx");
    }

    #[test]
    fn test_serialize_uses_tag() {
        let json = serde_json::to_string(&Language::Nyanja).unwrap();
        assert_eq!(json, r#""ny""#);

        let lang: Language = serde_json::from_str(r#""toi""#).unwrap();
        assert_eq!(lang, Language::Tonga);
    }

    #[test]
    fn test_tags_are_unique() {
        let mut tags: Vec<_> = Language::ALL.iter().map(|l| l.tag()).collect();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), Language::ALL.len());
    }
}
