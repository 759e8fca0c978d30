//! The immutable request handed to the pipeline.

use super::{CapabilityId, Language};
use crate::errors::{InvalidRequestError, UnknownLanguageError};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Declared media kind of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A text-bearing document (PDF, plain text, word processor file).
    Document,
    /// A picture.
    Image,
}

impl MediaKind {
    /// Guesses the media kind from a file name's extension.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" | "txt" | "md" | "doc" | "docx" | "odt" | "rtf" => Some(Self::Document),
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Where an attachment's bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttachmentSource {
    /// Bytes carried inline, base64-encoded.
    Inline {
        /// Standard base64 encoding of the content.
        data: String,
    },
    /// A reference resolved by the extraction provider.
    Uri {
        /// The location.
        uri: String,
    },
}

/// A reference to a user-supplied attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// File name as shown to the user.
    pub name: String,
    /// Declared media kind.
    pub kind: MediaKind,
    /// Content location.
    pub source: AttachmentSource,
}

impl Attachment {
    /// Creates an attachment that refers to external content.
    #[must_use]
    pub fn from_uri(name: impl Into<String>, kind: MediaKind, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            source: AttachmentSource::Uri { uri: uri.into() },
        }
    }

    /// Creates an attachment carrying its bytes inline.
    #[must_use]
    pub fn inline(name: impl Into<String>, kind: MediaKind, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            kind,
            source: AttachmentSource::Inline {
                data: STANDARD.encode(bytes),
            },
        }
    }

    /// Creates a document attachment by URI.
    #[must_use]
    pub fn document(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::from_uri(name, MediaKind::Document, uri)
    }

    /// Creates an image attachment by URI.
    #[must_use]
    pub fn image(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::from_uri(name, MediaKind::Image, uri)
    }

    fn validate(&self) -> Result<(), InvalidRequestError> {
        if self.name.trim().is_empty() {
            return Err(InvalidRequestError::invalid_attachment(
                &self.name,
                "attachment name is empty",
            ));
        }
        match &self.source {
            AttachmentSource::Inline { data } if data.is_empty() => Err(
                InvalidRequestError::invalid_attachment(&self.name, "inline payload is empty"),
            ),
            AttachmentSource::Inline { data } => STANDARD
                .decode(data)
                .map(|_| ())
                .map_err(|e| InvalidRequestError::invalid_attachment(&self.name, e.to_string())),
            AttachmentSource::Uri { uri } if uri.trim().is_empty() => Err(
                InvalidRequestError::invalid_attachment(&self.name, "uri is empty"),
            ),
            AttachmentSource::Uri { .. } => Ok(()),
        }
    }
}

/// One user request: text, attachments, languages and the capability
/// toggles captured when the request was made.
///
/// A request is built by value and never mutated after it is handed to the
/// pipeline, so the enabled-capability set is frozen for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRequest {
    text: String,
    #[serde(default)]
    attachments: Vec<Attachment>,
    source_language: Language,
    display_language: Language,
    #[serde(default)]
    enabled: BTreeSet<CapabilityId>,
}

impl PipelineRequest {
    /// Creates a request whose source and display language are the same.
    #[must_use]
    pub fn new(text: impl Into<String>, language: Language) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
            source_language: language,
            display_language: language,
            enabled: BTreeSet::new(),
        }
    }

    /// Creates a request from a language tag.
    pub fn from_tag(text: impl Into<String>, tag: &str) -> Result<Self, UnknownLanguageError> {
        Ok(Self::new(text, tag.parse()?))
    }

    /// Sets the language the response should be rendered in.
    #[must_use]
    pub fn with_display_language(mut self, language: Language) -> Self {
        self.display_language = language;
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Enables a capability.
    #[must_use]
    pub fn enable(mut self, capability: CapabilityId) -> Self {
        self.enabled.insert(capability);
        self
    }

    /// Replaces the enabled set.
    #[must_use]
    pub fn with_enabled(mut self, capabilities: impl IntoIterator<Item = CapabilityId>) -> Self {
        self.enabled = capabilities.into_iter().collect();
        self
    }

    /// Enables capabilities by identifier string.
    ///
    /// Unknown identifiers are ignored: toggling on something the system
    /// does not know is a no-op.
    #[must_use]
    pub fn with_enabled_ids<'a>(mut self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        for id in ids {
            match CapabilityId::from_id(id) {
                Some(cap) => {
                    self.enabled.insert(cap);
                }
                None => debug!(capability = id, "Ignoring unknown capability toggle"),
            }
        }
        self
    }

    /// Returns the raw text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the attachments in order.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Returns true if any attachment is present.
    #[must_use]
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// Returns the language the text is written in.
    #[must_use]
    pub fn source_language(&self) -> Language {
        self.source_language
    }

    /// Returns the language the response should be rendered in.
    #[must_use]
    pub fn display_language(&self) -> Language {
        self.display_language
    }

    /// Returns the enabled-capability set captured at request time.
    #[must_use]
    pub fn enabled(&self) -> &BTreeSet<CapabilityId> {
        &self.enabled
    }

    /// Returns true if the capability was toggled on.
    #[must_use]
    pub fn is_enabled(&self, capability: CapabilityId) -> bool {
        self.enabled.contains(&capability)
    }

    /// Checks the request-source obligations: some text or at least one
    /// attachment, and well-formed attachment references.
    pub fn validate(&self) -> Result<(), InvalidRequestError> {
        if self.text.trim().is_empty() && self.attachments.is_empty() {
            return Err(InvalidRequestError::EmptyRequest);
        }
        self.attachments.iter().try_for_each(Attachment::validate)
    }
}
