//! Core domain types for DocChat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ContentType
// ---------------------------------------------------------------------------

/// The two document kinds accepted from the storage folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Cloud-native word-processor document, exported as plain text.
    NativeDocument,
    /// Fixed-layout document (PDF), extracted page by page.
    PagedDocument,
}

impl ContentType {
    /// Every accepted content type, in listing-query order.
    pub const ACCEPTED: [ContentType; 2] = [Self::NativeDocument, Self::PagedDocument];

    /// Map a storage MIME type to an accepted content type.
    /// Returns `None` for anything else.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "application/vnd.google-apps.document" => Some(Self::NativeDocument),
            "application/pdf" => Some(Self::PagedDocument),
            _ => None,
        }
    }

    /// The storage MIME type for this content type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::NativeDocument => "application/vnd.google-apps.document",
            Self::PagedDocument => "application/pdf",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NativeDocument => write!(f, "document"),
            Self::PagedDocument => write!(f, "pdf"),
        }
    }
}

// ---------------------------------------------------------------------------
// SourceItem / ExtractedText
// ---------------------------------------------------------------------------

/// A document found by listing the source folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    /// Opaque storage identifier.
    pub id: String,
    /// Display name (used in the knowledge buffer markers).
    pub name: String,
    /// Accepted content type.
    pub content_type: ContentType,
}

/// Plain text extracted from one [`SourceItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    /// Name of the originating document.
    pub source_name: String,
    /// Extracted body text.
    pub body: String,
}

impl ExtractedText {
    pub fn new(source_name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            body: body.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single role-tagged chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// When the message entered the conversation.
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            sent_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for chat session identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new time-sortable session identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_mime_types() {
        for ct in ContentType::ACCEPTED {
            assert_eq!(ContentType::from_mime(ct.mime_type()), Some(ct));
        }
        assert_eq!(ContentType::from_mime("image/png"), None);
        assert_eq!(
            ContentType::from_mime("application/vnd.google-apps.spreadsheet"),
            None
        );
    }

    #[test]
    fn message_serialization() {
        let msg = Message::user("hello");
        let json = serde_json::to_string(&msg).expect("serialize");
        assert!(json.contains(r#""role":"user""#));
        let parsed: Message = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.role, Role::User);
        assert_eq!(parsed.content, "hello");
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
