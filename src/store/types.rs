//! Persisted conversation types
//!
//! Defines the record shape stored on disk (one JSON document per session)
//! and the derived shapes used when rendering history and listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder title used when a conversation was never given one and
/// has no user turn to derive a title from.
pub const DEFAULT_TITLE: &str = "New conversation";

/// Maximum length of an auto-derived conversation title, in characters.
pub const TITLE_MAX_CHARS: usize = 30;

/// Maximum length of a listing preview excerpt, in characters.
pub const PREVIEW_MAX_CHARS: usize = 50;

/// Role of a message sender within a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instruction framing the assistant's behavior
    System,
    /// End-user input
    User,
    /// Generated reply
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One role-tagged message in a conversation
///
/// Content is opaque to the store; it is never inspected beyond
/// title/preview derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Role of the message sender
    pub role: Role,
    /// Message text, unbounded length
    pub content: String,
}

impl Turn {
    /// Creates a new system turn
    ///
    /// # Examples
    ///
    /// ```
    /// use chatvault::store::{Role, Turn};
    ///
    /// let turn = Turn::system("You are a helpful assistant");
    /// assert_eq!(turn.role, Role::System);
    /// ```
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a new user turn
    ///
    /// # Examples
    ///
    /// ```
    /// use chatvault::store::{Role, Turn};
    ///
    /// let turn = Turn::user("Hello!");
    /// assert_eq!(turn.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a new assistant turn
    ///
    /// # Examples
    ///
    /// ```
    /// use chatvault::store::{Role, Turn};
    ///
    /// let turn = Turn::assistant("Hello, user!");
    /// assert_eq!(turn.role, Role::Assistant);
    /// ```
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The sole persisted entity: one durable record per session
///
/// Serialized as a self-contained JSON document named by session id.
/// `session_id` and `created_at` are immutable after creation;
/// `updated_at` is refreshed on every successful mutation and only then.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    /// Opaque unique identifier; primary key
    pub session_id: String,

    /// Short human-readable label; None until derived or explicitly set
    pub title: Option<String>,

    /// Ordered conversation turns; insertion order is conversation order
    /// and is preserved exactly
    pub messages: Vec<Turn>,

    /// Set once at creation
    pub created_at: DateTime<Utc>,

    /// Refreshed on every mutation; monotonically non-decreasing
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    /// Creates an empty record for a fresh session
    pub fn new(session_id: impl Into<String>, title: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            title,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the content of the first user turn, if any
    pub fn first_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
    }
}

/// History shape returned for any session id, known or not
///
/// For unknown ids every field is the empty default, so callers can render
/// "no history yet" without special-casing absence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationHistory {
    /// Stored turns, empty for unknown sessions
    pub messages: Vec<Turn>,
    /// Stored title, if any
    pub title: Option<String>,
    /// Creation time, None for unknown sessions
    pub created_at: Option<DateTime<Utc>>,
    /// Last mutation time, None for unknown sessions
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ConversationRecord> for ConversationHistory {
    fn from(record: ConversationRecord) -> Self {
        Self {
            messages: record.messages,
            title: record.title,
            created_at: Some(record.created_at),
            updated_at: Some(record.updated_at),
        }
    }
}

/// Derived summary of a conversation used for listings
///
/// Never the source of truth; recomputed from the record on every listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPreview {
    /// Session id of the summarized conversation
    pub id: String,
    /// Explicit title, or the first user turn truncated, or a placeholder
    pub title: String,
    /// Excerpt of the last message, truncated
    pub preview: String,
    /// Number of stored turns
    pub message_count: usize,
    /// Creation time of the record
    pub created_at: DateTime<Utc>,
    /// Last mutation time of the record
    pub updated_at: DateTime<Utc>,
}

/// Truncates a string to a maximum number of characters, appending an
/// ellipsis marker when truncation occurred
pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut truncated: String = s.chars().take(max_chars).collect();
        truncated.push_str("...");
        truncated
    }
}

impl ConversationPreview {
    /// Builds a preview from a stored record
    ///
    /// Title fallback chain: explicit title, then the first user turn's
    /// content truncated to [`TITLE_MAX_CHARS`], then [`DEFAULT_TITLE`].
    pub fn from_record(record: &ConversationRecord) -> Self {
        let title = record
            .title
            .clone()
            .or_else(|| {
                record
                    .first_user_content()
                    .map(|c| truncate_chars(c, TITLE_MAX_CHARS))
            })
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let preview = record
            .messages
            .last()
            .map(|t| truncate_chars(&t.content, PREVIEW_MAX_CHARS))
            .unwrap_or_else(|| "No messages yet".to_string());

        Self {
            id: record.session_id.clone(),
            title,
            preview,
            message_count: record.messages.len(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
