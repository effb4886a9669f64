use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfabError, Result};

/// Maximum number of characters in an auto-derived conversation title.
pub const TITLE_MAX_CHARS: usize = 50;

/// Marker appended to titles that were truncated.
pub const TITLE_ELLIPSIS: &str = "...";

/// Number of most-recent messages sent upstream with each chat request.
pub const HISTORY_WINDOW: usize = 10;

/// Current time as epoch milliseconds. All domain timestamps use this clock.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// =============================================================================
// Enums
// =============================================================================

/// The author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Wire-format string for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A file attached to a message, embedded in the conversation record.
///
/// The payload is base64-encoded text so the attachment can live in the same
/// persisted record as the conversation without a separate blob store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub mime: String,
    /// Base64-encoded payload.
    pub data: String,
}

impl Attachment {
    /// Build an attachment from raw bytes, encoding the payload.
    pub fn from_bytes(name: impl Into<String>, mime: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            data: BASE64.encode(bytes),
        }
    }

    /// Whether this attachment holds text content that can be inlined into
    /// an outgoing prompt.
    pub fn is_text(&self) -> bool {
        self.mime.starts_with("text/")
    }

    /// Decode the payload back to raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        Ok(BASE64.decode(&self.data)?)
    }

    /// Decode the payload as UTF-8 text.
    pub fn decode_text(&self) -> Result<String> {
        let bytes = self.decode()?;
        String::from_utf8(bytes).map_err(|e| ConfabError::Serialization(e.to_string()))
    }
}

/// A single message in a conversation. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Absent in older persisted records; absent is equivalent to empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: now_ms(),
            attachments: Vec::new(),
        }
    }

    /// Attach files to the message.
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// Endpoint configuration for a chat-completions-style API.
///
/// The host is stored exactly as the user entered it; normalization happens
/// at call time in the gateway, never at storage time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    /// Sent verbatim as the `Authorization` value when present. The user
    /// supplies the exact expected format, including any `Bearer ` prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    pub model: String,
}

/// A model advertised by the remote endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

/// One role/content pair as sent upstream. Timestamps and attachments are
/// never sent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// A titled, ordered log of messages pinned to one API configuration
/// snapshot.
///
/// The message sequence is append-only: it is never reordered or spliced
/// except by whole-conversation deletion. `api_config` is copied by value at
/// creation and never changed afterwards, even if the global settings are
/// edited later.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    /// Epoch milliseconds, immutable once set.
    pub created_at: i64,
    /// Epoch milliseconds, bumped on every mutation.
    pub updated_at: i64,
    pub api_config: ApiConfig,
}

impl Conversation {
    /// Create an empty conversation pinned to the given configuration.
    pub fn new(api_config: ApiConfig) -> Self {
        let now = now_ms();
        Self {
            id: Uuid::new_v4(),
            title: "New Conversation".to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            api_config,
        }
    }

    /// Append a message and bump `updated_at`.
    ///
    /// If this is the first message and it comes from the user, the title is
    /// derived from its content.
    pub fn push_message(&mut self, message: Message) {
        if self.messages.is_empty() && message.role == Role::User {
            self.title = derive_title(&message.content);
        }
        self.messages.push(message);
        self.updated_at = now_ms();
    }

    /// The last [`HISTORY_WINDOW`] messages as role/content pairs,
    /// oldest-first.
    pub fn history_window(&self) -> Vec<ChatTurn> {
        let skip = self.messages.len().saturating_sub(HISTORY_WINDOW);
        self.messages[skip..]
            .iter()
            .map(|m| ChatTurn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }
}

/// Derive a conversation title from its first user message.
///
/// Truncates to [`TITLE_MAX_CHARS`] characters, appending an ellipsis marker
/// only when truncation occurred.
pub fn derive_title(content: &str) -> String {
    if content.chars().count() <= TITLE_MAX_CHARS {
        return content.to_string();
    }
    let mut title: String = content.chars().take(TITLE_MAX_CHARS).collect();
    title.push_str(TITLE_ELLIPSIS);
    title
}
