//! Confab core crate - shared domain model, errors, settings, events.
//!
//! Defines the conversation entity model (conversations, messages,
//! attachments, API configurations), the top-level error type, the persisted
//! settings slot holding the current API configuration, and the domain
//! events published by the orchestrator.

pub mod error;
pub mod events;
pub mod settings;
pub mod types;

pub use error::{ConfabError, Result};
pub use events::ChatEvent;
pub use settings::Settings;
pub use types::{
    derive_title, now_ms, ApiConfig, Attachment, ChatTurn, Conversation, Message, ModelInfo, Role,
    HISTORY_WINDOW, TITLE_MAX_CHARS,
};
