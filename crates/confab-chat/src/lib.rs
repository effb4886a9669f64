//! Confab chat crate - conversation orchestration.
//!
//! Owns the conversation entity lifecycle: sequences the send-message and
//! extract-embedding workflows, maintains the authoritative in-memory view,
//! and reconciles it with the durable store after every mutation, including
//! error paths. User input is persisted optimistically before the remote
//! call, so local durability never depends on remote availability.

pub mod attachments;
pub mod backend;
pub mod error;
pub mod orchestrator;

pub use attachments::AttachmentInput;
pub use backend::ChatBackend;
pub use error::ChatError;
pub use orchestrator::{ChatOrchestrator, EmbeddingResult};
