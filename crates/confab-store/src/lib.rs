//! Confab store crate - durable conversation persistence.
//!
//! Provides a lazily-opened, WAL-mode SQLite store of conversation records
//! keyed by id, with upsert, point lookup, delete, and a
//! most-recently-updated-first listing. The listing order is a hard
//! contract: the sidebar and most-relevant-conversation logic depend on it.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::ConversationStore;
