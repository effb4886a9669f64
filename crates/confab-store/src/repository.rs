//! The durable conversation store.
//!
//! A lazily-initialized keyed store of conversation records. The underlying
//! connection is opened on first use; concurrent first calls converge on a
//! single connection. The store performs no retries: any I/O failure
//! surfaces as a rejected operation carrying the underlying cause.

use std::path::PathBuf;

use once_cell::sync::OnceCell;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use confab_core::error::ConfabError;
use confab_core::types::{ApiConfig, Conversation, Message};

use crate::db::Database;

enum Location {
    Disk(PathBuf),
    Memory,
}

/// Persistent store of conversations keyed by id.
pub struct ConversationStore {
    location: Location,
    db: OnceCell<Database>,
}

impl ConversationStore {
    /// Create a store backed by a database file at the given path.
    ///
    /// The file is not opened until the first operation.
    pub fn new(path: PathBuf) -> Self {
        Self {
            location: Location::Disk(path),
            db: OnceCell::new(),
        }
    }

    /// Create a store backed by an in-memory database (for testing).
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            db: OnceCell::new(),
        }
    }

    /// Open the underlying database on first use.
    ///
    /// Idempotent: racing callers block until a single initialization
    /// completes and then share the one connection.
    fn database(&self) -> Result<&Database, ConfabError> {
        self.db.get_or_try_init(|| match &self.location {
            Location::Disk(path) => Database::open(path),
            Location::Memory => Database::in_memory(),
        })
    }

    /// Insert or fully replace the record for the conversation's id.
    ///
    /// A single statement, so no partial record is ever visible to a
    /// subsequent read. `created_at` is never overwritten on replace.
    pub fn upsert(&self, conversation: &Conversation) -> Result<(), ConfabError> {
        let messages = serde_json::to_string(&conversation.messages)
            .map_err(|e| ConfabError::Storage(format!("Failed to encode messages: {}", e)))?;

        self.database()?.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversations
                     (id, title, created_at, updated_at, api_host, api_credential, api_model, messages)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                     title = excluded.title,
                     updated_at = excluded.updated_at,
                     api_host = excluded.api_host,
                     api_credential = excluded.api_credential,
                     api_model = excluded.api_model,
                     messages = excluded.messages",
                rusqlite::params![
                    conversation.id.to_string(),
                    conversation.title,
                    conversation.created_at,
                    conversation.updated_at,
                    conversation.api_config.host,
                    conversation.api_config.credential,
                    conversation.api_config.model,
                    messages,
                ],
            )
            .map_err(|e| ConfabError::Storage(format!("Failed to upsert conversation: {}", e)))?;
            Ok(())
        })
    }

    /// Point lookup by id. Absent is not an error.
    pub fn get(&self, id: Uuid) -> Result<Option<Conversation>, ConfabError> {
        self.database()?.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, title, created_at, updated_at,
                            api_host, api_credential, api_model, messages
                     FROM conversations WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                    row_to_conversation,
                )
                .optional()
                .map_err(|e| ConfabError::Storage(format!("Failed to load conversation: {}", e)))?;

            match result {
                Some(conversation) => Ok(Some(conversation?)),
                None => Ok(None),
            }
        })
    }

    /// All records ordered by `updated_at` descending (most recently touched
    /// first). Ties break on `created_at` then id so the order is stable.
    pub fn list_all(&self) -> Result<Vec<Conversation>, ConfabError> {
        self.database()?.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, title, created_at, updated_at,
                            api_host, api_credential, api_model, messages
                     FROM conversations
                     ORDER BY updated_at DESC, created_at DESC, id",
                )
                .map_err(|e| ConfabError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], row_to_conversation)
                .map_err(|e| ConfabError::Storage(e.to_string()))?;

            let mut conversations = Vec::new();
            for row in rows {
                let conversation = row.map_err(|e| ConfabError::Storage(e.to_string()))??;
                conversations.push(conversation);
            }
            Ok(conversations)
        })
    }

    /// Remove the record for the given id. Deleting an absent id is a no-op.
    pub fn delete(&self, id: Uuid) -> Result<(), ConfabError> {
        self.database()?.with_conn(|conn| {
            conn.execute(
                "DELETE FROM conversations WHERE id = ?1",
                rusqlite::params![id.to_string()],
            )
            .map_err(|e| ConfabError::Storage(format!("Failed to delete conversation: {}", e)))?;
            Ok(())
        })
    }

    /// Number of stored conversations.
    pub fn count(&self) -> Result<u64, ConfabError> {
        self.database()?.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))
                .map_err(|e| ConfabError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore").finish()
    }
}

/// Map a row to a conversation.
///
/// The outer Result carries rusqlite column errors; the inner one carries
/// decode failures for the id and the messages JSON, so the two error
/// channels stay distinct inside `query_map` closures.
fn row_to_conversation(
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<Result<Conversation, ConfabError>> {
    let id: String = row.get(0)?;
    let title: String = row.get(1)?;
    let created_at: i64 = row.get(2)?;
    let updated_at: i64 = row.get(3)?;
    let api_host: String = row.get(4)?;
    let api_credential: Option<String> = row.get(5)?;
    let api_model: String = row.get(6)?;
    let messages_json: String = row.get(7)?;

    let decoded = Uuid::parse_str(&id)
        .map_err(|e| ConfabError::Storage(format!("Invalid conversation id: {}", e)))
        .and_then(|id| {
            let messages: Vec<Message> = serde_json::from_str(&messages_json)
                .map_err(|e| ConfabError::Storage(format!("Failed to decode messages: {}", e)))?;
            Ok(Conversation {
                id,
                title,
                messages,
                created_at,
                updated_at,
                api_config: ApiConfig {
                    host: api_host,
                    credential: api_credential,
                    model: api_model,
                },
            })
        });

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    use confab_core::types::{Attachment, Role};

    fn sample_conversation(updated_at: i64) -> Conversation {
        let mut conv = Conversation::new(ApiConfig {
            host: "localhost:11434".to_string(),
            credential: Some("Bearer tok".to_string()),
            model: "llama3".to_string(),
        });
        conv.push_message(
            Message::new(Role::User, "hello").with_attachments(vec![Attachment::from_bytes(
                "notes.txt",
                "text/plain",
                b"attached text",
            )]),
        );
        conv.push_message(Message::new(Role::Assistant, "hi there"));
        conv.updated_at = updated_at;
        conv
    }

    #[test]
    fn test_upsert_get_round_trip() {
        let store = ConversationStore::in_memory();
        let conv = sample_conversation(1000);
        store.upsert(&conv).unwrap();

        let loaded = store.get(conv.id).unwrap().unwrap();
        assert_eq!(loaded, conv);
    }

    #[test]
    fn test_get_absent_returns_none() {
        let store = ConversationStore::in_memory();
        assert!(store.get(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_whole_record() {
        let store = ConversationStore::in_memory();
        let mut conv = sample_conversation(1000);
        store.upsert(&conv).unwrap();

        conv.push_message(Message::new(Role::User, "follow-up"));
        conv.title = "renamed".to_string();
        conv.updated_at = 2000;
        store.upsert(&conv).unwrap();

        let loaded = store.get(conv.id).unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 3);
        assert_eq!(loaded.title, "renamed");
        assert_eq!(loaded.updated_at, 2000);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_upsert_preserves_created_at() {
        let store = ConversationStore::in_memory();
        let mut conv = sample_conversation(1000);
        let original_created = conv.created_at;
        store.upsert(&conv).unwrap();

        conv.updated_at = 9999;
        store.upsert(&conv).unwrap();

        let loaded = store.get(conv.id).unwrap().unwrap();
        assert_eq!(loaded.created_at, original_created);
    }

    #[test]
    fn test_list_all_orders_by_updated_at_desc() {
        let store = ConversationStore::in_memory();
        let older = sample_conversation(1000);
        let newer = sample_conversation(3000);
        let middle = sample_conversation(2000);
        store.upsert(&older).unwrap();
        store.upsert(&newer).unwrap();
        store.upsert(&middle).unwrap();

        let all = store.list_all().unwrap();
        let stamps: Vec<i64> = all.iter().map(|c| c.updated_at).collect();
        assert_eq!(stamps, vec![3000, 2000, 1000]);
    }

    #[test]
    fn test_newer_record_listed_first() {
        let store = ConversationStore::in_memory();
        for ts in [100, 200, 300] {
            store.upsert(&sample_conversation(ts)).unwrap();
        }

        let newest = sample_conversation(400);
        store.upsert(&newest).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all[0].id, newest.id);
    }

    #[test]
    fn test_delete_removes_record() {
        let store = ConversationStore::in_memory();
        let conv = sample_conversation(1000);
        store.upsert(&conv).unwrap();
        store.delete(conv.id).unwrap();
        assert!(store.get(conv.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let store = ConversationStore::in_memory();
        let conv = sample_conversation(1000);
        store.upsert(&conv).unwrap();

        store.delete(Uuid::new_v4()).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.get(conv.id).unwrap().unwrap(), conv);
    }

    #[test]
    fn test_message_without_attachments_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversations.db");
        let mut conv = Conversation::new(ApiConfig {
            host: "http://x".to_string(),
            credential: None,
            model: "m".to_string(),
        });
        conv.push_message(Message::new(Role::User, "plain"));

        {
            let store = ConversationStore::new(path.clone());
            store.upsert(&conv).unwrap();
        }

        let store = ConversationStore::new(path);
        let loaded = store.get(conv.id).unwrap().unwrap();
        assert_eq!(loaded, conv);
        assert!(loaded.messages[0].attachments.is_empty());
    }

    #[test]
    fn test_lazy_init_converges_under_concurrent_first_use() {
        use std::sync::Arc;
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ConversationStore::new(dir.path().join("conversations.db")));

        let mut handles = Vec::new();
        for ts in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                store.upsert(&sample_conversation(ts)).unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Every write landed through the single shared connection, and the
        // migration ran exactly once.
        assert_eq!(store.count().unwrap(), 8);
    }
}
