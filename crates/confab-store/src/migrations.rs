//! Database schema migrations.
//!
//! Applies the conversations table and its ordering index.

use rusqlite::Connection;
use tracing::info;

use confab_core::error::ConfabError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental
/// changes.
pub fn run_migrations(conn: &Connection) -> Result<(), ConfabError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| ConfabError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| ConfabError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: conversations table.
///
/// The message log and attachment payloads are embedded in the `messages`
/// JSON column so each record is written and replaced as a whole. Timestamps
/// are epoch milliseconds stamped by the orchestrator.
fn apply_v1(conn: &Connection) -> Result<(), ConfabError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS conversations (
            id              TEXT PRIMARY KEY NOT NULL,
            title           TEXT NOT NULL DEFAULT '',
            created_at      INTEGER NOT NULL,
            updated_at      INTEGER NOT NULL,
            api_host        TEXT NOT NULL DEFAULT '',
            api_credential  TEXT,
            api_model       TEXT NOT NULL DEFAULT '',
            messages        TEXT NOT NULL DEFAULT '[]'
        );

        -- Listing contract: most recently touched first.
        CREATE INDEX IF NOT EXISTS idx_conversations_updated_at
            ON conversations (updated_at DESC);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| ConfabError::Storage(format!("Failed to apply v1 schema: {}", e)))
}
