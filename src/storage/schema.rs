//! Database schema definitions and migration logic for the local store.

use rusqlite::{Connection, Result};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the local issue database.
pub const SCHEMA_SQL: &str = r"
    -- Issues table
    -- client_nonce is the idempotency key: at most one row per nonce.
    CREATE TABLE IF NOT EXISTS issues (
        id TEXT PRIMARY KEY,
        description TEXT NOT NULL,
        address TEXT NOT NULL,
        image_ref TEXT,
        solved INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        created_by TEXT NOT NULL DEFAULT '',
        client_nonce TEXT NOT NULL UNIQUE,
        CHECK (length(trim(description)) >= 1),
        CHECK (length(trim(address)) >= 1)
    );

    CREATE INDEX IF NOT EXISTS idx_issues_created_at ON issues(created_at);
    CREATE INDEX IF NOT EXISTS idx_issues_created_by ON issues(created_by);
    CREATE INDEX IF NOT EXISTS idx_issues_solved ON issues(solved);

    -- Tags, in display order. Case-insensitive uniqueness per issue.
    CREATE TABLE IF NOT EXISTS issue_tags (
        issue_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        tag TEXT NOT NULL,
        PRIMARY KEY (issue_id, position),
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_issue_tags_nocase ON issue_tags(issue_id, tag COLLATE NOCASE);

    -- Votes: one row per (issue, voter); the count is derived from it.
    CREATE TABLE IF NOT EXISTS issue_votes (
        issue_id TEXT NOT NULL,
        voter TEXT NOT NULL,
        voted_at TEXT NOT NULL,
        PRIMARY KEY (issue_id, voter),
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_issue_votes_issue_id ON issue_votes(issue_id);

    -- Metadata
    CREATE TABLE IF NOT EXISTS metadata (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

/// Apply the schema to the database.
///
/// It is idempotent because all statements use `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    run_migrations(conn)?;

    // Set journal mode to WAL for concurrency
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Enable foreign keys
    conn.pragma_update(None, "foreign_keys", "ON")?;

    Ok(())
}

/// Record the schema version for databases created before it was tracked.
fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO metadata (key, value) VALUES ('schema_version', ?)",
        [CURRENT_SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}
