//! `SQLite` storage backend.
//!
//! The single-writer store. Nonce idempotency is a `UNIQUE` column written
//! with `ON CONFLICT DO NOTHING` and read back by nonce; vote de-duplication
//! is the `(issue_id, voter)` primary key of `issue_votes`. Voter sets are
//! returned with every issue and the upvote count is derived from them.

use crate::error::{CivicError, Result, Warning};
use crate::model::{
    Created, Identity, Issue, NewIssue, RawTimestamp, Role, TagSet, VoteOutcome, parse_timestamp,
};
use crate::query::StatusFilter;
use crate::storage::images::ImageStore;
use crate::storage::schema::apply_schema;
use crate::storage::{IssueStore, ListFilter};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, Transaction};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

const BACKEND: &str = "local";
const LOCAL_USER_KEY: &str = "local_user_id";

const ISSUE_COLUMNS: &str =
    "id, description, address, image_ref, solved, created_at, created_by, client_nonce";

/// Who the local store acts as.
#[derive(Debug, Clone, Default)]
pub struct LocalStoreOptions {
    /// Pinned identity. When unset a generated id is persisted in the database.
    pub identity: Option<String>,
    pub display_name: Option<String>,
    pub role: Role,
    /// `SQLite` busy timeout in ms.
    pub lock_timeout_ms: Option<u64>,
}

/// SQLite-based issue store.
pub struct LocalStore {
    conn: Mutex<Connection>,
    images: Option<Box<dyn ImageStore>>,
    identity: Identity,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("identity", &self.identity)
            .field("images", &self.images.is_some())
            .finish_non_exhaustive()
    }
}

impl LocalStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open(
        path: &Path,
        options: LocalStoreOptions,
        images: Option<Box<dyn ImageStore>>,
    ) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CivicError::DatabaseOpen {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            }
        }
        let conn = Connection::open(path).map_err(|e| CivicError::DatabaseOpen {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if let Some(timeout) = options.lock_timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        }
        info!(path = %path.display(), "Opened local issue database");
        Self::from_connection(conn, options, images)
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory(options: LocalStoreOptions) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, options, None)
    }

    fn from_connection(
        mut conn: Connection,
        options: LocalStoreOptions,
        images: Option<Box<dyn ImageStore>>,
    ) -> Result<Self> {
        apply_schema(&conn)?;
        let id = match options.identity.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => load_or_create_local_user(&mut conn)?,
        };
        let identity = Identity {
            id,
            display_name: options.display_name,
            role: options.role,
        };
        debug!(identity = %identity.id, role = %identity.role, "Local identity resolved");
        Ok(Self {
            conn: Mutex::new(conn),
            images,
            identity,
        })
    }

    /// Attach an image store after construction.
    #[must_use]
    pub fn with_images(mut self, images: Box<dyn ImageStore>) -> Self {
        self.images = Some(images);
        self
    }

    /// Get an issue by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_issue(&self, id: &str) -> Result<Option<Issue>> {
        let conn = self.conn.lock().await;
        get_issue_by(&conn, "id", id)
    }

    /// Number of stored issues.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_issues(&self) -> Result<usize> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT count(*) FROM issues", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn store_image(&self, new_issue: &NewIssue) -> (Option<String>, Vec<Warning>) {
        let Some(image) = &new_issue.image else {
            return (None, Vec::new());
        };
        let Some(images) = &self.images else {
            warn!("No image directory configured; saving issue without image");
            return (
                None,
                vec![Warning::UploadFailed {
                    reason: "no image directory configured".to_string(),
                }],
            );
        };
        match images.put(image).await {
            Ok(reference) => (Some(reference), Vec::new()),
            Err(e) => {
                warn!(
                    error = %e,
                    file = %image.file_name,
                    "Image upload failed; inserting without image"
                );
                (
                    None,
                    vec![Warning::UploadFailed {
                        reason: e.to_string(),
                    }],
                )
            }
        }
    }

    fn require_authority(&self, action: &str) -> Result<()> {
        if self.identity.role.can_set_status() {
            Ok(())
        } else {
            Err(CivicError::unauthorized(action))
        }
    }
}

#[async_trait]
impl IssueStore for LocalStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    async fn list_issues(&self, filter: &ListFilter) -> Result<Vec<Issue>> {
        let conn = self.conn.lock().await;
        let issues = list_issues_impl(&conn, filter.status)?;
        debug!(count = issues.len(), "Listed local issues");
        Ok(issues)
    }

    async fn create_issue(&self, new_issue: NewIssue) -> Result<Created> {
        // A retried nonce returns the stored record without re-uploading.
        {
            let conn = self.conn.lock().await;
            if let Some(existing) = get_issue_by(&conn, "client_nonce", &new_issue.client_nonce)? {
                debug!(id = %existing.id, nonce = %new_issue.client_nonce, "Nonce already stored");
                return Ok(Created::new(existing));
            }
        }

        let (image_ref, warnings) = self.store_image(&new_issue).await;

        let mut conn = self.conn.lock().await;
        let issue = insert_or_fetch(
            &mut conn,
            &new_issue,
            image_ref.as_deref(),
            &self.identity.id,
        )?;
        info!(id = %issue.id, nonce = %new_issue.client_nonce, "Created local issue");
        Ok(Created { issue, warnings })
    }

    async fn upvote_issue(&self, id: &str) -> Result<VoteOutcome> {
        let mut conn = self.conn.lock().await;
        let outcome = record_vote(&mut conn, id, &self.identity.id)?;
        if outcome == VoteOutcome::AlreadyCounted {
            debug!(id, voter = %self.identity.id, "Duplicate vote ignored");
        }
        Ok(outcome)
    }

    async fn set_solved(&self, id: &str, solved: bool) -> Result<Issue> {
        self.require_authority("change issue status")?;
        let conn = self.conn.lock().await;
        let rows = conn.execute(
            "UPDATE issues SET solved = ? WHERE id = ?",
            rusqlite::params![i32::from(solved), id],
        )?;
        if rows == 0 {
            return Err(CivicError::not_found(id));
        }
        info!(id, solved, actor = %self.identity.id, "Issue status changed");
        get_issue_by(&conn, "id", id)?.ok_or_else(|| CivicError::not_found(id))
    }

    async fn current_identity(&self) -> Result<Option<Identity>> {
        Ok(Some(self.identity.clone()))
    }

    async fn delete_issue(&self, id: &str) -> Result<()> {
        self.require_authority("delete issues")?;
        let conn = self.conn.lock().await;
        let rows = conn.execute("DELETE FROM issues WHERE id = ?", [id])?;
        if rows == 0 {
            return Err(CivicError::not_found(id));
        }
        info!(id, actor = %self.identity.id, "Deleted local issue");
        Ok(())
    }
}

fn load_or_create_local_user(conn: &mut Connection) -> Result<String> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?",
            [LOCAL_USER_KEY],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    let simple = Uuid::new_v4().simple().to_string();
    let id = format!("user_{}", &simple[..12]);
    conn.execute(
        "INSERT OR IGNORE INTO metadata (key, value) VALUES (?, ?)",
        rusqlite::params![LOCAL_USER_KEY, id],
    )?;
    // Another connection may have won the insert.
    let stored: String = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?",
        [LOCAL_USER_KEY],
        |row| row.get(0),
    )?;
    Ok(stored)
}

fn insert_or_fetch(
    conn: &mut Connection,
    new_issue: &NewIssue,
    image_ref: Option<&str>,
    created_by: &str,
) -> Result<Issue> {
    let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
    let id = Uuid::new_v4().to_string();
    let inserted = tx.execute(
        "INSERT INTO issues (id, description, address, image_ref, solved, created_at, created_by, client_nonce)
         VALUES (?, ?, ?, ?, 0, ?, ?, ?)
         ON CONFLICT(client_nonce) DO NOTHING",
        rusqlite::params![
            id,
            new_issue.description,
            new_issue.address,
            image_ref,
            Utc::now().to_rfc3339(),
            created_by,
            new_issue.client_nonce,
        ],
    )?;
    if inserted == 1 {
        write_tags(&tx, &id, &new_issue.tags)?;
    } else {
        debug!(nonce = %new_issue.client_nonce, "Nonce conflict; returning existing issue");
    }
    let issue = get_issue_by(&tx, "client_nonce", &new_issue.client_nonce)?.ok_or_else(|| {
        CivicError::Transient(format!(
            "issue for nonce {} vanished during insert",
            new_issue.client_nonce
        ))
    })?;
    tx.commit()?;
    Ok(issue)
}

fn write_tags(tx: &Transaction<'_>, issue_id: &str, tags: &TagSet) -> Result<()> {
    for (position, tag) in tags.iter().enumerate() {
        tx.execute(
            "INSERT OR IGNORE INTO issue_tags (issue_id, position, tag) VALUES (?, ?, ?)",
            rusqlite::params![issue_id, i64::try_from(position).unwrap_or(i64::MAX), tag],
        )?;
    }
    Ok(())
}

fn record_vote(conn: &mut Connection, issue_id: &str, voter: &str) -> Result<VoteOutcome> {
    let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
    let exists: bool = tx
        .prepare("SELECT 1 FROM issues WHERE id = ?")?
        .exists([issue_id])?;
    if !exists {
        return Err(CivicError::not_found(issue_id));
    }
    let inserted = tx.execute(
        "INSERT OR IGNORE INTO issue_votes (issue_id, voter, voted_at) VALUES (?, ?, ?)",
        rusqlite::params![issue_id, voter, Utc::now().to_rfc3339()],
    )?;
    tx.commit()?;
    Ok(if inserted == 1 {
        VoteOutcome::Counted
    } else {
        VoteOutcome::AlreadyCounted
    })
}

struct IssueRow {
    id: String,
    description: String,
    address: String,
    image_ref: Option<String>,
    solved: bool,
    created_at: String,
    created_by: String,
    client_nonce: String,
}

fn issue_row(row: &Row<'_>) -> rusqlite::Result<IssueRow> {
    Ok(IssueRow {
        id: row.get(0)?,
        description: row.get(1)?,
        address: row.get(2)?,
        image_ref: row.get(3)?,
        solved: row.get::<_, i64>(4)? != 0,
        created_at: row.get(5)?,
        created_by: row.get(6)?,
        client_nonce: row.get(7)?,
    })
}

fn into_issue(row: IssueRow, tags: TagSet, voters: BTreeSet<String>) -> Issue {
    Issue {
        created_at: parse_timestamp(&RawTimestamp::Text(row.created_at)),
        upvote_count: voters.len() as u64,
        voters: Some(voters),
        id: row.id,
        description: row.description,
        address: row.address,
        tags,
        image_ref: row.image_ref,
        solved: row.solved,
        created_by: row.created_by,
        client_nonce: Some(row.client_nonce),
    }
}

fn get_issue_by(conn: &Connection, column: &str, value: &str) -> Result<Option<Issue>> {
    let column = match column {
        "client_nonce" => "client_nonce",
        _ => "id",
    };
    let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE {column} = ?");
    let Some(row) = conn.query_row(&sql, [value], issue_row).optional()? else {
        return Ok(None);
    };
    let mut tags = load_tags(conn, Some(row.id.as_str()))?;
    let mut voters = load_voters(conn, Some(row.id.as_str()))?;
    let tags = tags.remove(&row.id).unwrap_or_default();
    let voters = voters.remove(&row.id).unwrap_or_default();
    Ok(Some(into_issue(row, tags, voters)))
}

fn list_issues_impl(conn: &Connection, status: StatusFilter) -> Result<Vec<Issue>> {
    let mut sql = format!(
        "SELECT {ISSUE_COLUMNS}, (SELECT count(*) FROM issue_votes v WHERE v.issue_id = issues.id) AS upvotes
         FROM issues"
    );
    match status {
        StatusFilter::All => {}
        StatusFilter::Solved => sql.push_str(" WHERE solved = 1"),
        StatusFilter::Unsolved => sql.push_str(" WHERE solved = 0"),
    }
    sql.push_str(" ORDER BY upvotes DESC, rowid ASC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], issue_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut tags = load_tags(conn, None)?;
    let mut voters = load_voters(conn, None)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let t = tags.remove(&row.id).unwrap_or_default();
            let v = voters.remove(&row.id).unwrap_or_default();
            into_issue(row, t, v)
        })
        .collect())
}

fn load_tags(conn: &Connection, issue_id: Option<&str>) -> Result<HashMap<String, TagSet>> {
    let mut out: HashMap<String, TagSet> = HashMap::new();
    let (sql, params): (&str, Vec<&str>) = match issue_id {
        Some(id) => (
            "SELECT issue_id, tag FROM issue_tags WHERE issue_id = ? ORDER BY position",
            vec![id],
        ),
        None => (
            "SELECT issue_id, tag FROM issue_tags ORDER BY issue_id, position",
            vec![],
        ),
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (id, tag) = row?;
        out.entry(id).or_default().insert(&tag);
    }
    Ok(out)
}

fn load_voters(
    conn: &Connection,
    issue_id: Option<&str>,
) -> Result<HashMap<String, BTreeSet<String>>> {
    let mut out: HashMap<String, BTreeSet<String>> = HashMap::new();
    let (sql, params): (&str, Vec<&str>) = match issue_id {
        Some(id) => (
            "SELECT issue_id, voter FROM issue_votes WHERE issue_id = ?",
            vec![id],
        ),
        None => ("SELECT issue_id, voter FROM issue_votes", vec![]),
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (id, voter) = row?;
        out.entry(id).or_default().insert(voter);
    }
    Ok(out)
}
