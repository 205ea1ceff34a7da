//! Networked multi-writer backend.
//!
//! [`RemoteStore`] holds the protocol rules (insert-or-fetch on the nonce,
//! duplicate votes as success, status change through one RPC) and talks to the
//! server through the [`RemoteApi`] seam. [`PostgrestClient`] is the HTTP
//! implementation of that seam.

mod postgrest;

pub use postgrest::PostgrestClient;

use crate::error::{CivicError, Result, Warning};
use crate::model::{
    Created, Identity, ImagePayload, Issue, NewIssue, RemoteIssueRow, Role, VoteOutcome,
    normalize_remote,
};
use crate::query::StatusFilter;
use crate::storage::{IssueStore, ListFilter};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

const BACKEND: &str = "remote";

/// Storage bucket that holds issue photos.
pub const IMAGE_BUCKET: &str = "issues";

/// Columns requested for every issue read, including the upvote aggregate.
pub const ISSUE_SELECT: &str =
    "id,description,address,tags,image_url,created_at,solved,created_by,client_nonce,uv:issue_upvotes(count)";

/// Server failures, classified.
///
/// `Duplicate` is consumed inside [`RemoteStore`]; the rest convert into
/// [`CivicError`] with the context of the failed operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("unique violation: {0}")]
    Duplicate(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not authenticated")]
    Unauthenticated,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(String),
}

impl RemoteError {
    /// Classify a failed response by HTTP status, `PostgREST` error code and message.
    #[must_use]
    pub fn classify(status: u16, code: Option<&str>, message: &str) -> Self {
        let message = message.to_string();
        match (code, status) {
            (Some("23505"), _) => Self::Duplicate(message),
            (None, 409) if message.to_lowercase().contains("duplicate") => {
                Self::Duplicate(message)
            }
            (Some("42501"), _) | (_, 403) => Self::PermissionDenied(message),
            (_, 401) => Self::Unauthenticated,
            (Some("PGRST116" | "23503"), _) | (_, 404) => Self::NotFound(message),
            (Some("P0001"), _) if message.to_lowercase().contains("not found") => {
                Self::NotFound(message)
            }
            _ => Self::Server { status, message },
        }
    }

    /// Convert into the crate error for `action` on `issue_id`.
    #[must_use]
    pub fn into_civic(self, action: &str, issue_id: Option<&str>) -> CivicError {
        match self {
            Self::PermissionDenied(_) => CivicError::unauthorized(action),
            Self::Unauthenticated => CivicError::auth_required(action),
            Self::NotFound(message) => {
                CivicError::not_found(issue_id.map_or(message, ToString::to_string))
            }
            other => CivicError::Transient(format!("{action}: {other}")),
        }
    }
}

/// The signed-in user as reported by the auth endpoint and `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUser {
    pub id: String,
    pub username: Option<String>,
    pub role: Option<String>,
}

impl RemoteUser {
    fn into_identity(self) -> Identity {
        let role = self
            .role
            .as_deref()
            .and_then(|r| r.parse::<Role>().ok())
            .unwrap_or_default();
        Identity {
            id: self.id,
            display_name: self.username,
            role,
        }
    }
}

/// Row written to the `issues` table.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IssueInsert {
    pub description: String,
    pub address: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub created_by: String,
    pub client_nonce: String,
}

/// Server operations the remote store relies on.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// The user behind the session token, `None` when anonymous.
    async fn current_user(&self) -> std::result::Result<Option<RemoteUser>, RemoteError>;

    async fn select_issues(
        &self,
        status: StatusFilter,
    ) -> std::result::Result<Vec<RemoteIssueRow>, RemoteError>;

    async fn select_issue(
        &self,
        id: &str,
    ) -> std::result::Result<Option<RemoteIssueRow>, RemoteError>;

    async fn select_issue_by_nonce(
        &self,
        nonce: &str,
    ) -> std::result::Result<Option<RemoteIssueRow>, RemoteError>;

    /// Insert ignoring nonce duplicates. `Ok(None)` means the row already existed.
    async fn insert_issue(
        &self,
        row: &IssueInsert,
    ) -> std::result::Result<Option<RemoteIssueRow>, RemoteError>;

    async fn insert_upvote(&self, issue_id: &str, user_id: &str)
    -> std::result::Result<(), RemoteError>;

    /// Atomic server-side status change.
    async fn set_issue_solved(
        &self,
        issue_id: &str,
        solved: bool,
    ) -> std::result::Result<(), RemoteError>;

    /// Upload into the image bucket and return the public URL.
    async fn upload_image(
        &self,
        path: &str,
        image: &ImagePayload,
    ) -> std::result::Result<String, RemoteError>;
}

/// Connection settings for the remote store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSettings {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub access_token: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl RemoteSettings {
    /// Check the endpoint and key, returning the base URL without a trailing slash.
    ///
    /// # Errors
    ///
    /// Returns `CivicError::Config` when the URL is missing or not http(s), or
    /// the anon key is missing.
    pub fn validated(&self) -> Result<(String, String)> {
        let url = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| CivicError::Config("remote.url is not set".to_string()))?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CivicError::Config(format!(
                "remote.url must start with http:// or https://, got '{url}'"
            )));
        }
        let key = self
            .anon_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CivicError::Config("remote.anon-key is not set".to_string()))?;
        Ok((url.trim_end_matches('/').to_string(), key.to_string()))
    }
}

/// Remote issue store over any [`RemoteApi`].
#[derive(Debug)]
pub struct RemoteStore<A = PostgrestClient> {
    api: A,
}

impl<A: RemoteApi> RemoteStore<A> {
    pub const fn new(api: A) -> Self {
        Self { api }
    }

    pub const fn api(&self) -> &A {
        &self.api
    }

    async fn require_user(&self, action: &str) -> Result<Identity> {
        self.current_identity()
            .await?
            .ok_or_else(|| CivicError::auth_required(action))
    }

    async fn upload(&self, image: &ImagePayload) -> (Option<String>, Vec<Warning>) {
        let path = format!("{IMAGE_BUCKET}/{}.{}", Uuid::new_v4(), image.extension());
        match self.api.upload_image(&path, image).await {
            Ok(url) => {
                debug!(%path, "Uploaded issue image");
                (Some(url), Vec::new())
            }
            Err(e) => {
                warn!(error = %e, %path, "Image upload failed; inserting without image");
                (
                    None,
                    vec![Warning::UploadFailed {
                        reason: e.to_string(),
                    }],
                )
            }
        }
    }

    async fn fetch_by_nonce(&self, nonce: &str) -> Result<Issue> {
        let row = self
            .api
            .select_issue_by_nonce(nonce)
            .await
            .map_err(|e| e.into_civic("report an issue", None))?
            .ok_or_else(|| {
                CivicError::Transient(format!(
                    "nonce {nonce} conflicted but no issue was found for it"
                ))
            })?;
        Ok(normalize_remote(row))
    }
}

#[async_trait]
impl<A: RemoteApi> IssueStore for RemoteStore<A> {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    async fn list_issues(&self, filter: &ListFilter) -> Result<Vec<Issue>> {
        let rows = self
            .api
            .select_issues(filter.status)
            .await
            .map_err(|e| e.into_civic("list issues", None))?;
        debug!(count = rows.len(), status = ?filter.status, "Listed remote issues");
        Ok(rows.into_iter().map(normalize_remote).collect())
    }

    async fn create_issue(&self, new_issue: NewIssue) -> Result<Created> {
        let user = self.require_user("report an issue").await?;

        let (image_url, warnings) = match &new_issue.image {
            Some(image) => self.upload(image).await,
            None => (None, Vec::new()),
        };

        let row = IssueInsert {
            description: new_issue.description,
            address: new_issue.address,
            tags: new_issue.tags.as_slice().to_vec(),
            image_url,
            created_by: user.id,
            client_nonce: new_issue.client_nonce,
        };

        let issue = match self.api.insert_issue(&row).await {
            Ok(Some(inserted)) => normalize_remote(inserted),
            Ok(None) => {
                debug!(nonce = %row.client_nonce, "Insert ignored as duplicate; fetching by nonce");
                self.fetch_by_nonce(&row.client_nonce).await?
            }
            Err(RemoteError::Duplicate(message)) => {
                debug!(nonce = %row.client_nonce, %message, "Lost nonce race; fetching winner");
                self.fetch_by_nonce(&row.client_nonce).await?
            }
            Err(e) => return Err(e.into_civic("report an issue", None)),
        };
        info!(id = %issue.id, nonce = %row.client_nonce, "Created remote issue");
        Ok(Created { issue, warnings })
    }

    async fn upvote_issue(&self, id: &str) -> Result<VoteOutcome> {
        let user = self.require_user("upvote").await?;
        match self.api.insert_upvote(id, &user.id).await {
            Ok(()) => Ok(VoteOutcome::Counted),
            Err(RemoteError::Duplicate(_)) => {
                debug!(id, voter = %user.id, "Duplicate vote ignored");
                Ok(VoteOutcome::AlreadyCounted)
            }
            Err(e) => Err(e.into_civic("upvote", Some(id))),
        }
    }

    async fn set_solved(&self, id: &str, solved: bool) -> Result<Issue> {
        // The RPC decides authorization; a rejected call maps to `Unauthorized`.
        let user = self.require_user("change issue status").await?;
        self.api
            .set_issue_solved(id, solved)
            .await
            .map_err(|e| e.into_civic("change issue status", Some(id)))?;
        info!(id, solved, actor = %user.id, "Issue status changed");
        let row = self
            .api
            .select_issue(id)
            .await
            .map_err(|e| e.into_civic("change issue status", Some(id)))?
            .ok_or_else(|| CivicError::not_found(id))?;
        Ok(normalize_remote(row))
    }

    async fn current_identity(&self) -> Result<Option<Identity>> {
        let user = self
            .api
            .current_user()
            .await
            .map_err(|e| e.into_civic("read the current user", None))?;
        Ok(user.map(RemoteUser::into_identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawId, RawTimestamp, TagSet, UpvoteAggregate};
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    /// In-memory stand-in for the server, with switchable failure modes.
    #[derive(Default)]
    struct FakeApi {
        user: Option<RemoteUser>,
        rows: Mutex<Vec<RemoteIssueRow>>,
        votes: Mutex<BTreeSet<(String, String)>>,
        /// Report every insert as a unique violation (a concurrent retry won).
        insert_conflicts: bool,
        upload_fails: bool,
        vote_error: Option<RemoteError>,
        rpc_error: Option<RemoteError>,
        inserts: Mutex<usize>,
    }

    impl FakeApi {
        fn signed_in(role: &str) -> Self {
            Self {
                user: Some(RemoteUser {
                    id: "user-1".to_string(),
                    username: Some("asha".to_string()),
                    role: Some(role.to_string()),
                }),
                ..Default::default()
            }
        }

        fn seed(&self, id: &str, nonce: &str) {
            self.rows.lock().unwrap().push(RemoteIssueRow {
                id: Some(RawId::Text(id.to_string())),
                description: Some("Overflowing drain".to_string()),
                address: Some("Ward 9".to_string()),
                created_at: Some(RawTimestamp::Text("2025-01-15 12:00:00+00".to_string())),
                created_by: Some("someone".to_string()),
                client_nonce: Some(nonce.to_string()),
                uv: Some(vec![UpvoteAggregate { count: 2 }]),
                ..Default::default()
            });
        }

        fn find(&self, pred: impl Fn(&RemoteIssueRow) -> bool) -> Option<RemoteIssueRow> {
            self.rows.lock().unwrap().iter().find(|r| pred(r)).cloned()
        }
    }

    fn id_of(row: &RemoteIssueRow) -> String {
        match &row.id {
            Some(RawId::Text(s)) => s.clone(),
            Some(RawId::Int(n)) => n.to_string(),
            None => String::new(),
        }
    }

    #[async_trait]
    impl RemoteApi for FakeApi {
        async fn current_user(&self) -> std::result::Result<Option<RemoteUser>, RemoteError> {
            Ok(self.user.clone())
        }

        async fn select_issues(
            &self,
            status: StatusFilter,
        ) -> std::result::Result<Vec<RemoteIssueRow>, RemoteError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| status.matches(r.solved.unwrap_or(false)))
                .cloned()
                .collect())
        }

        async fn select_issue(
            &self,
            id: &str,
        ) -> std::result::Result<Option<RemoteIssueRow>, RemoteError> {
            Ok(self.find(|r| id_of(r) == id))
        }

        async fn select_issue_by_nonce(
            &self,
            nonce: &str,
        ) -> std::result::Result<Option<RemoteIssueRow>, RemoteError> {
            Ok(self.find(|r| r.client_nonce.as_deref() == Some(nonce)))
        }

        async fn insert_issue(
            &self,
            row: &IssueInsert,
        ) -> std::result::Result<Option<RemoteIssueRow>, RemoteError> {
            *self.inserts.lock().unwrap() += 1;
            if self.insert_conflicts {
                return Err(RemoteError::classify(
                    409,
                    Some("23505"),
                    "duplicate key value violates unique constraint",
                ));
            }
            if self
                .find(|r| r.client_nonce.as_deref() == Some(row.client_nonce.as_str()))
                .is_some()
            {
                return Ok(None);
            }
            let stored = RemoteIssueRow {
                id: Some(RawId::Text(format!("srv-{}", row.client_nonce))),
                description: Some(row.description.clone()),
                address: Some(row.address.clone()),
                tags: row.tags.iter().collect::<TagSet>(),
                image_url: row.image_url.clone(),
                solved: Some(false),
                created_at: Some(RawTimestamp::Text("2025-02-01T08:30:00Z".to_string())),
                created_by: Some(row.created_by.clone()),
                client_nonce: Some(row.client_nonce.clone()),
                uv: Some(vec![UpvoteAggregate { count: 0 }]),
                upvotes: None,
            };
            self.rows.lock().unwrap().push(stored.clone());
            Ok(Some(stored))
        }

        async fn insert_upvote(
            &self,
            issue_id: &str,
            user_id: &str,
        ) -> std::result::Result<(), RemoteError> {
            if let Some(err) = &self.vote_error {
                return Err(err.clone());
            }
            let fresh = self
                .votes
                .lock()
                .unwrap()
                .insert((issue_id.to_string(), user_id.to_string()));
            if fresh {
                Ok(())
            } else {
                Err(RemoteError::classify(409, Some("23505"), "duplicate vote"))
            }
        }

        async fn set_issue_solved(
            &self,
            issue_id: &str,
            solved: bool,
        ) -> std::result::Result<(), RemoteError> {
            if let Some(err) = &self.rpc_error {
                return Err(err.clone());
            }
            let role = self.user.as_ref().and_then(|u| u.role.as_deref());
            if role == Some("citizen") {
                return Err(RemoteError::classify(
                    403,
                    Some("42501"),
                    "only authorities may change status",
                ));
            }
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|r| id_of(r) == issue_id)
                .ok_or_else(|| RemoteError::classify(400, Some("P0001"), "issue not found"))?;
            row.solved = Some(solved);
            Ok(())
        }

        async fn upload_image(
            &self,
            path: &str,
            _image: &ImagePayload,
        ) -> std::result::Result<String, RemoteError> {
            if self.upload_fails {
                Err(RemoteError::Server {
                    status: 500,
                    message: "bucket unavailable".to_string(),
                })
            } else {
                Ok(format!("https://cdn.example/{path}"))
            }
        }
    }

    fn new_issue(nonce: &str) -> NewIssue {
        NewIssue {
            description: "Broken bench".to_string(),
            address: "Central Park".to_string(),
            tags: TagSet::parse("parks"),
            image: None,
            client_nonce: nonce.to_string(),
        }
    }

    fn jpeg() -> ImagePayload {
        ImagePayload {
            file_name: "bench".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xff, 0xd8],
        }
    }

    #[test]
    fn classify_server_errors() {
        assert!(matches!(
            RemoteError::classify(409, Some("23505"), "dup"),
            RemoteError::Duplicate(_)
        ));
        assert!(matches!(
            RemoteError::classify(403, None, "nope"),
            RemoteError::PermissionDenied(_)
        ));
        assert!(matches!(
            RemoteError::classify(400, Some("42501"), "rls"),
            RemoteError::PermissionDenied(_)
        ));
        assert_eq!(
            RemoteError::classify(401, None, "jwt expired"),
            RemoteError::Unauthenticated
        );
        assert!(matches!(
            RemoteError::classify(409, Some("23503"), "fk"),
            RemoteError::NotFound(_)
        ));
        assert!(matches!(
            RemoteError::classify(409, None, "duplicate key value"),
            RemoteError::Duplicate(_)
        ));
        assert!(matches!(
            RemoteError::classify(409, None, "row was updated concurrently"),
            RemoteError::Server { status: 409, .. }
        ));
        assert!(matches!(
            RemoteError::classify(
                409,
                Some("23P01"),
                "conflicting key value violates exclusion constraint"
            ),
            RemoteError::Server { status: 409, .. }
        ));
        assert!(matches!(
            RemoteError::classify(400, Some("P0001"), "Issue not found"),
            RemoteError::NotFound(_)
        ));
        assert!(matches!(
            RemoteError::classify(400, Some("P0001"), "something else"),
            RemoteError::Server { status: 400, .. }
        ));
        assert!(matches!(
            RemoteError::classify(502, None, "bad gateway"),
            RemoteError::Server { .. }
        ));
    }

    #[test]
    fn settings_validation() {
        let mut settings = RemoteSettings::default();
        assert!(matches!(settings.validated(), Err(CivicError::Config(_))));
        settings.url = Some("ftp://example.org".to_string());
        settings.anon_key = Some("anon".to_string());
        assert!(matches!(settings.validated(), Err(CivicError::Config(_))));
        settings.url = Some("https://db.example.org/".to_string());
        assert_eq!(
            settings.validated().unwrap(),
            ("https://db.example.org".to_string(), "anon".to_string())
        );
        settings.anon_key = Some("  ".to_string());
        assert!(matches!(settings.validated(), Err(CivicError::Config(_))));
    }

    #[tokio::test]
    async fn create_requires_sign_in() {
        let store = RemoteStore::new(FakeApi::default());
        let err = store.create_issue(new_issue("n-1")).await.unwrap_err();
        assert!(matches!(err, CivicError::AuthenticationRequired { .. }));
        assert_eq!(*store.api().inserts.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn same_nonce_is_idempotent() {
        let store = RemoteStore::new(FakeApi::signed_in("citizen"));
        let first = store.create_issue(new_issue("n-1")).await.unwrap();
        let second = store.create_issue(new_issue("n-1")).await.unwrap();
        assert_eq!(first.issue.id, second.issue.id);
        assert_eq!(store.api().rows.lock().unwrap().len(), 1);
        assert_eq!(first.issue.created_by, "user-1");
        assert!(first.issue.voters.is_none());
    }

    #[tokio::test]
    async fn losing_nonce_race_returns_winner() {
        let api = FakeApi {
            insert_conflicts: true,
            ..FakeApi::signed_in("citizen")
        };
        api.seed("winner", "n-1");
        let store = RemoteStore::new(api);
        let created = store.create_issue(new_issue("n-1")).await.unwrap();
        assert_eq!(created.issue.id, "winner");
        assert_eq!(created.issue.upvote_count, 2);
    }

    #[tokio::test]
    async fn upload_failure_is_a_warning() {
        let api = FakeApi {
            upload_fails: true,
            ..FakeApi::signed_in("citizen")
        };
        let store = RemoteStore::new(api);
        let mut payload = new_issue("n-1");
        payload.image = Some(jpeg());
        let created = store.create_issue(payload).await.unwrap();
        assert!(created.issue.image_ref.is_none());
        assert_eq!(created.warnings.len(), 1);
    }

    #[tokio::test]
    async fn uploaded_image_path_uses_bucket_and_extension() {
        let store = RemoteStore::new(FakeApi::signed_in("citizen"));
        let mut payload = new_issue("n-1");
        payload.image = Some(jpeg());
        let created = store.create_issue(payload).await.unwrap();
        let url = created.issue.image_ref.unwrap();
        assert!(url.starts_with("https://cdn.example/issues/"));
        assert!(url.ends_with(".jpg"));
        assert!(created.warnings.is_empty());
    }

    #[tokio::test]
    async fn duplicate_vote_is_success() {
        let api = FakeApi::signed_in("citizen");
        api.seed("i-1", "n-1");
        let store = RemoteStore::new(api);
        assert_eq!(store.upvote_issue("i-1").await.unwrap(), VoteOutcome::Counted);
        assert_eq!(
            store.upvote_issue("i-1").await.unwrap(),
            VoteOutcome::AlreadyCounted
        );
        assert_eq!(store.api().votes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn other_vote_failures_propagate() {
        let api = FakeApi {
            vote_error: Some(RemoteError::Transport("connection reset".to_string())),
            ..FakeApi::signed_in("citizen")
        };
        let store = RemoteStore::new(api);
        let err = store.upvote_issue("i-1").await.unwrap_err();
        assert!(matches!(err, CivicError::Transient(_)));

        let api = FakeApi {
            vote_error: Some(RemoteError::classify(409, Some("23503"), "fk")),
            ..FakeApi::signed_in("citizen")
        };
        let err = RemoteStore::new(api).upvote_issue("gone").await.unwrap_err();
        assert!(matches!(err, CivicError::IssueNotFound { ref id } if id == "gone"));
    }

    #[tokio::test]
    async fn exclusion_conflict_on_vote_is_not_a_repeat_vote() {
        let api = FakeApi {
            vote_error: Some(RemoteError::classify(
                409,
                Some("23P01"),
                "conflicting key value violates exclusion constraint",
            )),
            ..FakeApi::signed_in("citizen")
        };
        let err = RemoteStore::new(api).upvote_issue("i-1").await.unwrap_err();
        assert!(matches!(err, CivicError::Transient(_)));
    }

    #[tokio::test]
    async fn server_decides_status_change_without_profile_role() {
        let api = FakeApi {
            user: Some(RemoteUser {
                id: "user-2".to_string(),
                username: None,
                role: None,
            }),
            ..Default::default()
        };
        api.seed("i-1", "n-1");
        let store = RemoteStore::new(api);
        assert!(store.set_solved("i-1", true).await.unwrap().solved);
        assert_eq!(
            store.api().find(|r| id_of(r) == "i-1").unwrap().solved,
            Some(true)
        );
    }

    #[tokio::test]
    async fn status_change_requires_sign_in() {
        let api = FakeApi::default();
        api.seed("i-1", "n-1");
        let err = RemoteStore::new(api).set_solved("i-1", true).await.unwrap_err();
        assert!(matches!(err, CivicError::AuthenticationRequired { .. }));
    }

    #[tokio::test]
    async fn citizen_cannot_set_solved() {
        let api = FakeApi::signed_in("citizen");
        api.seed("i-1", "n-1");
        let store = RemoteStore::new(api);
        let err = store.set_solved("i-1", true).await.unwrap_err();
        assert!(matches!(err, CivicError::Unauthorized { .. }));
        assert_eq!(
            store.api().find(|r| id_of(r) == "i-1").unwrap().solved,
            None
        );
    }

    #[tokio::test]
    async fn server_permission_denial_maps_to_unauthorized() {
        let api = FakeApi {
            rpc_error: Some(RemoteError::classify(403, Some("42501"), "rls")),
            ..FakeApi::signed_in("authority")
        };
        api.seed("i-1", "n-1");
        let err = RemoteStore::new(api).set_solved("i-1", true).await.unwrap_err();
        assert!(matches!(err, CivicError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn authority_sets_explicit_value() {
        let api = FakeApi::signed_in("authority");
        api.seed("i-1", "n-1");
        let store = RemoteStore::new(api);
        assert!(store.set_solved("i-1", true).await.unwrap().solved);
        assert!(store.set_solved("i-1", true).await.unwrap().solved);
        assert!(!store.set_solved("i-1", false).await.unwrap().solved);
        let err = store.set_solved("missing", true).await.unwrap_err();
        assert!(matches!(err, CivicError::IssueNotFound { .. }));
    }

    #[tokio::test]
    async fn list_applies_status_pushdown_and_normalizes() {
        let api = FakeApi::default();
        api.seed("i-1", "n-1");
        api.seed("i-2", "n-2");
        api.rows.lock().unwrap()[1].solved = Some(true);
        let store = RemoteStore::new(api);
        let all = store.list_issues(&ListFilter::all()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|i| i.created_at.is_some()));
        let unsolved = store
            .list_issues(&ListFilter {
                status: StatusFilter::Unsolved,
            })
            .await
            .unwrap();
        assert_eq!(unsolved.len(), 1);
        assert_eq!(unsolved[0].id, "i-1");
    }

    #[tokio::test]
    async fn identity_role_comes_from_profile() {
        let store = RemoteStore::new(FakeApi::signed_in("authority"));
        let identity = store.current_identity().await.unwrap().unwrap();
        assert_eq!(identity.role, Role::Authority);
        assert_eq!(identity.display_name.as_deref(), Some("asha"));
        assert!(
            RemoteStore::new(FakeApi::default())
                .current_identity()
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn delete_is_unsupported() {
        let store = RemoteStore::new(FakeApi::signed_in("authority"));
        let err = store.delete_issue("i-1").await.unwrap_err();
        assert!(matches!(
            err,
            CivicError::Unsupported {
                backend: "remote",
                ..
            }
        ));
    }
}
