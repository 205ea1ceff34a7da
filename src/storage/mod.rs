//! Storage backends for `civicwatch`.
//!
//! Two interchangeable implementations sit behind [`IssueStore`]:
//!
//! - [`LocalStore`]: single-writer `SQLite` database plus an image directory.
//! - [`RemoteStore`]: networked multi-writer store reached through a
//!   PostgREST-style HTTP API ([`PostgrestClient`]).
//!
//! Both enforce nonce idempotency and vote de-duplication as
//! insert-or-fetch against a uniqueness constraint. Neither caches results.

pub mod images;
pub mod local;
pub mod remote;
pub mod schema;

pub use images::{DirImageStore, ImageStore};
pub use local::{LocalStore, LocalStoreOptions};
pub use remote::{PostgrestClient, RemoteApi, RemoteError, RemoteStore};

use crate::error::{CivicError, Result};
use crate::model::{Created, Identity, Issue, NewIssue, VoteOutcome};
use crate::query::StatusFilter;
use async_trait::async_trait;

/// Optional server-side narrowing for `list_issues`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub status: StatusFilter,
}

impl ListFilter {
    #[must_use]
    pub const fn all() -> Self {
        Self {
            status: StatusFilter::All,
        }
    }
}

/// The capability contract shared by every backend.
///
/// All operations are async and suspend the caller until the backend
/// responds. No operation is retried internally.
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Short backend name used in logs and error messages.
    fn backend_name(&self) -> &'static str;

    /// All issues visible to the caller. Ordering is backend-defined.
    async fn list_issues(&self, filter: &ListFilter) -> Result<Vec<Issue>>;

    /// Create an issue, idempotently on `new_issue.client_nonce`.
    ///
    /// A second call with the same nonce returns the first call's issue. An
    /// image that cannot be stored yields a warning, not an error.
    async fn create_issue(&self, new_issue: NewIssue) -> Result<Created>;

    /// Add the caller's vote. Repeated votes are success without effect.
    async fn upvote_issue(&self, id: &str) -> Result<VoteOutcome>;

    /// Set the solved state to `solved`. Requires the authority role.
    async fn set_solved(&self, id: &str, solved: bool) -> Result<Issue>;

    /// The calling user, or `None` when anonymous.
    async fn current_identity(&self) -> Result<Option<Identity>>;

    /// Remove an issue. Only some backends offer this.
    async fn delete_issue(&self, id: &str) -> Result<()> {
        let _ = id;
        Err(CivicError::Unsupported {
            operation: "delete",
            backend: self.backend_name(),
        })
    }
}
