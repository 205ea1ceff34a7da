//! Mutation flows.
//!
//! Every controller follows the same shape: perform one backend mutation, then
//! refetch the full list. Nothing is patched optimistically, so what the caller
//! shows is always the backend's own view.

mod status;
mod submission;
mod vote;

pub use status::{StatusChanged, StatusController};
pub use submission::{SubmissionController, SubmitPhase, Submitted};
pub use vote::{VoteController, Voted};

use crate::error::Result;
use crate::model::Issue;
use crate::storage::{IssueStore, ListFilter};
use tracing::debug;

async fn refresh(store: &dyn IssueStore, filter: &ListFilter) -> Result<Vec<Issue>> {
    let issues = store.list_issues(filter).await?;
    debug!(count = issues.len(), "Refreshed issue list");
    Ok(issues)
}
