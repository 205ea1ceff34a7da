use super::refresh;
use crate::error::Result;
use crate::model::{Issue, VoteOutcome};
use crate::storage::{IssueStore, ListFilter};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a vote: the backend's verdict and the refetched list.
///
/// A failed refresh does not turn a recorded vote into an error.
#[derive(Debug)]
pub struct Voted {
    pub outcome: VoteOutcome,
    pub feed: Result<Vec<Issue>>,
}

/// Upvotes and refreshes. Holds no state between calls.
pub struct VoteController {
    store: Arc<dyn IssueStore>,
    refresh_filter: ListFilter,
}

impl VoteController {
    #[must_use]
    pub fn new(store: Arc<dyn IssueStore>) -> Self {
        Self {
            store,
            refresh_filter: ListFilter::all(),
        }
    }

    /// Vote for `id`, then refetch. A repeated vote is ordinary success.
    ///
    /// # Errors
    ///
    /// Returns the backend's error for the vote.
    pub async fn upvote(&self, id: &str) -> Result<Voted> {
        let outcome = self.store.upvote_issue(id).await?;
        debug!(id, ?outcome, "Vote recorded");
        let feed = refresh(self.store.as_ref(), &self.refresh_filter).await;
        if let Err(e) = &feed {
            warn!(error = %e, id, "List refresh after vote failed");
        }
        Ok(Voted { outcome, feed })
    }
}
