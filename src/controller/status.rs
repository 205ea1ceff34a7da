use super::refresh;
use crate::error::Result;
use crate::model::Issue;
use crate::storage::{IssueStore, ListFilter};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a status change: the updated issue and the refetched list.
///
/// A failed refresh does not turn an applied change into an error.
#[derive(Debug)]
pub struct StatusChanged {
    pub issue: Issue,
    pub feed: Result<Vec<Issue>>,
}

/// Authority flow for marking issues solved or unsolved.
pub struct StatusController {
    store: Arc<dyn IssueStore>,
    refresh_filter: ListFilter,
}

impl StatusController {
    #[must_use]
    pub fn new(store: Arc<dyn IssueStore>) -> Self {
        Self {
            store,
            refresh_filter: ListFilter::all(),
        }
    }

    /// Set `id` to `solved`, then refetch.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for non-authority callers, or the backend's error.
    pub async fn set_solved(&self, id: &str, solved: bool) -> Result<StatusChanged> {
        let issue = self.store.set_solved(id, solved).await?;
        info!(id, solved, "Status updated");
        let feed = refresh(self.store.as_ref(), &self.refresh_filter).await;
        if let Err(e) = &feed {
            warn!(error = %e, id, "List refresh after status change failed");
        }
        Ok(StatusChanged { issue, feed })
    }
}
