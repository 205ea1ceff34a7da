use super::refresh;
use crate::error::{CivicError, Result};
use crate::model::{Created, Issue, IssueDraft};
use crate::storage::{IssueStore, ListFilter};
use crate::validation::DraftValidator;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Where a controller is in its submit cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SubmitPhase {
    Idle,
    /// A create is in flight under `nonce`.
    Submitting { nonce: String },
    /// The last attempt failed. A new submit is accepted and gets a new nonce.
    Failed { reason: String },
}

/// A finished submission.
///
/// The follow-up list refresh is reported separately: a failed refresh does not
/// undo or hide a successful create.
#[derive(Debug)]
pub struct Submitted {
    pub created: Created,
    pub feed: Result<Vec<Issue>>,
}

/// Guards one UI instance against double submission.
///
/// At most one create is in flight per controller. Each attempt mints a fresh
/// nonce; a failed attempt's nonce is discarded, never reused.
pub struct SubmissionController {
    store: Arc<dyn IssueStore>,
    phase: Mutex<SubmitPhase>,
}

impl std::fmt::Debug for SubmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionController")
            .field("backend", &self.store.backend_name())
            .field("phase", &self.phase())
            .finish()
    }
}

/// Resets the phase if the submit future is dropped mid-flight.
struct InFlight<'a> {
    controller: &'a SubmissionController,
    nonce: String,
    done: bool,
}

impl InFlight<'_> {
    fn finish(mut self, next: SubmitPhase) {
        self.controller.set_phase_if_current(&self.nonce, next);
        self.done = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.controller
                .set_phase_if_current(&self.nonce, SubmitPhase::Idle);
        }
    }
}

impl SubmissionController {
    #[must_use]
    pub fn new(store: Arc<dyn IssueStore>) -> Self {
        Self {
            store,
            phase: Mutex::new(SubmitPhase::Idle),
        }
    }

    #[must_use]
    pub fn phase(&self) -> SubmitPhase {
        self.lock_phase().clone()
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        matches!(*self.lock_phase(), SubmitPhase::Submitting { .. })
    }

    fn lock_phase(&self) -> MutexGuard<'_, SubmitPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase_if_current(&self, nonce: &str, next: SubmitPhase) {
        let mut phase = self.lock_phase();
        if matches!(&*phase, SubmitPhase::Submitting { nonce: current } if current == nonce) {
            *phase = next;
        }
    }

    fn begin(&self) -> Result<InFlight<'_>> {
        let mut phase = self.lock_phase();
        if let SubmitPhase::Submitting { nonce } = &*phase {
            debug!(%nonce, "Rejected re-entrant submit");
            return Err(CivicError::SubmissionInFlight);
        }
        let nonce = Uuid::new_v4().to_string();
        *phase = SubmitPhase::Submitting {
            nonce: nonce.clone(),
        };
        Ok(InFlight {
            controller: self,
            nonce,
            done: false,
        })
    }

    /// Validate and submit a draft, then refresh the list.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad draft, `SubmissionInFlight` while
    /// another submit is running, or the backend's error for the create.
    pub async fn submit(&self, draft: IssueDraft) -> Result<Submitted> {
        DraftValidator::check(&draft)?;
        let in_flight = self.begin()?;
        let nonce = in_flight.nonce.clone();
        debug!(%nonce, "Submitting issue");

        match self.store.create_issue(draft.into_new_issue(&nonce)).await {
            Ok(created) => {
                in_flight.finish(SubmitPhase::Idle);
                for warning in &created.warnings {
                    warn!(id = %created.issue.id, %warning, "Issue created with warning");
                }
                info!(id = %created.issue.id, "Issue submitted");
                let feed = refresh(self.store.as_ref(), &ListFilter::all()).await;
                if let Err(e) = &feed {
                    warn!(error = %e, "List refresh after submit failed");
                }
                Ok(Submitted { created, feed })
            }
            Err(e) => {
                warn!(error = %e, %nonce, "Submission failed; nonce discarded");
                in_flight.finish(SubmitPhase::Failed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }
}
