//! Delete command implementation.
//!
//! Only the local backend offers deletion; the remote backend reports the
//! operation as unsupported.

use super::CommandContext;
use crate::error::Result;
use crate::storage::IssueStore;
use serde_json::json;
use tracing::info;

/// Execute the delete command.
///
/// # Errors
///
/// Returns `Unsupported` on the remote backend, `Unauthorized` for
/// non-authority callers, or `IssueNotFound`.
pub async fn execute(id: &str, ctx: &CommandContext) -> Result<()> {
    ctx.provider.delete_issue(id).await?;
    info!(id, "Issue deleted");

    if ctx.json {
        return ctx.print_json(&json!({ "deleted": id }));
    }
    ctx.say(format!("Deleted {id}"));
    Ok(())
}
