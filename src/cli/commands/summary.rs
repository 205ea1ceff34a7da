//! Summary command implementation.

use super::CommandContext;
use crate::error::Result;
use crate::query::status_counts;
use crate::storage::{IssueStore, ListFilter};

/// Execute the summary command.
///
/// # Errors
///
/// Returns an error if the backend fails.
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let issues = ctx.provider.list_issues(&ListFilter::all()).await?;
    let counts = status_counts(&issues);

    if ctx.json {
        return ctx.print_json(&counts);
    }
    ctx.say(format!("Total: {}", counts.total));
    ctx.say(format!("Solved: {}", counts.solved));
    ctx.say(format!("Unsolved: {}", counts.unsolved));
    Ok(())
}
