//! Tags command implementation.

use super::CommandContext;
use crate::error::Result;
use crate::query::all_tags;
use crate::storage::{IssueStore, ListFilter};

/// Execute the tags command.
///
/// # Errors
///
/// Returns an error if the backend fails.
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let issues = ctx.provider.list_issues(&ListFilter::all()).await?;
    let tags = all_tags(&issues);

    if ctx.json {
        return ctx.print_json(&tags);
    }
    for tag in &tags {
        ctx.say(tag);
    }
    Ok(())
}
