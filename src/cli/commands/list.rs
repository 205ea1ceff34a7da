//! List command implementation.
//!
//! Fetches the full list (with the status filter pushed down), then runs the
//! feed query for text, tag, ownership and sort.

use super::CommandContext;
use crate::cli::ListArgs;
use crate::error::Result;
use crate::format::format_issue_line;
use crate::model::Issue;
use crate::query::{self, FeedQuery, SortBy, StatusFilter};
use crate::storage::{IssueStore, ListFilter};

/// Build the feed query from CLI arguments.
///
/// # Errors
///
/// Returns a validation error for an unknown status or sort name.
pub fn build_query(args: &ListArgs, viewer: Option<String>) -> Result<FeedQuery> {
    Ok(FeedQuery {
        text: args.search.clone().unwrap_or_default(),
        status: args.status.parse::<StatusFilter>()?,
        tag: args.tag.clone().unwrap_or_default(),
        sort: args.sort.parse::<SortBy>()?,
        my_only: args.mine,
        viewer,
    })
}

/// Fetch and filter issues for `args`.
///
/// # Errors
///
/// Returns an error if the query is invalid or the backend fails.
pub async fn fetch(ctx: &CommandContext, args: &ListArgs) -> Result<Vec<Issue>> {
    let viewer = if args.mine {
        ctx.provider.current_identity().await?.map(|identity| identity.id)
    } else {
        None
    };
    let feed_query = build_query(args, viewer)?;
    let issues = ctx
        .provider
        .list_issues(&ListFilter {
            status: feed_query.status,
        })
        .await?;
    let mut shown = query::apply(&issues, &feed_query);
    if args.limit > 0 {
        shown.truncate(args.limit);
    }
    Ok(shown)
}

/// Execute the list command.
///
/// # Errors
///
/// Returns an error if the query is invalid or the backend fails.
pub async fn execute(args: &ListArgs, ctx: &CommandContext) -> Result<()> {
    let issues = fetch(ctx, args).await?;

    if ctx.json {
        return ctx.print_json(&issues);
    }
    if issues.is_empty() {
        ctx.say("No issues found.");
        return Ok(());
    }
    for issue in &issues {
        ctx.say(format_issue_line(issue));
    }
    Ok(())
}
