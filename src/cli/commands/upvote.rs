//! Upvote command implementation.

use super::CommandContext;
use crate::controller::VoteController;
use crate::error::Result;
use crate::model::VoteOutcome;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpvoteResult<'a> {
    id: &'a str,
    outcome: VoteOutcome,
    /// Count after the refresh; absent if the refresh failed or the issue
    /// dropped out of the list.
    upvote_count: Option<u64>,
}

/// Execute the upvote command.
///
/// # Errors
///
/// Returns an error if the caller is anonymous, the issue is missing, or the
/// backend fails.
pub async fn execute(id: &str, ctx: &CommandContext) -> Result<()> {
    let voted = VoteController::new(ctx.store()).upvote(id).await?;
    let upvote_count = voted
        .feed
        .as_ref()
        .ok()
        .and_then(|feed| feed.iter().find(|issue| issue.id == id))
        .map(|issue| issue.upvote_count);

    if ctx.json {
        return ctx.print_json(&UpvoteResult {
            id,
            outcome: voted.outcome,
            upvote_count,
        });
    }
    let verb = match voted.outcome {
        VoteOutcome::Counted => "Upvoted",
        VoteOutcome::AlreadyCounted => "Already upvoted",
    };
    match upvote_count {
        Some(count) => ctx.say(format!("{verb} {id} ({count} votes)")),
        None => ctx.say(format!("{verb} {id}")),
    }
    Ok(())
}
