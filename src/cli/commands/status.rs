//! Solve / unsolve command implementation.

use super::CommandContext;
use crate::controller::StatusController;
use crate::error::Result;

/// Execute `solve` (`solved = true`) or `unsolve` (`solved = false`).
///
/// # Errors
///
/// Returns `Unauthorized` for non-authority callers, or the backend's error.
pub async fn execute(id: &str, solved: bool, ctx: &CommandContext) -> Result<()> {
    let changed = StatusController::new(ctx.store())
        .set_solved(id, solved)
        .await?;

    if ctx.json {
        return ctx.print_json(&changed.issue);
    }
    let state = if changed.issue.solved {
        "solved"
    } else {
        "unsolved"
    };
    ctx.say(format!("Marked {} {state}", changed.issue.id));
    Ok(())
}
