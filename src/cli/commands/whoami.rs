//! Whoami command implementation.

use super::CommandContext;
use crate::error::Result;
use crate::storage::IssueStore;

/// Execute the whoami command.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let identity = ctx.provider.current_identity().await?;

    if ctx.json {
        return ctx.print_json(&identity);
    }
    match identity {
        Some(identity) => {
            let name = identity
                .display_name
                .as_deref()
                .map(|n| format!(" ({n})"))
                .unwrap_or_default();
            ctx.say(format!(
                "{}{name} [{}] via {}",
                identity.id,
                identity.role,
                ctx.provider.backend_name()
            ));
        }
        None => ctx.say(format!("anonymous via {}", ctx.provider.backend_name())),
    }
    Ok(())
}
