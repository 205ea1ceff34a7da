//! CSV export command implementation.

use super::CommandContext;
use crate::cli::ExportArgs;
use crate::error::Result;
use crate::format::csv;
use crate::storage::{IssueStore, ListFilter};
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::info;

/// Execute the export command. Authority only.
///
/// # Errors
///
/// Returns an error if the caller is not an authority, the backend fails, or
/// the output cannot be written.
pub async fn execute(args: &ExportArgs, ctx: &CommandContext) -> Result<()> {
    let identity = ctx.require_authority("export issues").await?;
    let issues = ctx.provider.list_issues(&ListFilter::all()).await?;

    match &args.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            csv::write_csv(&mut writer, &issues)?;
            writer.flush()?;
            info!(
                count = issues.len(),
                path = %path.display(),
                actor = %identity.id,
                "Exported issues"
            );
            ctx.say(format!(
                "Exported {} issues to {}",
                issues.len(),
                path.display()
            ));
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            csv::write_csv(&mut lock, &issues)?;
        }
    }
    Ok(())
}
