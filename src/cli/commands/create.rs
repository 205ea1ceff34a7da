//! Create command implementation.

use super::CommandContext;
use crate::cli::CreateArgs;
use crate::controller::SubmissionController;
use crate::error::{CivicError, Result};
use crate::format::format_issue_details;
use crate::model::{ImagePayload, IssueDraft, TagSet};
use std::path::Path;
use tracing::warn;

/// Guess a content type from the file extension.
#[must_use]
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Read an image file into a payload.
///
/// # Errors
///
/// Returns a validation error if the file cannot be read.
pub fn load_image(path: &Path) -> Result<ImagePayload> {
    let bytes = std::fs::read(path).map_err(|e| {
        CivicError::validation("image", format!("cannot read '{}': {e}", path.display()))
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(ImagePayload {
        file_name,
        content_type: content_type_for(path).to_string(),
        bytes,
    })
}

/// Build a draft from CLI arguments.
///
/// # Errors
///
/// Returns an error if the image cannot be read.
pub fn build_draft(args: &CreateArgs) -> Result<IssueDraft> {
    let mut tags = TagSet::new();
    for input in &args.tags {
        tags.extend_from_input(input);
    }
    let image = args.image.as_deref().map(load_image).transpose()?;
    Ok(IssueDraft {
        description: args.description.clone(),
        address: args.address.clone(),
        tags,
        image,
    })
}

/// Execute the create command.
///
/// # Errors
///
/// Returns an error if the draft is invalid or the backend fails.
pub async fn execute(args: &CreateArgs, ctx: &CommandContext) -> Result<()> {
    let draft = build_draft(args)?;
    let controller = SubmissionController::new(ctx.store());
    let submitted = controller.submit(draft).await?;
    let created = submitted.created;

    if ctx.json {
        return ctx.print_json(&created);
    }
    for warning in &created.warnings {
        eprintln!("Warning: {warning}");
    }
    ctx.say(format!("Created issue {}", created.issue.id));
    ctx.say(format_issue_details(&created.issue).trim_end());
    match submitted.feed {
        Ok(feed) => ctx.say(format!("{} issues in feed", feed.len())),
        Err(e) => warn!(error = %e, "Could not refresh the feed"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn content_types() {
        assert_eq!(content_type_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a.png")), "image/png");
        assert_eq!(content_type_for(Path::new("notes.pdf")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn draft_merges_repeated_tag_flags() {
        let args = CreateArgs {
            description: "Pothole".to_string(),
            address: "Main St".to_string(),
            tags: vec!["road, Safety".to_string(), "ROAD lights".to_string()],
            image: None,
        };
        let draft = build_draft(&args).unwrap();
        assert_eq!(
            draft.tags.as_slice(),
            &["road".to_string(), "Safety".to_string(), "lights".to_string()]
        );
    }

    #[test]
    fn draft_reads_image() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hole.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        let args = CreateArgs {
            description: "Pothole".to_string(),
            address: "Main St".to_string(),
            tags: vec![],
            image: Some(path),
        };
        let image = build_draft(&args).unwrap().image.unwrap();
        assert_eq!(image.file_name, "hole.png");
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn missing_image_is_validation_error() {
        let args = CreateArgs {
            description: "Pothole".to_string(),
            address: "Main St".to_string(),
            tags: vec![],
            image: Some("/definitely/not/here.png".into()),
        };
        assert!(matches!(
            build_draft(&args),
            Err(CivicError::Validation { .. })
        ));
    }
}
