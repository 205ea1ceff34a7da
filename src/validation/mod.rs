//! Validation helpers for `civicwatch`.
//!
//! These routines check drafts before a submission is started and return
//! structured validation errors without touching any backend.

use crate::error::{CivicError, ValidationError};
use crate::model::IssueDraft;

/// Longest accepted description, in bytes.
pub const MAX_DESCRIPTION_LEN: usize = 4_000;
/// Longest accepted address, in bytes.
pub const MAX_ADDRESS_LEN: usize = 500;
/// Longest accepted single tag, in characters.
pub const MAX_TAG_LEN: usize = 40;

/// Validates drafts before they become submissions.
pub struct DraftValidator;

impl DraftValidator {
    /// Validate a draft and return all validation errors found.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` if any validation rules are violated.
    pub fn validate(draft: &IssueDraft) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        // Description and address: required after trimming.
        if draft.description.trim().is_empty() {
            errors.push(ValidationError::new("description", "cannot be empty"));
        }
        if draft.description.len() > MAX_DESCRIPTION_LEN {
            errors.push(ValidationError::new(
                "description",
                format!("exceeds {MAX_DESCRIPTION_LEN} bytes"),
            ));
        }
        if draft.address.trim().is_empty() {
            errors.push(ValidationError::new("address", "cannot be empty"));
        }
        if draft.address.len() > MAX_ADDRESS_LEN {
            errors.push(ValidationError::new(
                "address",
                format!("exceeds {MAX_ADDRESS_LEN} bytes"),
            ));
        }

        for tag in draft.tags.iter() {
            if tag.chars().count() > MAX_TAG_LEN {
                errors.push(ValidationError::new(
                    "tags",
                    format!("tag '{tag}' exceeds {MAX_TAG_LEN} characters"),
                ));
            }
        }

        if let Some(image) = &draft.image {
            if !image.is_image() {
                errors.push(ValidationError::new(
                    "image",
                    format!("'{}' is not an image file", image.file_name),
                ));
            }
            if image.bytes.is_empty() {
                errors.push(ValidationError::new("image", "file is empty"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and convert failures into a `CivicError`.
    ///
    /// # Errors
    ///
    /// Returns `CivicError::Validation` (or `ValidationErrors`) on failure.
    pub fn check(draft: &IssueDraft) -> crate::Result<()> {
        Self::validate(draft).map_err(CivicError::from_validation_errors)
    }
}
