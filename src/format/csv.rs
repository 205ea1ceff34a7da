//! CSV export of the normalized issue list.
//!
//! Quoting follows RFC 4180: fields containing commas, quotes or line breaks
//! are wrapped in double quotes with inner quotes doubled. Tags are joined
//! with `|` so they stay in one column.

use crate::model::Issue;
use std::io::{self, Write};

/// Export columns, in order.
pub const FIELDS: &[&str] = &[
    "id",
    "description",
    "address",
    "tags",
    "solved",
    "upvotes",
    "createdAt",
    "submitterId",
];

/// Escape a CSV field value.
#[must_use]
pub fn escape_field(value: &str) -> String {
    let needs_quoting = value.contains(',')
        || value.contains('"')
        || value.contains('\n')
        || value.contains('\r');

    if needs_quoting {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

/// Get a field value from an issue by column name.
#[must_use]
pub fn get_field_value(issue: &Issue, field: &str) -> String {
    match field {
        "id" => issue.id.clone(),
        "description" => issue.description.clone(),
        "address" => issue.address.clone(),
        "tags" => issue.tags.as_slice().join("|"),
        "solved" => issue.solved.to_string(),
        "upvotes" => issue.upvote_count.to_string(),
        "createdAt" => issue
            .created_at
            .map_or_else(String::new, |dt| dt.to_rfc3339()),
        "submitterId" => issue.created_by.clone(),
        _ => String::new(),
    }
}

/// Format a single issue as a CSV row.
#[must_use]
pub fn format_issue_row(issue: &Issue) -> String {
    FIELDS
        .iter()
        .map(|&field| escape_field(&get_field_value(issue, field)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Write issues as CSV to the given writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_csv<W: Write>(writer: &mut W, issues: &[Issue]) -> io::Result<()> {
    writeln!(writer, "{}", FIELDS.join(","))?;
    for issue in issues {
        writeln!(writer, "{}", format_issue_row(issue))?;
    }
    Ok(())
}

/// Format issues as a complete CSV string.
#[must_use]
pub fn format_csv(issues: &[Issue]) -> String {
    let mut out = FIELDS.join(",");
    out.push('\n');
    for issue in issues {
        out.push_str(&format_issue_row(issue));
        out.push('\n');
    }
    out
}
