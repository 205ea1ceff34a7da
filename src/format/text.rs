//! Plain text formatting for terminal output.

use crate::model::Issue;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Status markers.
pub mod icons {
    /// Unsolved issue.
    pub const OPEN: &str = "○";
    /// Solved issue.
    pub const SOLVED: &str = "✓";
}

/// Longest description shown on a list line, in characters.
pub const DESCRIPTION_WIDTH: usize = 60;

#[must_use]
pub const fn format_status_icon(solved: bool) -> &'static str {
    if solved { icons::SOLVED } else { icons::OPEN }
}

/// Truncate to `max` display columns, appending `…` when shortened.
///
/// Wide characters (CJK, emoji) count as two columns.
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    if UnicodeWidthStr::width(text) <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }

    let budget = max - 1;
    let mut width = 0;
    let mut out = String::new();
    for c in text.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw > budget {
            break;
        }
        width += cw;
        out.push(c);
    }
    out.push('…');
    out
}

/// One list line: status, votes, id, description, address and tags.
#[must_use]
pub fn format_issue_line(issue: &Issue) -> String {
    let mut line = format!(
        "{} ▲{:<3} {}  {} @ {}",
        format_status_icon(issue.solved),
        issue.upvote_count,
        issue.id,
        truncate(&issue.description, DESCRIPTION_WIDTH),
        issue.address,
    );
    if !issue.tags.is_empty() {
        line.push_str(" [");
        line.push_str(&issue.tags.as_slice().join(", "));
        line.push(']');
    }
    line
}

/// Multi-line detail block for a single issue.
#[must_use]
pub fn format_issue_details(issue: &Issue) -> String {
    let mut out = format!(
        "{} {}\n  {}\n  Address:  {}\n  Upvotes:  {}\n",
        format_status_icon(issue.solved),
        issue.id,
        issue.description,
        issue.address,
        issue.upvote_count,
    );
    if !issue.tags.is_empty() {
        out.push_str(&format!("  Tags:     {}\n", issue.tags));
    }
    if let Some(created_at) = issue.created_at {
        out.push_str(&format!("  Created:  {}\n", created_at.format("%Y-%m-%d %H:%M UTC")));
    }
    if !issue.created_by.is_empty() {
        out.push_str(&format!("  By:       {}\n", issue.created_by));
    }
    if let Some(image) = &issue.image_ref {
        out.push_str(&format!("  Image:    {image}\n"));
    }
    out
}
