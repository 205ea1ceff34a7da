//! Output formatting for `civicwatch`.
//!
//! Human-readable text lines for the terminal and CSV export. JSON output
//! is the serde form of the model types.

pub mod csv;
mod text;

pub use text::{
    DESCRIPTION_WIDTH, format_issue_details, format_issue_line, format_status_icon, icons,
    truncate,
};
