//! Feed query engine.
//!
//! Turns a raw issue collection into the list the user sees. Filters run in a
//! fixed order (text, status, tag, ownership) and the sort is stable, so ties
//! keep the order in which the backend returned them.

use crate::error::CivicError;
use crate::model::Issue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Solved-state filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Solved,
    Unsolved,
}

impl StatusFilter {
    #[must_use]
    pub const fn matches(self, solved: bool) -> bool {
        match self {
            Self::All => true,
            Self::Solved => solved,
            Self::Unsolved => !solved,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Solved => "solved",
            Self::Unsolved => "unsolved",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            "solved" => Ok(Self::Solved),
            "unsolved" | "open" => Ok(Self::Unsolved),
            other => Err(CivicError::validation(
                "status",
                format!("unknown status '{other}' (use all, solved or unsolved)"),
            )),
        }
    }
}

/// Sort order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Upvotes descending, newest first among equal counts.
    #[default]
    Trending,
    /// `created_at` descending.
    Newest,
    /// Upvotes descending, nothing else.
    MostUpvoted,
}

impl SortBy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trending => "trending",
            Self::Newest => "newest",
            Self::MostUpvoted => "most_upvoted",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "trending" | "" => Ok(Self::Trending),
            "newest" => Ok(Self::Newest),
            "most_upvoted" | "upvotes" => Ok(Self::MostUpvoted),
            other => Err(CivicError::validation(
                "sort",
                format!("unknown sort '{other}' (use trending, newest or most_upvoted)"),
            )),
        }
    }
}

/// What the viewer asked to see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
    pub text: String,
    pub status: StatusFilter,
    pub tag: String,
    pub sort: SortBy,
    /// Only the viewer's own reports. Ignored without a viewer.
    pub my_only: bool,
    pub viewer: Option<String>,
}

impl FeedQuery {
    fn keep(&self, issue: &Issue, text: Option<&str>, tag: Option<&str>) -> bool {
        if let Some(needle) = text {
            let hit = issue.description.to_lowercase().contains(needle)
                || issue.address.to_lowercase().contains(needle)
                || issue.tags.any_contains_lower(needle);
            if !hit {
                return false;
            }
        }
        if !self.status.matches(issue.solved) {
            return false;
        }
        if let Some(tag) = tag {
            if !issue.tags.contains(tag) {
                return false;
            }
        }
        if self.my_only {
            if let Some(viewer) = self.viewer.as_deref() {
                if issue.created_by != viewer {
                    return false;
                }
            }
        }
        true
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

/// Newer first; a missing timestamp sorts after every present one.
fn newest_first(a: &Issue, b: &Issue) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Filter and order `issues` for display. The input is left untouched.
#[must_use]
pub fn apply(issues: &[Issue], query: &FeedQuery) -> Vec<Issue> {
    let text = non_blank(&query.text).map(str::to_lowercase);
    let tag = non_blank(&query.tag);

    let mut out: Vec<Issue> = issues
        .iter()
        .filter(|issue| query.keep(issue, text.as_deref(), tag))
        .cloned()
        .collect();

    // `sort_by` is stable.
    match query.sort {
        SortBy::Trending => out.sort_by(|a, b| {
            b.upvote_count
                .cmp(&a.upvote_count)
                .then_with(|| newest_first(a, b))
        }),
        SortBy::Newest => out.sort_by(newest_first),
        SortBy::MostUpvoted => out.sort_by(|a, b| b.upvote_count.cmp(&a.upvote_count)),
    }
    out
}

/// Distinct lower-cased tags across `issues`, sorted.
#[must_use]
pub fn all_tags(issues: &[Issue]) -> Vec<String> {
    issues
        .iter()
        .flat_map(|issue| issue.tags.iter())
        .map(str::to_lowercase)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Issue totals split by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub solved: usize,
    pub unsolved: usize,
}

/// Count `issues` by solved state.
#[must_use]
pub fn status_counts(issues: &[Issue]) -> StatusCounts {
    let solved = issues.iter().filter(|issue| issue.solved).count();
    StatusCounts {
        total: issues.len(),
        solved,
        unsolved: issues.len() - solved,
    }
}
