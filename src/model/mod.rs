//! Core data types for `civicwatch`.
//!
//! This module defines the fundamental types used throughout the application:
//! - `Issue` - A reported infrastructure problem
//! - `TagSet` - Case-insensitive, case-preserving labels
//! - `Identity` / `Role` - Who is calling and what they may do
//! - `IssueDraft` / `NewIssue` - Creation payloads before and after nonce minting
//! - `Created` / `VoteOutcome` - Mutation results

mod normalize;

pub use normalize::{
    RawId, RawTimestamp, RemoteIssueRow, UpvoteAggregate, normalize_remote, parse_timestamp,
};

use crate::error::{CivicError, Warning};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Labels attached to an issue.
///
/// Matching is case-insensitive, display keeps the first spelling seen, and
/// entries that differ only in case collapse into one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagSet(Vec<String>);

impl TagSet {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Parse free-form tag input: split on whitespace and commas, drop blanks.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut tags = Self::new();
        tags.extend_from_input(input);
        tags
    }

    /// Merge free-form tag input into the set.
    pub fn extend_from_input(&mut self, input: &str) {
        for fragment in input.split(|c: char| c.is_whitespace() || c == ',') {
            self.insert(fragment);
        }
    }

    /// Insert a tag. Returns `false` for blanks and case-insensitive repeats.
    pub fn insert(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    /// Case-insensitive exact membership.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        let needle = tag.trim().to_lowercase();
        self.0.iter().any(|t| t.to_lowercase() == needle)
    }

    /// Case-insensitive substring match against any tag. `needle` must already
    /// be lower-cased.
    #[must_use]
    pub fn any_contains_lower(&self, needle: &str) -> bool {
        self.0.iter().any(|t| t.to_lowercase().contains(needle))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags = Self::new();
        for tag in iter {
            tags.insert(tag.as_ref());
        }
        tags
    }
}

impl<'de> Deserialize<'de> for TagSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<Vec<String>>::deserialize(deserializer)?;
        Ok(raw.unwrap_or_default().into_iter().collect())
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

/// A reported issue in canonical form.
///
/// Every backend representation is normalized into this shape before the
/// rest of the crate sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Backend-assigned identifier.
    pub id: String,

    pub description: String,

    pub address: String,

    #[serde(default)]
    pub tags: TagSet,

    /// Opaque reference to the stored image, if any.
    #[serde(default)]
    pub image_ref: Option<String>,

    #[serde(default)]
    pub solved: bool,

    #[serde(default)]
    pub upvote_count: u64,

    /// Known voters. `None` when the backend does not expose them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voters: Option<BTreeSet<String>>,

    /// Persistence timestamp. `None` only when a durable backend omitted it.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Submitter identity; empty when no identity system is active.
    #[serde(default)]
    pub created_by: String,

    #[serde(default, skip_serializing)]
    pub client_nonce: Option<String>,
}

impl Issue {
    /// Has `voter` already been counted? `None` when the backend hides voters.
    #[must_use]
    pub fn has_voted(&self, voter: &str) -> Option<bool> {
        self.voters.as_ref().map(|voters| voters.contains(voter))
    }
}

/// Caller role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Citizen,
    /// May change the solved status of any issue.
    Authority,
}

impl Role {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Citizen => "citizen",
            Self::Authority => "authority",
        }
    }

    #[must_use]
    pub const fn can_set_status(&self) -> bool {
        matches!(self, Self::Authority)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "citizen" | "user" | "" => Ok(Self::Citizen),
            "authority" | "admin" => Ok(Self::Authority),
            other => Err(CivicError::validation(
                "role",
                format!("unknown role '{other}' (use citizen or authority)"),
            )),
        }
    }
}

/// The calling user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// Image bytes attached to a draft.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    /// Lower-cased file extension used for the stored object, `jpg` by default.
    #[must_use]
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.trim().to_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "jpg".to_string())
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.content_type.trim().to_lowercase().starts_with("image/")
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// What the user filled in, before a nonce is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueDraft {
    pub description: String,
    pub address: String,
    pub tags: TagSet,
    pub image: Option<ImagePayload>,
}

impl IssueDraft {
    /// Trimmed copy with the idempotency key attached.
    #[must_use]
    pub fn into_new_issue(self, client_nonce: impl Into<String>) -> NewIssue {
        NewIssue {
            description: self.description.trim().to_string(),
            address: self.address.trim().to_string(),
            tags: self.tags,
            image: self.image,
            client_nonce: client_nonce.into(),
        }
    }
}

/// Payload handed to `create_issue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub description: String,
    pub address: String,
    pub tags: TagSet,
    pub image: Option<ImagePayload>,
    /// Idempotency key; at most one issue exists per nonce.
    pub client_nonce: String,
}

/// A successful creation, possibly with recoverable warnings.
#[derive(Debug, Clone, Serialize)]
pub struct Created {
    pub issue: Issue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl Created {
    #[must_use]
    pub const fn new(issue: Issue) -> Self {
        Self {
            issue,
            warnings: Vec::new(),
        }
    }
}

/// Result of an upvote. Both variants are success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    Counted,
    /// The caller had already voted; the count is unchanged.
    AlreadyCounted,
}
