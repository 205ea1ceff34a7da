//! Normalization of backend rows into the canonical [`Issue`].
//!
//! Rows from the remote store use snake_case names (`image_url`,
//! `created_at`, `created_by`) and carry the upvote count as a relational
//! aggregate (`uv: [{count: N}]`). Timestamps show up as RFC 3339 strings,
//! Postgres text timestamps, or epoch milliseconds.

use super::{Issue, TagSet};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Timestamp as found on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    Text(String),
}

/// Row identifiers are usually UUID strings, occasionally integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Int(i64),
    Text(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// One element of the `uv:issue_upvotes(count)` aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpvoteAggregate {
    #[serde(default)]
    pub count: i64,
}

/// An `issues` row as returned by the remote store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteIssueRow {
    pub id: Option<RawId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub tags: TagSet,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub solved: Option<bool>,
    #[serde(default)]
    pub created_at: Option<RawTimestamp>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub client_nonce: Option<String>,
    /// Relational aggregate present on list queries.
    #[serde(default)]
    pub uv: Option<Vec<UpvoteAggregate>>,
    /// Plain count column, used by RPC results.
    #[serde(default)]
    pub upvotes: Option<i64>,
}

/// Parse a wire timestamp. Returns `None` for anything unrecognizable.
#[must_use]
pub fn parse_timestamp(raw: &RawTimestamp) -> Option<DateTime<Utc>> {
    match raw {
        RawTimestamp::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
        RawTimestamp::Text(text) => {
            let text = text.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Some(dt.with_timezone(&Utc));
            }
            // Postgres text output: "2025-01-15 12:00:00.123+00"
            for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
                if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
                    return Some(dt.with_timezone(&Utc));
                }
            }
            for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
                    return Some(naive.and_utc());
                }
            }
            None
        }
    }
}

fn clamp_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

/// Normalize a remote row.
///
/// Missing optional fields get defaults. A missing or unparseable
/// `created_at` stays `None`: the row came from a durable store, so no
/// timestamp is invented for it. Voters are never exposed by this backend.
#[must_use]
pub fn normalize_remote(row: RemoteIssueRow) -> Issue {
    let id = row.id.map(RawId::into_string).unwrap_or_default();
    let created_at = row.created_at.as_ref().and_then(|raw| {
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            warn!(issue_id = %id, ?raw, "Unparseable created_at on remote row");
        }
        parsed
    });
    let upvote_count = row
        .uv
        .as_deref()
        .and_then(|uv| uv.first())
        .map(|agg| agg.count)
        .or(row.upvotes)
        .map_or(0, clamp_count);

    Issue {
        id,
        description: row.description.unwrap_or_default(),
        address: row.address.unwrap_or_default(),
        tags: row.tags,
        image_ref: row.image_url.filter(|url| !url.trim().is_empty()),
        solved: row.solved.unwrap_or(false),
        upvote_count,
        voters: None,
        created_at,
        created_by: row.created_by.unwrap_or_default(),
        client_nonce: row.client_nonce,
    }
}
