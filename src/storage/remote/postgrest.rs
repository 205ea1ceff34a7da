//! HTTP client for a PostgREST-compatible server with auth and object storage.

use super::{
    IMAGE_BUCKET, ISSUE_SELECT, IssueInsert, RemoteApi, RemoteError, RemoteSettings, RemoteUser,
};
use crate::error::{CivicError, Result};
use crate::model::{ImagePayload, RemoteIssueRow};
use crate::query::StatusFilter;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, trace};

const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Error body shared by `PostgREST`, auth and storage endpoints.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Profile {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

/// `reqwest`-backed [`RemoteApi`].
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
}

impl PostgrestClient {
    /// Build a client from validated settings.
    ///
    /// # Errors
    ///
    /// Returns `CivicError::Config` if the settings are incomplete or the HTTP
    /// client cannot be built.
    pub fn new(settings: &RemoteSettings) -> Result<Self> {
        let (base_url, anon_key) = settings.validated()?;
        let timeout = Duration::from_millis(settings.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CivicError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self::with_client(
            client,
            base_url,
            anon_key,
            settings
                .access_token
                .clone()
                .filter(|t| !t.trim().is_empty()),
        ))
    }

    /// Use an existing `reqwest::Client`.
    #[must_use]
    pub const fn with_client(
        client: Client,
        base_url: String,
        anon_key: String,
        access_token: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url,
            anon_key,
            access_token,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Public URL of an object in the image bucket.
    #[must_use]
    pub fn public_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/public/{IMAGE_BUCKET}/{path}", self.base_url)
    }

    fn rest(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {bearer}"))
    }

    async fn send(&self, request: RequestBuilder) -> std::result::Result<Response, RemoteError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let code = body.code.map(|c| match c {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        let message = body
            .message
            .or(body.msg)
            .or(body.error)
            .unwrap_or_else(|| text.clone());
        debug!(status, code = ?code, %message, "Remote request failed");
        Err(RemoteError::classify(status, code.as_deref(), &message))
    }

    async fn rows(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<Vec<RemoteIssueRow>, RemoteError> {
        self.send(request)
            .await?
            .json::<Vec<RemoteIssueRow>>()
            .await
            .map_err(|e| RemoteError::Transport(format!("malformed response: {e}")))
    }

    async fn select_one(
        &self,
        column: &str,
        value: &str,
    ) -> std::result::Result<Option<RemoteIssueRow>, RemoteError> {
        let filter = format!("eq.{value}");
        let request = self.client.get(self.rest("issues")).query(&[
            ("select", ISSUE_SELECT),
            (column, filter.as_str()),
            ("limit", "1"),
        ]);
        Ok(self.rows(request).await?.into_iter().next())
    }
}

#[async_trait]
impl RemoteApi for PostgrestClient {
    async fn current_user(&self) -> std::result::Result<Option<RemoteUser>, RemoteError> {
        if self.access_token.is_none() {
            return Ok(None);
        }
        let request = self.client.get(format!("{}/auth/v1/user", self.base_url));
        let user: AuthUser = match self.send(request).await {
            Ok(response) => response
                .json()
                .await
                .map_err(|e| RemoteError::Transport(format!("malformed user: {e}")))?,
            // An expired or revoked session is anonymous, not an error.
            Err(RemoteError::Unauthenticated) => return Ok(None),
            Err(e) => return Err(e),
        };

        let filter = format!("eq.{}", user.id);
        let request = self
            .client
            .get(self.rest("profiles"))
            .query(&[("select", "username,role"), ("id", filter.as_str())]);
        let profiles: Vec<Profile> = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Transport(format!("malformed profile: {e}")))?;
        let profile = profiles.into_iter().next();
        trace!(user = %user.id, has_profile = profile.is_some(), "Resolved remote user");
        Ok(Some(RemoteUser {
            id: user.id,
            username: profile.as_ref().and_then(|p| p.username.clone()),
            role: profile.and_then(|p| p.role),
        }))
    }

    async fn select_issues(
        &self,
        status: StatusFilter,
    ) -> std::result::Result<Vec<RemoteIssueRow>, RemoteError> {
        let mut request = self
            .client
            .get(self.rest("issues"))
            .query(&[("select", ISSUE_SELECT), ("order", "created_at.desc")]);
        match status {
            StatusFilter::All => {}
            StatusFilter::Solved => request = request.query(&[("solved", "eq.true")]),
            StatusFilter::Unsolved => request = request.query(&[("solved", "eq.false")]),
        }
        self.rows(request).await
    }

    async fn select_issue(
        &self,
        id: &str,
    ) -> std::result::Result<Option<RemoteIssueRow>, RemoteError> {
        self.select_one("id", id).await
    }

    async fn select_issue_by_nonce(
        &self,
        nonce: &str,
    ) -> std::result::Result<Option<RemoteIssueRow>, RemoteError> {
        self.select_one("client_nonce", nonce).await
    }

    async fn insert_issue(
        &self,
        row: &IssueInsert,
    ) -> std::result::Result<Option<RemoteIssueRow>, RemoteError> {
        let request = self
            .client
            .post(self.rest("issues"))
            .query(&[("on_conflict", "client_nonce"), ("select", ISSUE_SELECT)])
            .header("Prefer", "resolution=ignore-duplicates,return=representation")
            .json(&[row]);
        Ok(self.rows(request).await?.into_iter().next())
    }

    async fn insert_upvote(
        &self,
        issue_id: &str,
        user_id: &str,
    ) -> std::result::Result<(), RemoteError> {
        let request = self
            .client
            .post(self.rest("issue_upvotes"))
            .header("Prefer", "return=minimal")
            .json(&json!({ "issue_id": issue_id, "user_id": user_id }));
        self.send(request).await.map(|_| ())
    }

    async fn set_issue_solved(
        &self,
        issue_id: &str,
        solved: bool,
    ) -> std::result::Result<(), RemoteError> {
        let request = self
            .client
            .post(self.rest("rpc/set_issue_solved"))
            .json(&json!({ "p_issue_id": issue_id, "p_solved": solved }));
        self.send(request).await.map(|_| ())
    }

    async fn upload_image(
        &self,
        path: &str,
        image: &ImagePayload,
    ) -> std::result::Result<String, RemoteError> {
        let request = self
            .client
            .post(format!(
                "{}/storage/v1/object/{IMAGE_BUCKET}/{path}",
                self.base_url
            ))
            .header("Content-Type", image.content_type.clone())
            .header("x-upsert", "false")
            .body(image.bytes.clone());
        self.send(request).await?;
        Ok(self.public_url(path))
    }
}
