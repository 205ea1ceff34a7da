//! Backend selection.
//!
//! [`Provider`] is built once from configuration and forwards every call to
//! the selected store unchanged. It holds no issue data of its own. When the
//! configured backend cannot be built, the provider stays usable as a value
//! but every data operation fails with the same configuration error.

use crate::config::{DataMode, StoreConfig};
use crate::error::{CivicError, Result};
use crate::model::{Created, Identity, Issue, NewIssue, VoteOutcome};
use crate::storage::{
    DirImageStore, IssueStore, ListFilter, LocalStore, LocalStoreOptions, PostgrestClient,
    RemoteStore,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

/// The one backend this process runs against.
#[derive(Clone)]
pub enum Provider {
    Ready(Arc<dyn IssueStore>),
    Misconfigured { reason: String },
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(store) => f
                .debug_tuple("Ready")
                .field(&store.backend_name())
                .finish(),
            Self::Misconfigured { reason } => f
                .debug_struct("Misconfigured")
                .field("reason", reason)
                .finish(),
        }
    }
}

impl Provider {
    /// Build the configured backend. Construction failures are logged once
    /// and captured rather than returned.
    #[must_use]
    pub fn from_config(config: &StoreConfig) -> Self {
        match build_store(config) {
            Ok(store) => {
                info!(backend = store.backend_name(), "Data provider ready");
                Self::Ready(store)
            }
            Err(e) => Self::misconfigured(e.to_string()),
        }
    }

    /// Wrap an already constructed store.
    #[must_use]
    pub fn with_store(store: Arc<dyn IssueStore>) -> Self {
        Self::Ready(store)
    }

    #[must_use]
    pub fn misconfigured(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        error!(%reason, "Data provider is not configured; all data operations will fail");
        Self::Misconfigured { reason }
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    fn store(&self) -> Result<&dyn IssueStore> {
        match self {
            Self::Ready(store) => Ok(store.as_ref()),
            Self::Misconfigured { reason } => Err(CivicError::Config(reason.clone())),
        }
    }
}

fn build_store(config: &StoreConfig) -> Result<Arc<dyn IssueStore>> {
    match config.mode {
        DataMode::Local => {
            let options = LocalStoreOptions {
                identity: config.identity.clone(),
                display_name: config.display_name.clone(),
                role: config.role,
                lock_timeout_ms: config.lock_timeout_ms,
            };
            let images = DirImageStore::new(&config.images_dir);
            let store = LocalStore::open(&config.db_path, options, Some(Box::new(images)))
                .map_err(|e| CivicError::Config(e.to_string()))?;
            Ok(Arc::new(store))
        }
        DataMode::Remote => {
            let client = PostgrestClient::new(&config.remote)?;
            Ok(Arc::new(RemoteStore::new(client)))
        }
    }
}

#[async_trait]
impl IssueStore for Provider {
    fn backend_name(&self) -> &'static str {
        match self {
            Self::Ready(store) => store.backend_name(),
            Self::Misconfigured { .. } => "unconfigured",
        }
    }

    async fn list_issues(&self, filter: &ListFilter) -> Result<Vec<Issue>> {
        self.store()?.list_issues(filter).await
    }

    async fn create_issue(&self, new_issue: NewIssue) -> Result<Created> {
        self.store()?.create_issue(new_issue).await
    }

    async fn upvote_issue(&self, id: &str) -> Result<VoteOutcome> {
        self.store()?.upvote_issue(id).await
    }

    async fn set_solved(&self, id: &str, solved: bool) -> Result<Issue> {
        self.store()?.set_solved(id, solved).await
    }

    async fn current_identity(&self) -> Result<Option<Identity>> {
        self.store()?.current_identity().await
    }

    async fn delete_issue(&self, id: &str) -> Result<()> {
        self.store()?.delete_issue(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config_layer;
    use crate::model::TagSet;
    use crate::storage::remote::RemoteSettings;
    use std::path::Path;
    use tempfile::TempDir;

    fn new_issue() -> NewIssue {
        NewIssue {
            description: "Leaking hydrant".to_string(),
            address: "5th Avenue".to_string(),
            tags: TagSet::parse("water"),
            image: None,
            client_nonce: "n-1".to_string(),
        }
    }

    #[tokio::test]
    async fn misconfigured_fails_every_operation() {
        let provider = Provider::misconfigured("remote.url is not set");
        assert!(!provider.is_ready());
        let errors = vec![
            provider.list_issues(&ListFilter::all()).await.unwrap_err(),
            provider.create_issue(new_issue()).await.unwrap_err(),
            provider.upvote_issue("i-1").await.unwrap_err(),
            provider.set_solved("i-1", true).await.unwrap_err(),
            provider.current_identity().await.unwrap_err(),
            provider.delete_issue("i-1").await.unwrap_err(),
        ];
        for err in errors {
            assert!(matches!(err, CivicError::Config(ref r) if r == "remote.url is not set"));
        }
    }

    #[tokio::test]
    async fn remote_without_endpoint_is_misconfigured() {
        let mut config =
            StoreConfig::from_layer(&default_config_layer(), Path::new("/tmp")).unwrap();
        config.mode = DataMode::Remote;
        config.remote = RemoteSettings {
            url: Some("not-a-url".to_string()),
            anon_key: Some("k".to_string()),
            ..Default::default()
        };
        let provider = Provider::from_config(&config);
        assert!(matches!(provider, Provider::Misconfigured { .. }));
        assert!(matches!(
            provider.list_issues(&ListFilter::all()).await,
            Err(CivicError::Config(_))
        ));
    }

    #[tokio::test]
    async fn local_mode_forwards_to_store() {
        let temp = TempDir::new().unwrap();
        let mut layer = default_config_layer();
        layer.set("identity", "u1");
        let config = StoreConfig::from_layer(&layer, temp.path()).unwrap();
        let provider = Provider::from_config(&config);
        assert_eq!(provider.backend_name(), "local");

        let created = provider.create_issue(new_issue()).await.unwrap();
        let listed = provider.list_issues(&ListFilter::all()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.issue.id);
        assert_eq!(
            provider.current_identity().await.unwrap().unwrap().id,
            "u1"
        );
    }
}
