//! Command implementations.
//!
//! Each command takes a [`CommandContext`], performs one flow against the
//! provider and prints either human-readable text or JSON.

pub mod create;
pub mod delete;
pub mod export;
pub mod list;
pub mod status;
pub mod summary;
pub mod tags;
pub mod upvote;
pub mod whoami;

use crate::config::{self, CliOverrides, StoreConfig};
use crate::error::{CivicError, Result};
use crate::model::{Identity, Role};
use crate::provider::Provider;
use crate::storage::IssueStore;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs: the provider and the output mode.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub provider: Arc<Provider>,
    pub json: bool,
    pub quiet: bool,
}

impl CommandContext {
    /// Load configuration for `project_dir` and build the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file cannot be parsed or a value is invalid.
    /// An unusable backend is not an error here; it fails each data operation.
    pub fn load(
        project_dir: &Path,
        overrides: &CliOverrides,
        json: bool,
        quiet: bool,
    ) -> Result<Self> {
        let layer = config::load_config(project_dir, overrides)?;
        let store_config = StoreConfig::from_layer(&layer, project_dir)?;
        debug!(
            mode = %store_config.mode,
            db = %store_config.db_path.display(),
            "Resolved store config"
        );
        Ok(Self::with_provider(
            Provider::from_config(&store_config),
            json,
            quiet,
        ))
    }

    #[must_use]
    pub fn with_provider(provider: Provider, json: bool, quiet: bool) -> Self {
        Self {
            provider: Arc::new(provider),
            json,
            quiet,
        }
    }

    /// The provider as a trait object for the controllers.
    #[must_use]
    pub fn store(&self) -> Arc<dyn IssueStore> {
        self.provider.clone()
    }

    /// Fail unless the caller holds the authority role.
    ///
    /// # Errors
    ///
    /// `AuthenticationRequired` when anonymous, `Unauthorized` for citizens.
    pub async fn require_authority(&self, action: &str) -> Result<Identity> {
        let identity = self
            .provider
            .current_identity()
            .await?
            .ok_or_else(|| CivicError::auth_required(action))?;
        if identity.role == Role::Authority {
            Ok(identity)
        } else {
            Err(CivicError::unauthorized(action))
        }
    }

    /// Print a value as pretty JSON on stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print a human-readable line unless quiet.
    pub fn say(&self, line: impl std::fmt::Display) {
        if !self.quiet {
            println!("{line}");
        }
    }
}
