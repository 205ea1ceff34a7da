#![allow(dead_code)]

use civicwatch::model::{Issue, IssueDraft, NewIssue, Role, TagSet};
use civicwatch::storage::{LocalStore, LocalStoreOptions};
use std::sync::Once;
use std::time::Instant;
use tempfile::TempDir;
use tracing::info;

pub mod cli;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        civicwatch::logging::init_test_logging();
    });
}

pub struct TestLogGuard {
    name: String,
    start: Instant,
}

impl TestLogGuard {
    fn new(name: &str) -> Self {
        init_test_logging();
        info!("{name}: starting");
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }
}

impl Drop for TestLogGuard {
    fn drop(&mut self) {
        info!(
            "{}: assertions passed (elapsed {:?})",
            self.name,
            self.start.elapsed()
        );
    }
}

pub fn test_log(name: &str) -> TestLogGuard {
    TestLogGuard::new(name)
}

pub fn options(identity: &str, role: Role) -> LocalStoreOptions {
    LocalStoreOptions {
        identity: Some(identity.to_string()),
        role,
        ..Default::default()
    }
}

pub fn test_store(identity: &str) -> LocalStore {
    init_test_logging();
    LocalStore::open_memory(options(identity, Role::Citizen))
        .expect("Failed to create test database")
}

pub fn test_store_with_dir(identity: &str, role: Role) -> (LocalStore, TempDir) {
    init_test_logging();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join(".civicwatch").join("issues.db");
    let store =
        LocalStore::open(&db_path, options(identity, role), None).expect("Failed to open store");
    (store, dir)
}

pub fn draft(description: &str, address: &str, tags: &str) -> IssueDraft {
    IssueDraft {
        description: description.to_string(),
        address: address.to_string(),
        tags: TagSet::parse(tags),
        image: None,
    }
}

pub fn new_issue(description: &str, nonce: &str) -> NewIssue {
    draft(description, "Main Street", "").into_new_issue(nonce)
}

pub fn ids(issues: &[Issue]) -> Vec<&str> {
    issues.iter().map(|issue| issue.id.as_str()).collect()
}
