mod common;

use civicwatch::config::{ConfigLayer, DataMode, StoreConfig, default_config_layer};
use civicwatch::model::Role;
use civicwatch::provider::Provider;
use civicwatch::storage::IssueStore;
use civicwatch::CivicError;
use common::test_log;
use std::fs;
use tempfile::TempDir;

fn resolve(layers: &[ConfigLayer], project_dir: &std::path::Path) -> StoreConfig {
    let mut all = vec![default_config_layer()];
    all.extend_from_slice(layers);
    StoreConfig::from_layer(&ConfigLayer::merge_layers(&all), project_dir).unwrap()
}

#[test]
fn defaults_to_local_citizen_under_project_dir() {
    let _log = test_log("defaults_to_local_citizen_under_project_dir");
    let dir = TempDir::new().unwrap();
    let config = resolve(&[], dir.path());
    assert_eq!(config.mode, DataMode::Local);
    assert_eq!(config.role, Role::Citizen);
    assert_eq!(config.db_path, dir.path().join(".civicwatch").join("issues.db"));
    assert_eq!(config.images_dir, dir.path().join(".civicwatch").join("images"));
}

#[test]
fn later_layers_win() {
    let _log = test_log("later_layers_win");
    let dir = TempDir::new().unwrap();
    let project = ConfigLayer::from_yaml_str("data-mode: remote\nrole: authority\n").unwrap();
    let env = ConfigLayer::from_vars([
        ("CIVICWATCH_DATA_MODE".to_string(), "local".to_string()),
        ("UNRELATED".to_string(), "x".to_string()),
    ]);
    let config = resolve(&[project, env], dir.path());
    assert_eq!(config.mode, DataMode::Local);
    assert_eq!(config.role, Role::Authority);
}

#[test]
fn nested_yaml_keys_reach_remote_settings() {
    let _log = test_log("nested_yaml_keys_reach_remote_settings");
    let dir = TempDir::new().unwrap();
    let project = ConfigLayer::from_yaml_str(
        "data_mode: supabase\nremote:\n  url: https://civic.example.org\n  anon_key: k-123\n  timeout_ms: 2500\n",
    )
    .unwrap();
    let config = resolve(&[project], dir.path());
    assert_eq!(config.mode, DataMode::Remote);
    assert_eq!(config.remote.url.as_deref(), Some("https://civic.example.org"));
    assert_eq!(config.remote.anon_key.as_deref(), Some("k-123"));
    assert_eq!(config.remote.timeout_ms, Some(2500));
}

#[test]
fn project_file_is_read_from_disk() {
    let _log = test_log("project_file_is_read_from_disk");
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("civicwatch.yaml"), "db: data/feed.db\n").unwrap();
    let project = civicwatch::config::load_project_config(dir.path()).unwrap();
    let config = resolve(&[project], dir.path());
    assert_eq!(config.db_path, dir.path().join("data").join("feed.db"));
    assert_eq!(config.images_dir, dir.path().join("data").join("images"));
}

#[test]
fn unknown_mode_is_a_config_error() {
    let _log = test_log("unknown_mode_is_a_config_error");
    let dir = TempDir::new().unwrap();
    let mut layer = default_config_layer();
    layer.set("data-mode", "carrier-pigeon");
    let err = StoreConfig::from_layer(&layer, dir.path()).unwrap_err();
    assert!(matches!(err, CivicError::Config(_)));
}

#[tokio::test]
async fn remote_mode_without_endpoint_is_misconfigured_not_fatal() {
    let _log = test_log("remote_mode_without_endpoint_is_misconfigured_not_fatal");
    let dir = TempDir::new().unwrap();
    let mut layer = ConfigLayer::default();
    layer.set("data-mode", "remote");
    let config = resolve(&[layer], dir.path());

    let provider = Provider::from_config(&config);
    assert!(!provider.is_ready());
    assert_eq!(provider.backend_name(), "unconfigured");
    assert!(matches!(
        provider.current_identity().await.unwrap_err(),
        CivicError::Config(_)
    ));
}

#[tokio::test]
async fn local_mode_provider_is_ready() {
    let _log = test_log("local_mode_provider_is_ready");
    let dir = TempDir::new().unwrap();
    let mut layer = ConfigLayer::default();
    layer.set("identity", "resident-9");
    let config = resolve(&[layer], dir.path());

    let provider = Provider::from_config(&config);
    assert!(provider.is_ready());
    let identity = provider.current_identity().await.unwrap().unwrap();
    assert_eq!(identity.id, "resident-9");
    assert!(config.db_path.exists());
}
