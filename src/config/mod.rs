//! Configuration management for `civicwatch`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`CIVICWATCH_*`)
//! 3. Project config (`./civicwatch.yaml`)
//! 4. User config (`~/.config/civicwatch/config.yaml`)
//! 5. Defaults
//!
//! Keys are compared in a normalized form: lower-case with `_` and `.` folded
//! to `-`, so `remote.anon-key`, `remote_anon_key` and `REMOTE_ANON_KEY` name
//! the same setting.

use crate::error::{CivicError, Result};
use crate::model::Role;
use crate::storage::remote::RemoteSettings;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Directory for local state, relative to the project directory.
pub const STATE_DIR: &str = ".civicwatch";
/// Default database filename inside [`STATE_DIR`].
const DEFAULT_DB_FILENAME: &str = "issues.db";
/// Default image directory name inside [`STATE_DIR`].
const DEFAULT_IMAGES_DIRNAME: &str = "images";
/// Project config filename.
pub const PROJECT_CONFIG_FILENAME: &str = "civicwatch.yaml";
/// Environment variable prefix.
const ENV_PREFIX: &str = "CIVICWATCH_";

/// Which backend to run against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DataMode {
    #[default]
    Local,
    Remote,
}

impl DataMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataMode {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" | "" => Ok(Self::Local),
            "remote" | "server" | "supabase" => Ok(Self::Remote),
            other => Err(CivicError::Config(format!(
                "unknown data-mode '{other}' (use local or remote)"
            ))),
        }
    }
}

/// A flat set of configuration values from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Set a key (normalized on insert).
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }

    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Build a layer from YAML text. Nested mappings flatten to dotted keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
        let mut flat = HashMap::new();
        flatten_yaml(&value, "", &mut flat);
        let mut layer = Self::default();
        for (key, value) in flat {
            layer.set(&key, value);
        }
        Ok(layer)
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a layer from `CIVICWATCH_*` pairs.
    #[must_use]
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut layer = Self::default();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layer.set(stripped, value);
            }
        }
        layer
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub mode: Option<String>,
    pub db: Option<PathBuf>,
    pub identity: Option<String>,
    pub role: Option<String>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(mode) = &self.mode {
            layer.set("data-mode", mode.clone());
        }
        if let Some(path) = &self.db {
            layer.set("db", path.to_string_lossy().to_string());
        }
        if let Some(identity) = &self.identity {
            layer.set("identity", identity.clone());
        }
        if let Some(role) = &self.role {
            layer.set("role", role.clone());
        }

        layer
    }
}

/// Load project config (`civicwatch.yaml` in `project_dir`).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_dir: &Path) -> Result<ConfigLayer> {
    ConfigLayer::from_yaml(&project_dir.join(PROJECT_CONFIG_FILENAME))
}

/// Load user config (`~/.config/civicwatch/config.yaml`).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Ok(home) = env::var("HOME") else {
        return Ok(ConfigLayer::default());
    };
    let path = Path::new(&home)
        .join(".config")
        .join("civicwatch")
        .join("config.yaml");
    ConfigLayer::from_yaml(&path)
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    layer.set("data-mode", DataMode::Local.as_str());
    layer.set("role", Role::Citizen.as_str());
    layer
}

/// Load configuration with the full precedence chain.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed.
pub fn load_config(project_dir: &Path, cli: &CliOverrides) -> Result<ConfigLayer> {
    let defaults = default_config_layer();
    let user = load_user_config()?;
    let project = load_project_config(project_dir)?;
    let env_layer = ConfigLayer::from_env();
    let cli_layer = cli.as_layer();

    Ok(ConfigLayer::merge_layers(&[
        defaults, user, project, env_layer, cli_layer,
    ]))
}

/// Everything needed to build a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub mode: DataMode,
    pub db_path: PathBuf,
    pub images_dir: PathBuf,
    pub identity: Option<String>,
    pub display_name: Option<String>,
    pub role: Role,
    pub lock_timeout_ms: Option<u64>,
    pub remote: RemoteSettings,
}

impl StoreConfig {
    /// Resolve a merged layer. Relative paths are taken from `project_dir`.
    ///
    /// Remote endpoint problems are not reported here; they surface when the
    /// provider is built.
    ///
    /// # Errors
    ///
    /// Returns `CivicError::Config` for an unknown data mode or role, or a
    /// non-numeric timeout.
    pub fn from_layer(layer: &ConfigLayer, project_dir: &Path) -> Result<Self> {
        let mode = layer.get("data-mode").unwrap_or_default().parse()?;
        let role = layer
            .get("role")
            .unwrap_or_default()
            .parse::<Role>()
            .map_err(|e| CivicError::Config(e.to_string()))?;

        let state_dir = project_dir.join(STATE_DIR);
        let db_path = path_value(layer, "db", project_dir)
            .unwrap_or_else(|| state_dir.join(DEFAULT_DB_FILENAME));
        let images_dir = path_value(layer, "images-dir", project_dir).unwrap_or_else(|| {
            db_path
                .parent()
                .map_or_else(|| state_dir.clone(), Path::to_path_buf)
                .join(DEFAULT_IMAGES_DIRNAME)
        });

        Ok(Self {
            mode,
            db_path,
            images_dir,
            identity: string_value(layer, "identity"),
            display_name: string_value(layer, "display-name"),
            role,
            lock_timeout_ms: u64_value(layer, "lock-timeout")?,
            remote: RemoteSettings {
                url: string_value(layer, "remote.url"),
                anon_key: string_value(layer, "remote.anon-key"),
                access_token: string_value(layer, "remote.access-token"),
                timeout_ms: u64_value(layer, "remote.timeout-ms")?,
            },
        })
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace(['_', '.'], "-")
}

fn string_value(layer: &ConfigLayer, key: &str) -> Option<String> {
    layer
        .get(key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn path_value(layer: &ConfigLayer, key: &str, base: &Path) -> Option<PathBuf> {
    string_value(layer, key).map(|value| {
        let path = PathBuf::from(value);
        if path.is_absolute() {
            path
        } else {
            base.join(path)
        }
    })
}

fn u64_value(layer: &ConfigLayer, key: &str) -> Result<Option<u64>> {
    string_value(layer, key)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| CivicError::Config(format!("{key} must be a number, got '{value}'")))
        })
        .transpose()
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        serde_yaml::Value::Sequence(values) => {
            let joined = values
                .iter()
                .filter_map(yaml_scalar_to_string)
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
