// Typed configuration loaded from YAML

use crate::backend::AuthContext;
use crate::sort::SortSpec;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_TOKEN_ENV: &str = "CLUBVIEW_TOKEN";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// What happens to the selection when the filter changes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Keep every selected id, including ones the new filter hides
    Keep,
    /// Drop selected ids that are not in the new view
    #[default]
    IntersectOnFilter,
}

/// Which collaborator the CLI talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Jsonl,
    Rest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub page_size: usize,
    pub default_sort: Option<SortSpec>,
    pub selection_policy: SelectionPolicy,
    /// Fields searched by free-text queries when none are given
    pub search_fields: Vec<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            default_sort: None,
            selection_policy: SelectionPolicy::default(),
            search_fields: vec!["name".to_string(), "username".to_string(), "email".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Base URL for the REST backend
    pub base_url: Option<String>,
    /// Environment variable holding the bearer token, read once at startup
    pub token_env: String,
    pub timeout_secs: u64,
    /// Path segment for the REST collection, e.g. `members`
    pub collection: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            base_url: None,
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            collection: None,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn auth(&self) -> AuthContext {
        AuthContext::from_env(&self.token_env)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub view: ViewConfig,
    pub backend: BackendConfig,
}

impl Config {
    /// `<config dir>/clubview/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("clubview").join("config.yaml"))
    }

    /// Load from an explicit path; the file must exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Config =
            serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config {:?}", path))?;
        info!(path = ?path, "Loaded config");
        Ok(config)
    }

    /// Load from `path` if given, else the default location, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, yaml).with_context(|| format!("Failed to write config {:?}", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.view.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.view.selection_policy, SelectionPolicy::IntersectOnFilter);
        assert_eq!(config.backend.kind, BackendKind::Jsonl);
        assert_eq!(config.backend.token_env, DEFAULT_TOKEN_ENV);
        assert_eq!(config.backend.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
view:
  page_size: 50
  default_sort:
    field: joinDate
    direction: desc
  selection_policy: keep
backend:
  kind: rest
  base_url: https://api.club.test
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.view.page_size, 50);
        assert_eq!(config.view.default_sort, Some(SortSpec::desc("joinDate")));
        assert_eq!(config.view.selection_policy, SelectionPolicy::Keep);
        assert_eq!(config.view.search_fields.len(), 3);
        assert_eq!(config.backend.kind, BackendKind::Rest);
        assert_eq!(config.backend.base_url.as_deref(), Some("https://api.club.test"));
        assert!(config.backend.collection.is_none());
    }

    #[test]
    fn test_unknown_option_value_is_an_error() {
        let yaml = "view:\n  selection_policy: sometimes\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.yaml");

        let mut config = Config::default();
        config.view.page_size = 5;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(Config::load_or_default(Some(&path)).unwrap().view.page_size, 5);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        assert!(Config::load(temp.path().join("missing.yaml")).is_err());
    }
}
