//
//  config.rs
//  RouteLens
//

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, RouteLensError};

pub const CONFIG_FILE_NAME: &str = "routelens.toml";
pub const ENV_MONGODB_URI: &str = "ROUTELENS_MONGODB_URI";
pub const ENV_MONGODB_DATABASE: &str = "ROUTELENS_MONGODB_DATABASE";

/// Top-level RouteLens configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteLensConfig {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
}

/// Which source tree to scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Root directory to scan (relative to the config file).
    #[serde(default = "default_root")]
    pub root: String,
    /// Directory names skipped on top of node_modules, dist and friends.
    #[serde(default)]
    pub extra_ignore: Vec<String>,
}

/// Document-store connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    /// Falls back to the database named in the URI.
    #[serde(default)]
    pub database: Option<String>,
    /// Connect and server-selection timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// Defaults for hybrid predictions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionConfig {
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default)]
    pub prefer_real_data: Option<bool>,
    #[serde(default)]
    pub limit_fields: Option<usize>,
    #[serde(default)]
    pub exclude_fields: Vec<String>,
    #[serde(default)]
    pub include_fields: Vec<String>,
}

fn default_root() -> String {
    ".".to_string()
}

fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.2
}

fn default_sample_size() -> usize {
    20
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            extra_ignore: Vec::new(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            database: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_llm_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            prefer_real_data: None,
            limit_fields: None,
            exclude_fields: Vec::new(),
            include_fields: Vec::new(),
        }
    }
}

impl DatabaseConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl LlmConfig {
    /// API key from the configured environment variable, if set.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

impl RouteLensConfig {
    /// Load config from a TOML file, falling back to defaults.
    ///
    /// Environment overrides are applied on top either way.
    pub fn load(path: &Path) -> Self {
        let mut config: Self = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(file = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        config.apply_env();
        config
    }

    /// `ROUTELENS_MONGODB_URI` / `ROUTELENS_MONGODB_DATABASE`.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_MONGODB_URI).ok(),
            std::env::var(ENV_MONGODB_DATABASE).ok(),
        );
    }

    /// Blank values leave the current setting alone.
    pub fn apply_overrides(&mut self, uri: Option<String>, database: Option<String>) {
        if let Some(uri) = uri.filter(|u| !u.trim().is_empty()) {
            self.database.uri = uri;
        }
        if let Some(database) = database.filter(|d| !d.trim().is_empty()) {
            self.database.database = Some(database);
        }
    }

    /// Reject values no run can work with.
    pub fn validate(&self) -> Result<()> {
        if self.prediction.sample_size == 0 {
            return Err(RouteLensError::Config("prediction.sample_size must be at least 1".into()));
        }
        if self.prediction.limit_fields == Some(0) {
            return Err(RouteLensError::Config("prediction.limit_fields must be at least 1".into()));
        }
        if self.database.timeout_ms == 0 {
            return Err(RouteLensError::Config("database.timeout_ms must be positive".into()));
        }
        if self.database.uri.trim().is_empty() {
            return Err(RouteLensError::Config("database.uri is empty".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(RouteLensError::Config(format!(
                "llm.temperature {} is outside 0.0..=2.0",
                self.llm.temperature
            )));
        }
        Ok(())
    }

    /// Resolve the workspace root relative to the config file's directory.
    pub fn resolve_root(&self, config_path: &Path) -> PathBuf {
        let parent = config_path.parent().unwrap_or(config_path);
        parent.join(&self.workspace.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_when_missing() {
        let config = RouteLensConfig::load(Path::new("/definitely/not/here.toml"));
        assert_eq!(config.workspace.root, ".");
        assert_eq!(config.database.timeout_ms, 5000);
        assert_eq!(config.prediction.sample_size, 20);
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"
[workspace]
root = "backend"
extra_ignore = ["legacy"]

[database]
uri = "mongodb://db:27017"
database = "shop"

[prediction]
prefer_real_data = true
exclude_fields = ["internalNote"]
"#,
        )
        .unwrap();

        let mut config: RouteLensConfig =
            toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        config.apply_overrides(None, None);
        assert_eq!(config.workspace.extra_ignore, vec!["legacy"]);
        assert_eq!(config.database.database.as_deref(), Some("shop"));
        assert_eq!(config.database.timeout_ms, 5000);
        assert_eq!(config.prediction.prefer_real_data, Some(true));
        assert_eq!(config.prediction.sample_size, 20);
        assert_eq!(config.resolve_root(&path), dir.path().join("backend"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RouteLensConfig::default();
        config.apply_overrides(Some("mongodb://other:27017".into()), Some("".into()));
        assert_eq!(config.database.uri, "mongodb://other:27017");
        assert_eq!(config.database.database, None);
    }

    #[test]
    fn test_validate() {
        assert!(RouteLensConfig::default().validate().is_ok());

        let mut config = RouteLensConfig::default();
        config.prediction.sample_size = 0;
        assert!(matches!(config.validate(), Err(RouteLensError::Config(_))));

        let mut config = RouteLensConfig::default();
        config.prediction.limit_fields = Some(0);
        assert!(matches!(config.validate(), Err(RouteLensError::Config(_))));

        let mut config = RouteLensConfig::default();
        config.database.timeout_ms = 0;
        assert!(matches!(config.validate(), Err(RouteLensError::Config(_))));

        let mut config = RouteLensConfig::default();
        config.llm.temperature = 3.5;
        assert!(matches!(config.validate(), Err(RouteLensError::Config(_))));
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[database\nuri = ").unwrap();
        let config = RouteLensConfig::load(&path);
        assert_eq!(config.database.timeout_ms, 5000);
    }
}
