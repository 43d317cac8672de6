use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{GitHubWatchError, Result};

pub const DEFAULT_HOST: &str = "github.com";

const DEFAULT_REPOS: [&str; 1] = ["ZhangHanDong/github-watch"];
const DEFAULT_HIDDEN_LABELS: [&str; 1] = ["hide-this"];
const DEFAULT_BOT_ACCOUNTS: [&str; 2] = ["dependabot", "dependabot-preview"];
const DEFAULT_MAX_NUMBER_OF_PRS: usize = 100;
const DEFAULT_MAX_AGE: i64 = -1;

/// Maps each host to its watched repositories, plus the filtering rules and
/// query bounds applied to every fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Deprecated flat list; migrated to `repositories` under the default
    /// host when the file is loaded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    repos: Vec<String>,

    #[serde(default)]
    repositories: BTreeMap<String, Vec<String>>,

    #[serde(rename = "hiddenLabels", default)]
    hidden_labels: Vec<String>,

    #[serde(rename = "botAccounts", default)]
    bot_accounts: Vec<String>,

    #[serde(rename = "maxNumberOfPRs", default)]
    max_number_of_prs: usize,

    #[serde(rename = "maxAgeOfPRs", default)]
    max_age_of_prs: i64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        let mut config = Self {
            repos: vec![],
            repositories: BTreeMap::new(),
            hidden_labels: vec![],
            bot_accounts: vec![],
            max_number_of_prs: 0,
            max_age_of_prs: 0,
        };
        config.apply_defaults();
        config
    }
}

impl WatchConfig {
    /// Parse a YAML configuration document and apply default substitution.
    pub fn from_str(content: &str) -> Result<Self> {
        let mut config: WatchConfig = serde_saphyr::from_str(content)
            .map_err(|e| GitHubWatchError::ConfigError(format!("invalid config: {}", e)))?;
        config.apply_defaults();
        Ok(config)
    }

    /// Load from `path`. A missing file is not an error; defaults apply.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn load_default() -> Result<Self> {
        Self::load_from_file(default_config_path())
    }

    pub fn save_to_default_location(&self) -> Result<()> {
        self.save_to_file(default_config_path())
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_saphyr::to_string(self)
            .map_err(|e| GitHubWatchError::ConfigError(format!("cannot serialize config: {}", e)))?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Substitute built-in defaults for missing values and migrate the
    /// deprecated flat `repos` list onto the default host. Idempotent; run
    /// once at the load boundary.
    fn apply_defaults(&mut self) {
        if self.repositories.is_empty() {
            if self.repos.is_empty() {
                self.repositories.insert(
                    DEFAULT_HOST.to_string(),
                    DEFAULT_REPOS.iter().map(|r| r.to_string()).collect(),
                );
            } else {
                self.repositories
                    .insert(DEFAULT_HOST.to_string(), std::mem::take(&mut self.repos));
            }
        }

        if self.hidden_labels.is_empty() {
            self.hidden_labels = DEFAULT_HIDDEN_LABELS.iter().map(|l| l.to_string()).collect();
        }

        if self.bot_accounts.is_empty() {
            self.bot_accounts = DEFAULT_BOT_ACCOUNTS.iter().map(|a| a.to_string()).collect();
        }

        if self.max_number_of_prs == 0 {
            self.max_number_of_prs = DEFAULT_MAX_NUMBER_OF_PRS;
        }

        // A literal 0 is indistinguishable from unset and becomes unbounded.
        if self.max_age_of_prs == 0 {
            self.max_age_of_prs = DEFAULT_MAX_AGE;
        }
    }

    /// Configured hosts, in a deterministic (sorted) iteration order.
    pub fn servers(&self) -> Vec<String> {
        self.repositories.keys().cloned().collect()
    }

    /// Repository search qualifiers for one host, as `repo:<owner>/<name>`.
    pub fn repo_qualifiers(&self, host: &str) -> Vec<String> {
        self.repositories
            .get(host)
            .map(|repos| repos.iter().map(|r| format!("repo:{}", r)).collect())
            .unwrap_or_default()
    }

    pub fn hidden_labels(&self) -> &[String] {
        &self.hidden_labels
    }

    pub fn bot_accounts(&self) -> &[String] {
        &self.bot_accounts
    }

    /// Maximum age of returned items in days, or -1 for unbounded.
    pub fn max_age_of_prs(&self) -> i64 {
        self.max_age_of_prs
    }

    pub fn max_number_of_prs(&self) -> usize {
        self.max_number_of_prs
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("github-watch")
        .join("config.yml")
}

/// Connection settings consumed by the transport client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub token_env_var: String,
    /// Tokens for enterprise hosts, keyed by host. Hosts without an entry
    /// fall back to the token from `token_env_var`.
    #[serde(default)]
    pub host_tokens: BTreeMap<String, String>,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token_env_var: "GITHUB_TOKEN".to_string(),
            host_tokens: BTreeMap::new(),
            user_agent: "github-watch/0.1.0".to_string(),
            timeout_seconds: 30,
        }
    }
}
