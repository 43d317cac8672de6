pub mod client;
pub mod config;
pub mod error;
pub mod filters;
pub mod query;
pub mod status;
pub mod types;
pub mod watch;

pub use client::{graphql_api_for_host, rest_api_for_host, GitHubApi, GitHubClient};
pub use config::{default_config_path, ClientConfig, WatchConfig, DEFAULT_HOST};
pub use error::{GitHubWatchError, Result};
pub use filters::{filter_items, sort_by_group, FilterOutcome, WatchItem};
pub use query::QueryOptions;
pub use status::{CheckStatus, PR_BUILD_CONTEXT};
pub use types::{
    Author, Issue, Label, Labels, MergeableState, PullRequest, Repository, ReviewDecision,
    StatusCheckRollup, StatusNode,
};
pub use watch::{IssueBatch, PullRequestBatch, Watcher, RETRIGGER_LABEL};

/// Ready-wired watcher over the real GitHub transport.
pub struct GitHubWatcher {
    watcher: Watcher<GitHubClient>,
}

impl GitHubWatcher {
    /// Watcher with configuration loaded from the default location (missing
    /// file means defaults) and a client using `GITHUB_TOKEN`.
    pub fn new() -> Result<Self> {
        let config = WatchConfig::load_default()?;
        Self::with_config(config, ClientConfig::default())
    }

    pub fn with_config(watch_config: WatchConfig, client_config: ClientConfig) -> Result<Self> {
        let client = GitHubClient::with_config(client_config)?;
        Ok(Self {
            watcher: Watcher::new(client, watch_config),
        })
    }

    pub fn config(&self) -> &WatchConfig {
        self.watcher.config()
    }

    pub async fn pull_requests(&self, opts: &QueryOptions) -> Result<PullRequestBatch> {
        self.watcher.pull_requests(opts).await
    }

    pub async fn issues(&self, opts: &QueryOptions) -> Result<IssueBatch> {
        self.watcher.issues(opts).await
    }

    pub async fn retrigger(&self, pull_requests: &[PullRequest]) -> Result<()> {
        self.watcher.retrigger(pull_requests).await
    }
}

pub struct GitHubWatcherBuilder {
    watch_config: Option<WatchConfig>,
    config_path: Option<std::path::PathBuf>,
    client_config: ClientConfig,
}

impl GitHubWatcherBuilder {
    pub fn new() -> Self {
        Self {
            watch_config: None,
            config_path: None,
            client_config: ClientConfig::default(),
        }
    }

    pub fn watch_config(mut self, config: WatchConfig) -> Self {
        self.watch_config = Some(config);
        self
    }

    pub fn config_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn token_env_var(mut self, var_name: impl Into<String>) -> Self {
        self.client_config.token_env_var = var_name.into();
        self
    }

    /// Token for one enterprise host; hosts without an entry fall back to
    /// the token environment variable.
    pub fn host_token(mut self, host: impl Into<String>, token: impl Into<String>) -> Self {
        self.client_config.host_tokens.insert(host.into(), token.into());
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.client_config.user_agent = agent.into();
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.client_config.timeout_seconds = seconds;
        self
    }

    pub fn build(self) -> Result<GitHubWatcher> {
        let watch_config = match (self.watch_config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => WatchConfig::load_from_file(path)?,
            (None, None) => WatchConfig::load_default()?,
        };
        GitHubWatcher::with_config(watch_config, self.client_config)
    }
}

impl Default for GitHubWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
