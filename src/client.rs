use async_trait::async_trait;
use log::{debug, info};
use octocrab::Octocrab;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{GitHubWatchError, Result};
use crate::types::{Issue, PullRequest};

/// The API surface the aggregation engine consumes. Implemented by
/// `GitHubClient` for real hosts and by in-memory doubles under test; the
/// engine receives it as a constructor argument.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Login of the authenticated user on `host`.
    async fn current_user(&self, host: &str) -> Result<String>;

    /// Organization logins the authenticated user belongs to on `host`.
    async fn organizations(&self, host: &str) -> Result<Vec<String>>;

    /// Run one GraphQL search document against `host` and return the
    /// matched pull requests.
    async fn search_pull_requests(&self, host: &str, query: &str) -> Result<Vec<PullRequest>>;

    /// Run one GraphQL search document against `host` and return the
    /// matched issues.
    async fn search_issues(&self, host: &str, query: &str) -> Result<Vec<Issue>>;

    /// Post an issue comment on `repo` (`owner/name`) at `host`.
    async fn post_issue_comment(
        &self,
        host: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<()>;
}

/// REST base for a host; api.github.com is special-cased for the public
/// service, enterprise installations serve under `/api/v3`.
pub fn rest_api_for_host(host: &str) -> String {
    if host == "github.com" {
        "https://api.github.com".to_string()
    } else {
        format!("https://{}/api/v3", host)
    }
}

/// GraphQL endpoint for a host; enterprise installations serve under
/// `/api/graphql`.
pub fn graphql_api_for_host(host: &str) -> String {
    if host == "github.com" {
        "https://api.github.com/graphql".to_string()
    } else {
        format!("https://{}/api/graphql", host)
    }
}

pub struct GitHubClient {
    http: reqwest::Client,
    config: ClientConfig,
}

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchData<T> {
    search: SearchNodes<T>,
}

#[derive(Debug, Deserialize)]
struct SearchNodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CurrentUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Organization {
    login: String,
}

impl GitHubClient {
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { http, config })
    }

    fn token_for(&self, host: &str) -> Result<String> {
        if let Some(token) = self.config.host_tokens.get(host) {
            return Ok(token.clone());
        }
        std::env::var(&self.config.token_env_var).map_err(|_| {
            GitHubWatchError::AuthError(format!(
                "no token for host '{}' and {} environment variable not set",
                host, self.config.token_env_var
            ))
        })
    }

    fn octocrab_for(&self, host: &str) -> Result<Octocrab> {
        let mut builder = Octocrab::builder().personal_token(self.token_for(host)?);

        if host != "github.com" {
            builder = builder.base_uri(rest_api_for_host(host)).map_err(|e| {
                GitHubWatchError::ConfigError(format!("invalid base URI for {}: {}", host, e))
            })?;
        }

        Ok(builder.build()?)
    }

    async fn graphql<T: DeserializeOwned>(&self, host: &str, query: &str) -> Result<T> {
        let url = graphql_api_for_host(host);
        debug!("POST {}", url);

        let token = self.token_for(host)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| GitHubWatchError::ConfigError(format!("invalid token: {}", e)))?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.config.user_agent)
                .map_err(|e| GitHubWatchError::ConfigError(format!("invalid user agent: {}", e)))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        let response = self
            .http
            .post(url)
            .headers(headers)
            .json(&json!({ "query": query }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GitHubWatchError::ApiError(format!(
                "GraphQL request to {} failed ({}): {}",
                host, status, error_text
            )));
        }

        let envelope: GraphQlEnvelope<T> = response.json().await?;

        if !envelope.errors.is_empty() {
            let messages: Vec<String> =
                envelope.errors.into_iter().map(|e| e.message).collect();
            return Err(GitHubWatchError::ApiError(format!(
                "graphql error: '{}'",
                messages.join(", ")
            )));
        }

        envelope.data.ok_or_else(|| {
            GitHubWatchError::ApiError(format!("GraphQL response from {} carried no data", host))
        })
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn current_user(&self, host: &str) -> Result<String> {
        debug!("resolving current user on {}", host);

        let user: CurrentUser = self
            .octocrab_for(host)?
            .get("/user", None::<&()>)
            .await
            .map_err(|e| {
                GitHubWatchError::ApiError(format!(
                    "failed to resolve current user on {}: {}",
                    host, e
                ))
            })?;

        Ok(user.login)
    }

    async fn organizations(&self, host: &str) -> Result<Vec<String>> {
        debug!("resolving organization memberships on {}", host);

        let orgs: Vec<Organization> = self
            .octocrab_for(host)?
            .get("/user/orgs", None::<&()>)
            .await
            .map_err(|e| {
                GitHubWatchError::ApiError(format!(
                    "failed to resolve organizations on {}: {}",
                    host, e
                ))
            })?;

        Ok(orgs.into_iter().map(|org| org.login).collect())
    }

    async fn search_pull_requests(&self, host: &str, query: &str) -> Result<Vec<PullRequest>> {
        let data: SearchData<PullRequest> = self.graphql(host, query).await?;
        info!("{} pull request(s) from {}", data.search.nodes.len(), host);
        Ok(data.search.nodes)
    }

    async fn search_issues(&self, host: &str, query: &str) -> Result<Vec<Issue>> {
        let data: SearchData<Issue> = self.graphql(host, query).await?;
        info!("{} issue(s) from {}", data.search.nodes.len(), host);
        Ok(data.search.nodes)
    }

    async fn post_issue_comment(
        &self,
        host: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<()> {
        let route = format!("/repos/{}/issues/{}/comments", repo, number);
        debug!("POST {} on {}", route, host);

        let _: serde_json::Value = self
            .octocrab_for(host)?
            .post(route, Some(&json!({ "body": body })))
            .await
            .map_err(|e| {
                GitHubWatchError::ApiError(format!(
                    "failed to comment on {}#{} at {}: {}",
                    repo, number, host, e
                ))
            })?;

        Ok(())
    }
}
