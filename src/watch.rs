use chrono::Utc;
use log::{debug, info};

use crate::client::GitHubApi;
use crate::config::WatchConfig;
use crate::error::{GitHubWatchError, Result};
use crate::filters::{filter_items, sort_by_group};
use crate::query::{self, ItemKind, QueryOptions};
use crate::status::{CheckStatus, PR_BUILD_CONTEXT};
use crate::types::{Issue, MergeableState, PullRequest};

/// Label marking a pull request as eligible for automatic retriggering of
/// its failed checks.
pub const RETRIGGER_LABEL: &str = "updatebot";

/// Filtered, sorted pull requests plus the per-rule exclusion counts.
#[derive(Debug, Default)]
pub struct PullRequestBatch {
    pub items: Vec<PullRequest>,
    pub hidden: usize,
    pub bots: usize,
}

/// Filtered, sorted issues plus the per-rule exclusion counts.
#[derive(Debug, Default)]
pub struct IssueBatch {
    pub items: Vec<Issue>,
    pub hidden: usize,
    pub bots: usize,
}

/// Multi-host aggregation engine. Queries each configured host once, merges
/// the results in host order, and applies the filter/sort pipeline. The
/// transport and configuration are injected at construction.
pub struct Watcher<A> {
    api: A,
    config: WatchConfig,
}

impl<A: GitHubApi> Watcher<A> {
    pub fn new(api: A, config: WatchConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Fetch open pull requests from every configured host. A failure on
    /// any host aborts the whole aggregation; a partial result would
    /// understate the review load.
    pub async fn pull_requests(&self, opts: &QueryOptions) -> Result<PullRequestBatch> {
        let mut merged: Vec<PullRequest> = Vec::new();
        for host in self.config.servers() {
            let query = self.search_for_host(ItemKind::PullRequests, &host, opts).await?;
            merged.extend(self.api.search_pull_requests(&host, &query).await?);
        }

        let outcome = filter_items(
            merged,
            self.config.hidden_labels(),
            self.config.bot_accounts(),
            opts.show_hidden,
            opts.show_bots,
        );
        debug!("filtered {}/{} pull request(s)", outcome.hidden, outcome.bots);

        let mut items = outcome.kept;
        sort_by_group(&mut items);

        Ok(PullRequestBatch {
            items,
            hidden: outcome.hidden,
            bots: outcome.bots,
        })
    }

    /// Fetch open issues from every configured host; same merge and filter
    /// semantics as `pull_requests`.
    pub async fn issues(&self, opts: &QueryOptions) -> Result<IssueBatch> {
        let mut merged: Vec<Issue> = Vec::new();
        for host in self.config.servers() {
            let query = self.search_for_host(ItemKind::Issues, &host, opts).await?;
            merged.extend(self.api.search_issues(&host, &query).await?);
        }

        let outcome = filter_items(
            merged,
            self.config.hidden_labels(),
            self.config.bot_accounts(),
            opts.show_hidden,
            opts.show_bots,
        );
        debug!("filtered {}/{} issue(s)", outcome.hidden, outcome.bots);

        let mut items = outcome.kept;
        sort_by_group(&mut items);

        Ok(IssueBatch {
            items,
            hidden: outcome.hidden,
            bots: outcome.bots,
        })
    }

    /// Resolve the per-host query context (current user, and organization
    /// memberships when the mode needs them) and build the search document.
    async fn search_for_host(
        &self,
        kind: ItemKind,
        host: &str,
        opts: &QueryOptions,
    ) -> Result<String> {
        let current_user = self.api.current_user(host).await?;

        let orgs = if opts.needs_orgs() {
            let orgs = self.api.organizations(host).await?;
            debug!("user is a member of {} organisation(s) on {}", orgs.len(), host);
            orgs
        } else {
            Vec::new()
        };

        let query = query::build_search(
            kind,
            opts,
            host,
            &current_user,
            &orgs,
            &self.config,
            Utc::now().date_naive(),
        );
        debug!("running query against {}\n{}", host, query);
        Ok(query)
    }

    /// Post a `/test` comment for every failed check of every retriggerable
    /// pull request: resolved FAILURE, mergeable, and carrying the
    /// designated label. Comments are posted strictly in item order and the
    /// first posting error aborts; comments already posted stand.
    pub async fn retrigger(&self, pull_requests: &[PullRequest]) -> Result<()> {
        info!("retriggering failed, non-conflicting pull requests");

        for pr in pull_requests {
            if pr.check_status() != CheckStatus::Failure
                || pr.mergeable != MergeableState::Mergeable
                || !pr.has_label(RETRIGGER_LABEL)
            {
                continue;
            }

            for check in pr.failed_checks() {
                let command = if check == PR_BUILD_CONTEXT {
                    "/test this".to_string()
                } else {
                    format!("/test {}", check)
                };
                info!("{} with '{}'", pr.url, command);

                let host = pr.host().ok_or_else(|| {
                    GitHubWatchError::ApiError(format!(
                        "cannot derive host from url '{}'",
                        pr.url
                    ))
                })?;

                self.api
                    .post_issue_comment(&host, &pr.repository.name_with_owner, pr.number, &command)
                    .await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Author, Commit, CommitEntry, Commits, Label, Labels, Repository, StatusCheckRollup,
        StatusContexts, StatusNode,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockApi {
        users: HashMap<String, String>,
        orgs: HashMap<String, Vec<String>>,
        pull_requests: HashMap<String, Vec<PullRequest>>,
        issues: HashMap<String, Vec<Issue>>,
        failing_hosts: Vec<String>,
        failing_comment_repos: Vec<String>,
        queries: Mutex<Vec<(String, String)>>,
        comments: Mutex<Vec<(String, String, u64, String)>>,
    }

    #[async_trait]
    impl GitHubApi for MockApi {
        async fn current_user(&self, host: &str) -> Result<String> {
            Ok(self
                .users
                .get(host)
                .cloned()
                .unwrap_or_else(|| "octocat".to_string()))
        }

        async fn organizations(&self, host: &str) -> Result<Vec<String>> {
            Ok(self.orgs.get(host).cloned().unwrap_or_default())
        }

        async fn search_pull_requests(&self, host: &str, query: &str) -> Result<Vec<PullRequest>> {
            if self.failing_hosts.iter().any(|h| h == host) {
                return Err(GitHubWatchError::ApiError(format!("{} is down", host)));
            }
            self.queries
                .lock()
                .unwrap()
                .push((host.to_string(), query.to_string()));
            Ok(self.pull_requests.get(host).cloned().unwrap_or_default())
        }

        async fn search_issues(&self, host: &str, query: &str) -> Result<Vec<Issue>> {
            if self.failing_hosts.iter().any(|h| h == host) {
                return Err(GitHubWatchError::ApiError(format!("{} is down", host)));
            }
            self.queries
                .lock()
                .unwrap()
                .push((host.to_string(), query.to_string()));
            Ok(self.issues.get(host).cloned().unwrap_or_default())
        }

        async fn post_issue_comment(
            &self,
            host: &str,
            repo: &str,
            number: u64,
            body: &str,
        ) -> Result<()> {
            if self.failing_comment_repos.iter().any(|r| r == repo) {
                return Err(GitHubWatchError::ApiError(format!(
                    "cannot comment on {}",
                    repo
                )));
            }
            self.comments.lock().unwrap().push((
                host.to_string(),
                repo.to_string(),
                number,
                body.to_string(),
            ));
            Ok(())
        }
    }

    fn two_host_config() -> WatchConfig {
        WatchConfig::from_str(
            r#"
repositories:
  github.com:
    - acme/widgets
  github.example.com:
    - platform/infra
"#,
        )
        .unwrap()
    }

    fn pr(number: u64, url: &str, labels: &[&str]) -> PullRequest {
        PullRequest {
            number,
            url: url.to_string(),
            author: Author {
                login: "octocat".to_string(),
            },
            labels: Labels {
                nodes: labels
                    .iter()
                    .map(|name| Label {
                        name: name.to_string(),
                    })
                    .collect(),
            },
            repository: Repository {
                name_with_owner: url
                    .trim_start_matches("https://")
                    .split('/')
                    .skip(1)
                    .take(2)
                    .collect::<Vec<_>>()
                    .join("/"),
            },
            mergeable: MergeableState::Mergeable,
            ..Default::default()
        }
    }

    fn failing(mut pr: PullRequest, failed_contexts: &[&str]) -> PullRequest {
        pr.commits = Commits {
            nodes: vec![CommitEntry {
                commit: Commit {
                    status_check_rollup: Some(StatusCheckRollup {
                        state: "FAILURE".to_string(),
                        contexts: StatusContexts {
                            nodes: failed_contexts
                                .iter()
                                .map(|name| StatusNode::StatusContext {
                                    state: "FAILURE".to_string(),
                                    context: name.to_string(),
                                })
                                .collect(),
                        },
                    }),
                },
            }],
        };
        pr
    }

    #[tokio::test]
    async fn test_merge_preserves_host_order_before_sort() {
        let mut api = MockApi::default();
        api.pull_requests.insert(
            "github.com".to_string(),
            vec![pr(5, "https://github.com/acme/widgets/pull/5", &[])],
        );
        api.pull_requests.insert(
            "github.example.com".to_string(),
            vec![pr(9, "https://github.example.com/platform/infra/pull/9", &[])],
        );

        let watcher = Watcher::new(api, two_host_config());
        let batch = watcher
            .pull_requests(&QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(batch.items.len(), 2);
        // Sorted by group key: github.com URLs sort before
        // github.example.com URLs.
        assert_eq!(batch.items[0].number, 5);
        assert_eq!(batch.items[1].number, 9);

        let queries = watcher.api.queries.lock().unwrap();
        let hosts: Vec<&str> = queries.iter().map(|(host, _)| host.as_str()).collect();
        assert_eq!(hosts, vec!["github.com", "github.example.com"]);
        assert!(queries[0].1.contains("repo:acme/widgets"));
        assert!(queries[1].1.contains("repo:platform/infra"));
    }

    #[tokio::test]
    async fn test_host_failure_aborts_aggregation() {
        let mut api = MockApi::default();
        api.pull_requests.insert(
            "github.com".to_string(),
            vec![pr(5, "https://github.com/acme/widgets/pull/5", &[])],
        );
        api.failing_hosts.push("github.example.com".to_string());

        let watcher = Watcher::new(api, two_host_config());
        let result = watcher.pull_requests(&QueryOptions::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_filters_and_counters_applied() {
        let mut api = MockApi::default();
        api.pull_requests.insert(
            "github.com".to_string(),
            vec![
                pr(1, "https://github.com/acme/widgets/pull/1", &["hide-this"]),
                {
                    let mut bot = pr(2, "https://github.com/acme/widgets/pull/2", &[]);
                    bot.author.login = "dependabot".to_string();
                    bot
                },
                pr(3, "https://github.com/acme/widgets/pull/3", &[]),
                {
                    let mut closed = pr(4, "https://github.com/acme/widgets/pull/4", &[]);
                    closed.closed = true;
                    closed
                },
            ],
        );

        let config = WatchConfig::from_str(
            "repositories:\n  github.com:\n    - acme/widgets\n",
        )
        .unwrap();
        let watcher = Watcher::new(api, config);
        let batch = watcher
            .pull_requests(&QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.items[0].number, 3);
        assert_eq!(batch.hidden, 1);
        assert_eq!(batch.bots, 1);
    }

    #[tokio::test]
    async fn test_orgs_fetched_only_in_mine_mode() {
        let mut api = MockApi::default();
        api.orgs
            .insert("github.com".to_string(), vec!["acme".to_string()]);
        api.pull_requests.insert("github.com".to_string(), vec![]);

        let config = WatchConfig::from_str(
            "repositories:\n  github.com:\n    - acme/widgets\n",
        )
        .unwrap();
        let watcher = Watcher::new(api, config);

        let opts = QueryOptions {
            mine: true,
            ..Default::default()
        };
        watcher.pull_requests(&opts).await.unwrap();

        let queries = watcher.api.queries.lock().unwrap();
        assert!(queries[0].1.contains("author:octocat user:acme"));
    }

    #[tokio::test]
    async fn test_issue_aggregation() {
        let mut api = MockApi::default();
        api.issues.insert(
            "github.com".to_string(),
            vec![Issue {
                number: 42,
                url: "https://github.com/acme/widgets/issues/42".to_string(),
                author: Author {
                    login: "octocat".to_string(),
                },
                ..Default::default()
            }],
        );

        let config = WatchConfig::from_str(
            "repositories:\n  github.com:\n    - acme/widgets\n",
        )
        .unwrap();
        let watcher = Watcher::new(api, config);
        let batch = watcher.issues(&QueryOptions::default()).await.unwrap();

        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.items[0].number, 42);

        let queries = watcher.api.queries.lock().unwrap();
        assert!(queries[0].1.contains("is:issue is:open"));
    }

    #[tokio::test]
    async fn test_retrigger_only_labelled_mergeable_failures() {
        let api = MockApi::default();
        let watcher = Watcher::new(api, WatchConfig::default());

        let eligible = failing(
            pr(2, "https://github.com/acme/widgets/pull/2", &[RETRIGGER_LABEL]),
            &["build"],
        );
        let unlabelled = failing(
            pr(3, "https://github.com/acme/widgets/pull/3", &["size/M"]),
            &["build"],
        );
        let conflicting = {
            let mut pr = failing(
                pr(4, "https://github.com/acme/widgets/pull/4", &[RETRIGGER_LABEL]),
                &["build"],
            );
            pr.mergeable = MergeableState::Conflicting;
            pr
        };
        let passing = pr(5, "https://github.com/acme/widgets/pull/5", &[RETRIGGER_LABEL]);

        watcher
            .retrigger(&[eligible, unlabelled, conflicting, passing])
            .await
            .unwrap();

        let comments = watcher.api.comments.lock().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(
            *comments,
            vec![(
                "github.com".to_string(),
                "acme/widgets".to_string(),
                2,
                "/test build".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_retrigger_uses_test_this_for_pr_build() {
        let api = MockApi::default();
        let watcher = Watcher::new(api, WatchConfig::default());

        let pr = failing(
            pr(7, "https://github.com/acme/widgets/pull/7", &[RETRIGGER_LABEL]),
            &["pr-build", "integration"],
        );

        watcher.retrigger(&[pr]).await.unwrap();

        let comments = watcher.api.comments.lock().unwrap();
        let bodies: Vec<&str> = comments.iter().map(|(_, _, _, body)| body.as_str()).collect();
        assert_eq!(bodies, vec!["/test this", "/test integration"]);
    }

    #[tokio::test]
    async fn test_retrigger_aborts_on_first_posting_error() {
        let mut api = MockApi::default();
        api.failing_comment_repos.push("acme/gadgets".to_string());
        let watcher = Watcher::new(api, WatchConfig::default());

        let first = failing(
            pr(1, "https://github.com/acme/widgets/pull/1", &[RETRIGGER_LABEL]),
            &["build"],
        );
        let second = failing(
            pr(2, "https://github.com/acme/gadgets/pull/2", &[RETRIGGER_LABEL]),
            &["build"],
        );
        let third = failing(
            pr(3, "https://github.com/acme/widgets/pull/3", &[RETRIGGER_LABEL]),
            &["build"],
        );

        let result = watcher.retrigger(&[first, second, third]).await;
        assert!(result.is_err());

        // The first comment stands; nothing after the failure is posted.
        let comments = watcher.api.comments.lock().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].2, 1);
    }

    #[tokio::test]
    async fn test_retrigger_routes_to_item_host() {
        let api = MockApi::default();
        let watcher = Watcher::new(api, WatchConfig::default());

        let pr = failing(
            pr(
                9,
                "https://github.example.com/platform/infra/pull/9",
                &[RETRIGGER_LABEL],
            ),
            &["build"],
        );

        watcher.retrigger(&[pr]).await.unwrap();

        let comments = watcher.api.comments.lock().unwrap();
        assert_eq!(comments[0].0, "github.example.com");
        assert_eq!(comments[0].1, "platform/infra");
    }
}
