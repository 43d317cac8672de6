use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A pull request node returned by one host's GraphQL search.
///
/// Items carry their own repository and host identity: `repository` holds
/// the `owner/name` pair and the host is recoverable from `url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub mergeable: MergeableState,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub commits: Commits,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub repository: Repository,
    #[serde(rename = "reviewDecision", default)]
    pub review_decision: Option<ReviewDecision>,
}

impl Default for PullRequest {
    fn default() -> Self {
        Self {
            number: 0,
            title: String::new(),
            url: String::new(),
            mergeable: MergeableState::Unknown,
            created_at: DateTime::<Utc>::MIN_UTC,
            author: Author::default(),
            labels: Labels::default(),
            commits: Commits::default(),
            closed: false,
            repository: Repository::default(),
            review_decision: None,
        }
    }
}

impl PullRequest {
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.nodes.iter().any(|label| label.name == name)
    }

    pub fn on_hold(&self) -> bool {
        self.has_label("do-not-merge/hold")
    }

    pub fn labels_string(&self) -> String {
        labels_string(&self.labels)
    }

    pub fn trimmed_title(&self) -> String {
        trimmed_title(&self.title)
    }

    /// Marker the caller renders next to the title for conflicted or
    /// undetermined merge states.
    pub fn mergeable_marker(&self) -> &'static str {
        match self.mergeable {
            MergeableState::Conflicting => "* Conflict",
            MergeableState::Unknown => "* ?",
            MergeableState::Mergeable => "",
        }
    }

    /// URL with the numeric id stripped, used to cluster display rows by
    /// repository: `.../pull/123` becomes `.../pulls`.
    pub fn group_key(&self) -> String {
        let r = Regex::new("pull/[0-9]+").unwrap();
        r.replace_all(&self.url, "pulls").to_string()
    }

    /// API host this item came from, derived from its URL origin.
    pub fn host(&self) -> Option<String> {
        host_from_url(&self.url)
    }

    pub(crate) fn last_commit_rollup(&self) -> Option<&StatusCheckRollup> {
        self.commits
            .nodes
            .first()
            .and_then(|entry| entry.commit.status_check_rollup.as_ref())
    }
}

/// An issue node returned by one host's GraphQL search. Issues carry no CI
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub repository: Repository,
    #[serde(default)]
    pub comments: Comments,
}

impl Default for Issue {
    fn default() -> Self {
        Self {
            number: 0,
            title: String::new(),
            url: String::new(),
            created_at: DateTime::<Utc>::MIN_UTC,
            author: Author::default(),
            labels: Labels::default(),
            closed: false,
            repository: Repository::default(),
            comments: Comments::default(),
        }
    }
}

impl Issue {
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.nodes.iter().any(|label| label.name == name)
    }

    pub fn labels_string(&self) -> String {
        labels_string(&self.labels)
    }

    pub fn trimmed_title(&self) -> String {
        trimmed_title(&self.title)
    }

    pub fn group_key(&self) -> String {
        let r = Regex::new("issues/[0-9]+").unwrap();
        r.replace_all(&self.url, "issues").to_string()
    }

    pub fn host(&self) -> Option<String> {
        host_from_url(&self.url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeableState {
    Mergeable,
    Conflicting,
    #[serde(other)]
    Unknown,
}

impl Default for MergeableState {
    fn default() -> Self {
        MergeableState::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Approved,
    ChangesRequested,
    ReviewRequired,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Repository {
    #[serde(rename = "nameWithOwner", default)]
    pub name_with_owner: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Labels {
    #[serde(default)]
    pub nodes: Vec<Label>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comments {
    #[serde(rename = "totalCount", default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Commits {
    #[serde(default)]
    pub nodes: Vec<CommitEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitEntry {
    #[serde(default)]
    pub commit: Commit,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Commit {
    #[serde(rename = "statusCheckRollup", default)]
    pub status_check_rollup: Option<StatusCheckRollup>,
}

/// Aggregate check state GitHub computes across a commit's checks, plus the
/// individual entries it was computed from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusCheckRollup {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub contexts: StatusContexts,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusContexts {
    #[serde(default)]
    pub nodes: Vec<StatusNode>,
}

/// One check entry on a commit. The search query requests `__typename`, so
/// the two API surfaces deserialize into distinct variants: legacy commit
/// statuses carry a `state`, Checks-API runs carry a `conclusion` (null
/// while the run is still executing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum StatusNode {
    StatusContext {
        #[serde(default)]
        state: String,
        #[serde(default)]
        context: String,
    },
    CheckRun {
        #[serde(default)]
        conclusion: Option<String>,
        #[serde(default)]
        name: String,
    },
}

fn labels_string(labels: &Labels) -> String {
    labels
        .nodes
        .iter()
        .map(|label| label.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn trimmed_title(title: &str) -> String {
    if title.chars().count() > 75 {
        format!("{}...", title.chars().take(75).collect::<String>())
    } else {
        title.to_string()
    }
}

fn host_from_url(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let host = rest.split('/').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}
