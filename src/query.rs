use chrono::{Duration, NaiveDate};

use crate::config::WatchConfig;

/// Mode flags for one fetch. The search predicate is chosen by strict
/// precedence: `raw` override, then `mine`, then `review_requested`, then
/// the configured repository list.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub show_bots: bool,
    pub show_hidden: bool,
    pub mine: bool,
    pub review_requested: bool,
    pub raw: Option<String>,
}

impl QueryOptions {
    /// Whether resolving this query needs the current user's organization
    /// memberships on the target host.
    pub(crate) fn needs_orgs(&self) -> bool {
        self.raw.as_deref().map_or(true, str::is_empty) && self.mine
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    PullRequests,
    Issues,
}

/// Build the full GraphQL search document for one host.
///
/// `today` is injected so the max-age cutoff is deterministic under test;
/// callers pass the current date.
pub(crate) fn build_search(
    kind: ItemKind,
    opts: &QueryOptions,
    host: &str,
    current_user: &str,
    orgs: &[String],
    cfg: &WatchConfig,
    today: NaiveDate,
) -> String {
    let mut predicate = predicate(opts, host, current_user, orgs, cfg);
    if let Some(clause) = age_clause(cfg.max_age_of_prs(), today) {
        predicate.push(' ');
        predicate.push_str(&clause);
    }
    search_document(kind, &predicate, cfg.max_number_of_prs())
}

fn predicate(
    opts: &QueryOptions,
    host: &str,
    current_user: &str,
    orgs: &[String],
    cfg: &WatchConfig,
) -> String {
    if let Some(raw) = opts.raw.as_deref() {
        if !raw.is_empty() {
            return raw.to_string();
        }
    }

    if opts.mine {
        let mut q = format!("author:{}", current_user);
        for org in orgs {
            q.push_str(" user:");
            q.push_str(org);
        }
        return q;
    }

    if opts.review_requested {
        return format!("review-requested:{}", current_user);
    }

    cfg.repo_qualifiers(host).join(" ")
}

/// `created:><cutoff>` clause for bounded queries; `None` when the max age
/// is unbounded.
fn age_clause(max_age_days: i64, today: NaiveDate) -> Option<String> {
    if max_age_days == -1 {
        return None;
    }
    let cutoff = today - Duration::days(max_age_days);
    Some(format!("created:>{}", cutoff.format("%Y-%m-%d")))
}

/// The search predicate only constrains `is:open`; closed items can still
/// appear in stale search indexes, so the filter pipeline re-checks the
/// `closed` field client-side.
fn search_document(kind: ItemKind, predicate: &str, page_size: usize) -> String {
    match kind {
        ItemKind::PullRequests => format!(
            r#"{{
  search(query: "is:pr is:open {}", type: ISSUE, first: {}) {{
    nodes {{
      ... on PullRequest {{
        number
        title
        url
        createdAt
        closed
        author {{
          login
        }}
        repository {{
          nameWithOwner
        }}
        mergeable
        reviewDecision
        labels(first: 10) {{
          nodes {{
            name
          }}
        }}
        commits(last: 1) {{
          nodes {{
            commit {{
              statusCheckRollup {{
                state
                contexts(last: 100) {{
                  nodes {{
                    __typename
                    ... on StatusContext {{
                      state
                      context
                    }}
                    ... on CheckRun {{
                      conclusion
                      name
                    }}
                  }}
                }}
              }}
            }}
          }}
        }}
      }}
    }}
  }}
}}"#,
            predicate, page_size
        ),
        ItemKind::Issues => format!(
            r#"{{
  search(query: "is:issue is:open {}", type: ISSUE, first: {}) {{
    nodes {{
      ... on Issue {{
        number
        title
        url
        createdAt
        closed
        author {{
          login
        }}
        repository {{
          nameWithOwner
        }}
        comments {{
          totalCount
        }}
        labels(first: 10) {{
          nodes {{
            name
          }}
        }}
      }}
    }}
  }}
}}"#,
            predicate, page_size
        ),
    }
}
