use std::fmt;

use crate::types::{PullRequest, StatusNode};

/// Infrastructure-internal contexts that never influence the resolved
/// status; they report on the merge machinery, not the build.
const EXCLUDED_CONTEXTS: [&str; 3] = ["tide", "keeper", "Merge Status"];

/// Canonical context name whose failure is retriggered with `/test this`.
pub const PR_BUILD_CONTEXT: &str = "pr-build";

/// The resolved CI outcome for a pull request's most recent commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Success,
    Pending,
    Failure,
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Success => "SUCCESS",
            CheckStatus::Pending => "PENDING",
            CheckStatus::Failure => "FAILURE",
            CheckStatus::Error => "ERROR",
        }
    }

    /// Maps a precomputed rollup string onto a resolved status. Anything
    /// unrecognized resolves to PENDING rather than SUCCESS; a false
    /// positive would misreport build health.
    fn from_rollup(state: &str) -> CheckStatus {
        match state {
            "SUCCESS" => CheckStatus::Success,
            "FAILURE" => CheckStatus::Failure,
            "ERROR" => CheckStatus::Error,
            _ => CheckStatus::Pending,
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PullRequest {
    /// Reduce the most recent commit's heterogeneous check entries to a
    /// single outcome.
    ///
    /// Legacy status contexts contribute their `state` unless the context is
    /// infrastructure-internal or the state is empty; check runs contribute
    /// their `conclusion` when named. Deduplicated signals resolve with
    /// ERROR > FAILURE > PENDING precedence, otherwise SUCCESS. With no
    /// named signals at all, the precomputed rollup state decides, and an
    /// absent rollup resolves to PENDING.
    pub fn check_status(&self) -> CheckStatus {
        let rollup = match self.last_commit_rollup() {
            Some(rollup) => rollup,
            None => return CheckStatus::Pending,
        };

        let mut signals: Vec<&str> = Vec::new();
        for node in &rollup.contexts.nodes {
            let signal = match node {
                StatusNode::StatusContext { state, context } => {
                    if EXCLUDED_CONTEXTS.contains(&context.as_str()) || state.is_empty() {
                        continue;
                    }
                    state.as_str()
                }
                StatusNode::CheckRun { conclusion, name } => {
                    if name.is_empty() {
                        continue;
                    }
                    conclusion.as_deref().unwrap_or("")
                }
            };
            if !signal.is_empty() && !signals.contains(&signal) {
                signals.push(signal);
            }
        }

        if signals.is_empty() {
            if rollup.state.is_empty() {
                return CheckStatus::Pending;
            }
            return CheckStatus::from_rollup(&rollup.state);
        }

        if signals.iter().any(|s| *s == "ERROR") {
            CheckStatus::Error
        } else if signals.iter().any(|s| *s == "FAILURE") {
            CheckStatus::Failure
        } else if signals.iter().any(|s| *s == "PENDING") {
            CheckStatus::Pending
        } else {
            CheckStatus::Success
        }
    }

    /// Names of the checks that failed on the most recent commit, excluding
    /// infrastructure-internal contexts. Feeds the retrigger action.
    pub fn failed_checks(&self) -> Vec<String> {
        let rollup = match self.last_commit_rollup() {
            Some(rollup) => rollup,
            None => return vec![],
        };

        let mut failed = Vec::new();
        for node in &rollup.contexts.nodes {
            match node {
                StatusNode::StatusContext { state, context } => {
                    if !EXCLUDED_CONTEXTS.contains(&context.as_str()) && state == "FAILURE" {
                        failed.push(context.clone());
                    }
                }
                StatusNode::CheckRun { conclusion, name } => {
                    if name.is_empty() || EXCLUDED_CONTEXTS.contains(&name.as_str()) {
                        continue;
                    }
                    if matches!(conclusion.as_deref(), Some("FAILURE") | Some("ERROR")) {
                        failed.push(name.clone());
                    }
                }
            }
        }
        failed
    }
}
