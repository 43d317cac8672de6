use crate::types::{Issue, PullRequest};

/// The pieces of an item the filter and sort pipeline consumes; lets one
/// pipeline serve both pull requests and issues.
pub trait WatchItem {
    fn number(&self) -> u64;
    fn author_login(&self) -> &str;
    fn is_closed(&self) -> bool;
    fn has_label(&self, name: &str) -> bool;
    fn group_key(&self) -> String;
}

impl WatchItem for PullRequest {
    fn number(&self) -> u64 {
        self.number
    }

    fn author_login(&self) -> &str {
        &self.author.login
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn has_label(&self, name: &str) -> bool {
        PullRequest::has_label(self, name)
    }

    fn group_key(&self) -> String {
        PullRequest::group_key(self)
    }
}

impl WatchItem for Issue {
    fn number(&self) -> u64 {
        self.number
    }

    fn author_login(&self) -> &str {
        &self.author.login
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn has_label(&self, name: &str) -> bool {
        Issue::has_label(self, name)
    }

    fn group_key(&self) -> String {
        Issue::group_key(self)
    }
}

/// Retained items plus the counts of items excluded per rule, so the caller
/// can report "N hidden, use --show-hidden to view".
#[derive(Debug)]
pub struct FilterOutcome<T> {
    pub kept: Vec<T>,
    pub hidden: usize,
    pub bots: usize,
}

/// Remove closed items (uncounted), then items carrying a hidden label,
/// then items authored by bot accounts. The hidden-label rule is checked
/// first; an item matching both rules is only ever counted under `hidden`.
pub fn filter_items<T: WatchItem>(
    items: Vec<T>,
    hidden_labels: &[String],
    bot_accounts: &[String],
    show_hidden: bool,
    show_bots: bool,
) -> FilterOutcome<T> {
    let mut kept = Vec::with_capacity(items.len());
    let mut hidden = 0;
    let mut bots = 0;

    for item in items {
        if item.is_closed() {
            continue;
        }
        if !show_hidden && hidden_labels.iter().any(|label| item.has_label(label)) {
            hidden += 1;
            continue;
        }
        if !show_bots && bot_accounts.iter().any(|bot| item.author_login() == bot) {
            bots += 1;
            continue;
        }
        kept.push(item);
    }

    FilterOutcome { kept, hidden, bots }
}

/// Stable sort by repository group key, ties broken by ascending number.
/// Downstream grouping headers rely on items of one repository being
/// contiguous.
pub fn sort_by_group<T: WatchItem>(items: &mut [T]) {
    items.sort_by_key(|item| (item.group_key(), item.number()));
}
