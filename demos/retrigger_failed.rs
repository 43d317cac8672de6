use github_watch::{CheckStatus, GitHubWatcher, QueryOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let watcher = GitHubWatcher::new()?;

    let batch = watcher.pull_requests(&QueryOptions::default()).await?;

    let failing: Vec<_> = batch
        .items
        .iter()
        .filter(|pr| pr.check_status() == CheckStatus::Failure)
        .collect();
    println!("{} of {} PRs are failing", failing.len(), batch.items.len());
    for pr in &failing {
        println!("  {} ({:?})", pr.url, pr.failed_checks());
    }

    // Posts one /test comment per failed check on every mergeable PR that
    // carries the retrigger label.
    watcher.retrigger(&batch.items).await?;

    Ok(())
}
