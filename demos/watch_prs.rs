use github_watch::{GitHubWatcher, QueryOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let watcher = GitHubWatcher::new()?;

    println!("=== Example 1: open PRs for the configured repositories ===");
    let batch = watcher.pull_requests(&QueryOptions::default()).await?;

    let mut group = String::new();
    for pr in &batch.items {
        if group != pr.group_key() {
            group = pr.group_key();
            println!("# {}", group);
        }
        println!(
            "  #{} {} [{}] {} {}",
            pr.number,
            pr.author.login,
            pr.check_status(),
            pr.trimmed_title(),
            pr.mergeable_marker(),
        );
    }

    println!("\nDisplaying {} PRs", batch.items.len());
    if batch.hidden + batch.bots > 0 {
        println!(
            "Filtered {} PRs, use --show-hidden / --show-bots to view them",
            batch.hidden + batch.bots
        );
    }

    println!("\n=== Example 2: PRs you authored ===");
    let mine = QueryOptions {
        mine: true,
        ..Default::default()
    };
    let batch = watcher.pull_requests(&mine).await?;
    for pr in &batch.items {
        println!("  #{} {}", pr.number, pr.trimmed_title());
    }

    Ok(())
}
