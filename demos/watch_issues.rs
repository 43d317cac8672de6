use github_watch::{GitHubWatcher, QueryOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let watcher = GitHubWatcher::new()?;

    let batch = watcher.issues(&QueryOptions::default()).await?;

    let mut group = String::new();
    for issue in &batch.items {
        if group != issue.group_key() {
            group = issue.group_key();
            println!("# {}", group);
        }
        println!(
            "  #{} {} {} (comments: {})",
            issue.number,
            issue.author.login,
            issue.trimmed_title(),
            issue.comments.total_count,
        );
    }

    println!("\nDisplaying {} Issue(s)", batch.items.len());
    if batch.hidden + batch.bots > 0 {
        println!(
            "Filtered {} Issues, use --show-hidden / --show-bots to view them",
            batch.hidden + batch.bots
        );
    }

    Ok(())
}
