use tokio::time::{sleep, Duration};

use uturn_tracker::feed::{FeedConfig, FeedPoller, FeedSnapshot, HttpFeedSource, EMPTY_STATE};
use uturn_tracker::state::Config;

fn print_snapshot(snapshot: &FeedSnapshot) {
    println!(
        "--- {} ({} accounts ok, {} failed)",
        snapshot.fetched_at.format("%H:%M:%S"),
        snapshot.accounts_ok,
        snapshot.accounts_failed
    );
    if snapshot.is_empty() {
        println!("{}", EMPTY_STATE);
        return;
    }
    for post in &snapshot.posts {
        let flag = if post.keyword_hit { "*" } else { " " };
        let when = post
            .published
            .map(|d| d.format("%d %b %H:%M").to_string())
            .unwrap_or_default();
        println!("{} @{} {} {}", flag, post.account, when, post.title);
    }
}

#[tokio::main]
async fn main() {
    let cfg = Config::from_env();
    let once = std::env::args().any(|a| a == "--once");

    let source = HttpFeedSource::new();
    let mut poller = FeedPoller::new(FeedConfig::from_config(&cfg));
    println!(
        "watching {} accounts through {} mirrors",
        poller.config().accounts.len(),
        poller.config().mirrors.len()
    );

    if once {
        print_snapshot(&poller.poll(&source).await);
        return;
    }

    let every = Duration::from_secs(cfg.feed_poll_secs.max(1));
    loop {
        print_snapshot(&poller.poll(&source).await);
        sleep(every).await;
    }
}
