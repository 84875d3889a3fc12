//! Best-effort social feed: recent posts from a handful of accounts, fetched
//! as syndication feeds through mirror hosts and a feed-to-JSON proxy.
//!
//! Each account walks the mirror list until one answers; every attempt is
//! bounded by a timeout. Accounts are fetched concurrently and merged into one
//! list ranked keyword hits first, newest first.

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use futures_util::future::join_all;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use crate::logging::{log_feed_attempt, log_feed_summary, ProfileScope};
use crate::state::Config;

mod source;

pub use source::{FeedSource, HttpFeedSource, ProxyItem, ProxyResponse};

pub const MAX_ACCOUNTS: usize = 6;
pub const EMPTY_STATE: &str = "No posts to show right now. The feed mirrors may be down.";

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub proxy: String,
    pub mirrors: Vec<String>,
    pub accounts: Vec<String>,
    pub keywords: Vec<String>,
    pub attempt_timeout: Duration,
    pub max_posts: usize,
}

impl FeedConfig {
    pub fn from_config(cfg: &Config) -> Self {
        let mut accounts = cfg.feed_accounts.clone();
        accounts.truncate(MAX_ACCOUNTS);
        Self {
            proxy: cfg.feed_proxy.clone(),
            mirrors: cfg.feed_mirrors.clone(),
            accounts,
            keywords: cfg.feed_keywords.iter().map(|k| k.to_lowercase()).collect(),
            attempt_timeout: Duration::from_secs(cfg.feed_timeout_secs),
            max_posts: cfg.feed_max_posts,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub account: String,
    pub title: String,
    pub text: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    pub keyword_hit: bool,
}

impl Post {
    pub fn from_item(account: &str, item: &ProxyItem, keywords: &[String]) -> Self {
        let title = strip_markup(&item.title);
        let text = strip_markup(&item.description);
        let haystack = format!("{} {}", title, text).to_lowercase();
        Self {
            account: account.to_string(),
            keyword_hit: keywords.iter().any(|k| !k.is_empty() && haystack.contains(k.as_str())),
            published: parse_pub_date(&item.pub_date),
            link: item.link.clone(),
            title,
            text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccountResult {
    pub account: String,
    /// Mirror that answered, if any.
    pub mirror: Option<String>,
    pub attempts: usize,
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub posts: Vec<Post>,
    pub accounts_ok: usize,
    pub accounts_failed: usize,
    pub fetched_at: DateTime<Utc>,
}

impl FeedSnapshot {
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

pub fn feed_url(proxy: &str, mirror: &str, account: &str) -> Result<String> {
    let rss = format!("https://{}/{}/rss", mirror, account);
    let url = Url::parse_with_params(proxy, &[("rss_url", rss.as_str())])?;
    Ok(url.to_string())
}

/// Mirror indices starting at `start`, wrapping around once.
pub fn mirror_order(len: usize, start: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    (0..len).map(|i| (start + i) % len).collect()
}

/// Tries each mirror in turn until one returns items. Failures are logged and
/// skipped; an account with no working mirror yields no posts.
pub async fn fetch_account<S>(source: &S, cfg: &FeedConfig, account: &str, start: usize) -> AccountResult
where
    S: FeedSource + ?Sized + Sync,
{
    let mut attempts = 0;
    for idx in mirror_order(cfg.mirrors.len(), start) {
        let mirror = &cfg.mirrors[idx];
        attempts += 1;
        let url = match feed_url(&cfg.proxy, mirror, account) {
            Ok(u) => u,
            Err(e) => {
                log_feed_attempt(account, mirror, "bad_url", &e.to_string());
                continue;
            }
        };
        match timeout(cfg.attempt_timeout, source.fetch(&url)).await {
            Err(_) => log_feed_attempt(account, mirror, "timeout", ""),
            Ok(Err(e)) => log_feed_attempt(account, mirror, "error", &e.to_string()),
            Ok(Ok(resp)) if resp.is_ok() && !resp.items.is_empty() => {
                log_feed_attempt(account, mirror, "ok", &resp.items.len().to_string());
                let posts = resp
                    .items
                    .iter()
                    .map(|item| Post::from_item(account, item, &cfg.keywords))
                    .collect();
                return AccountResult {
                    account: account.to_string(),
                    mirror: Some(mirror.clone()),
                    attempts,
                    posts,
                };
            }
            Ok(Ok(resp)) => log_feed_attempt(account, mirror, "empty", &resp.status),
        }
    }
    AccountResult {
        account: account.to_string(),
        mirror: None,
        attempts,
        posts: Vec::new(),
    }
}

/// Keyword hits first, then newest first; undated posts sink.
pub fn rank_posts(mut posts: Vec<Post>, max: usize) -> Vec<Post> {
    posts.sort_by(|a, b| {
        b.keyword_hit
            .cmp(&a.keyword_hit)
            .then_with(|| b.published.cmp(&a.published))
    });
    posts.truncate(max);
    posts
}

/// Fetches every account concurrently and merges the results. `cycle` shifts
/// the starting mirror so consecutive polls spread over the mirror list.
pub async fn fetch_feed<S>(source: &S, cfg: &FeedConfig, cycle: usize) -> FeedSnapshot
where
    S: FeedSource + ?Sized + Sync,
{
    let _scope = ProfileScope::new("fetch_feed");
    let results = join_all(
        cfg.accounts
            .iter()
            .enumerate()
            .map(|(i, account)| fetch_account(source, cfg, account, cycle + i)),
    )
    .await;

    let accounts_ok = results.iter().filter(|r| r.mirror.is_some()).count();
    let accounts_failed = results.len() - accounts_ok;
    let attempts = results.iter().map(|r| r.attempts).sum();
    let posts = rank_posts(
        results.into_iter().flat_map(|r| r.posts).collect(),
        cfg.max_posts,
    );
    log_feed_summary(accounts_ok, accounts_failed, attempts, posts.len());

    FeedSnapshot {
        posts,
        accounts_ok,
        accounts_failed,
        fetched_at: Utc::now(),
    }
}

/// Keeps the round-robin cursor between polls.
pub struct FeedPoller {
    cfg: FeedConfig,
    cycle: usize,
}

impl FeedPoller {
    pub fn new(cfg: FeedConfig) -> Self {
        Self { cfg, cycle: 0 }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.cfg
    }

    pub async fn poll<S>(&mut self, source: &S) -> FeedSnapshot
    where
        S: FeedSource + ?Sized + Sync,
    {
        let snapshot = fetch_feed(source, &self.cfg, self.cycle).await;
        self.cycle = self.cycle.wrapping_add(1);
        snapshot
    }
}

/// Proxy dates come as `YYYY-MM-DD HH:MM:SS` (UTC); RFC 2822 and RFC 3339
/// are accepted too.
pub fn parse_pub_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Drops tags, decodes the common entities and collapses whitespace. A `<`
/// only opens a tag when a letter, `/` or `!` follows it.
pub fn strip_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' if !in_tag
                && chars
                    .peek()
                    .map_or(false, |n| n.is_ascii_alphabetic() || *n == '/' || *n == '!') =>
            {
                in_tag = true
            }
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(account: &str, hit: bool, published: &str) -> Post {
        Post {
            account: account.into(),
            title: String::new(),
            text: String::new(),
            link: String::new(),
            published: parse_pub_date(published),
            keyword_hit: hit,
        }
    }

    #[test]
    fn feed_url_encodes_rss_url() {
        let url = feed_url("https://api.rss2json.com/v1/api.json", "nitter.net", "BBCPolitics").unwrap();
        assert_eq!(
            url,
            "https://api.rss2json.com/v1/api.json?rss_url=https%3A%2F%2Fnitter.net%2FBBCPolitics%2Frss"
        );
    }

    #[test]
    fn mirror_order_wraps() {
        assert_eq!(mirror_order(3, 0), vec![0, 1, 2]);
        assert_eq!(mirror_order(3, 4), vec![1, 2, 0]);
        assert!(mirror_order(0, 2).is_empty());
    }

    #[test]
    fn rank_puts_keyword_hits_first_then_recent() {
        let posts = vec![
            post("a", false, "2025-07-02 10:00:00"),
            post("b", true, "2025-06-01 10:00:00"),
            post("c", false, "2025-07-03 10:00:00"),
            post("d", true, "2025-07-01 10:00:00"),
            post("e", false, "not a date"),
        ];
        let ranked: Vec<String> = rank_posts(posts, 10).into_iter().map(|p| p.account).collect();
        assert_eq!(ranked, vec!["d", "b", "c", "a", "e"]);
    }

    #[test]
    fn rank_truncates() {
        let posts = (0..30).map(|_| post("x", false, "")).collect();
        assert_eq!(rank_posts(posts, 20).len(), 20);
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let item = ProxyItem {
            title: "Chancellor in major U-TURN on fuel".into(),
            ..Default::default()
        };
        let p = Post::from_item("a", &item, &["u-turn".to_string()]);
        assert!(p.keyword_hit);
    }

    #[test]
    fn strips_markup_and_entities() {
        assert_eq!(
            strip_markup("<p>Fish &amp; chips<br/>tonight</p>"),
            "Fish & chips tonight"
        );
    }

    #[test]
    fn bare_angle_bracket_is_text() {
        assert_eq!(
            strip_markup("Inflation < 2% for <b>the first time</b> since 2021"),
            "Inflation < 2% for the first time since 2021"
        );
        assert_eq!(strip_markup("a <3 b <!-- note --> c"), "a <3 b c");
        assert_eq!(strip_markup("ends with <"), "ends with <");
    }

    #[test]
    fn parses_proxy_and_rfc_dates() {
        assert!(parse_pub_date("2025-07-01 09:30:00").is_some());
        assert!(parse_pub_date("Tue, 01 Jul 2025 09:30:00 GMT").is_some());
        assert!(parse_pub_date("2025-07-01T09:30:00Z").is_some());
        assert!(parse_pub_date("yesterday").is_none());
    }
}
