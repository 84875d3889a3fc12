//! HTML rendering. Everything user-supplied goes through `escape_html`.

use chrono::DateTime;
use std::fmt::Write;

use crate::data::parse_date;
use crate::feed::FeedSnapshot;
use crate::listing::{select, Filter, SortOrder};
use crate::scan::ScanOutcome;
use crate::state::AppState;
use crate::stats::Stats;

pub mod fragments;

const STYLE: &str = include_str!("style.css");

const COUNTER_SCRIPT: &str = "<script>(function(){var e=document.getElementById('totalCount');\
if(!e||!e.dataset.frames)return;var f=e.dataset.frames.split(',');var i=0;\
(function step(){e.textContent=f[i++];if(i<f.length)requestAnimationFrame(step);})();})();</script>";

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// "9 Jun 2025"; unparseable input is passed through unchanged.
pub fn format_date(s: &str) -> String {
    match parse_date(s) {
        Some(d) => d.format("%-d %b %Y").to_string(),
        None => s.to_string(),
    }
}

/// "1 July 2025 at 09:05"
pub fn format_last_updated(s: &str) -> String {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s.trim()) {
        return ts.format("%-d %B %Y at %H:%M").to_string();
    }
    match parse_date(s) {
        Some(d) => d.format("%-d %B %Y").to_string(),
        None if s.trim().is_empty() => "unknown".to_string(),
        None => s.to_string(),
    }
}

/// Lowercase ASCII letters, digits and `-` pass through; every other byte
/// becomes `_xx`, so distinct keys never share a file name.
fn slug(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        match b {
            b'a'..=b'z' | b'0'..=b'9' | b'-' => out.push(b as char),
            _ => {
                let _ = write!(out, "_{:02x}", b);
            }
        }
    }
    out
}

/// Output path of a view relative to the site root. Category views live under
/// a `cat-` prefix so a key like "all" cannot shadow the built-in filters.
pub fn view_file_name(filter: &Filter, sort: SortOrder) -> String {
    match filter {
        Filter::Category(key) => format!("views/cat-{}-{}.html", slug(key), sort.as_str()),
        other => format!("views/{}-{}.html", other.key(), sort.as_str()),
    }
}

/// Link to a view from a page living at `root` ("" for the site root,
/// "../" for pages under `views/`). The default view is the index page.
pub fn view_href(root: &str, filter: &Filter, sort: SortOrder) -> String {
    if *filter == Filter::All && sort == SortOrder::Recent {
        format!("{}index.html", root)
    } else {
        format!("{}{}", root, view_file_name(filter, sort))
    }
}

pub struct PageContext<'a> {
    pub state: &'a AppState,
    pub stats: &'a Stats,
    pub filter: &'a Filter,
    pub sort: SortOrder,
    pub root: &'a str,
    pub feed: Option<&'a FeedSnapshot>,
}

fn shell(title: &str, root: &str, last_updated: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en-GB">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
<header class="masthead">
  <h1><a href="{root}index.html">UK U-Turn Tracker</a></h1>
  <p class="last-update">Last updated: <span id="lastUpdate">{updated}</span></p>
</header>
<main>
{body}
</main>
<footer><a class="scan-link" id="scanNews" href="{root}scan.html">🔍 Scan for new U-turns</a></footer>
</body>
</html>
"#,
        title = escape_html(title),
        style = STYLE,
        root = root,
        updated = escape_html(&format_last_updated(last_updated)),
        body = body,
    )
}

pub fn render_page(ctx: &PageContext) -> String {
    let records = select(&ctx.state.records, ctx.filter, ctx.sort);
    let mut body = String::new();
    body.push_str(&fragments::stats_section(ctx.stats));
    body.push_str(&format!(
        "\n<section class=\"leaderboard\"><h2>Minister leaderboard</h2>\n<div id=\"ministerLeaderboard\">{}</div></section>\n",
        fragments::leaderboard(&ctx.state.leaderboard())
    ));
    body.push_str(&format!(
        "<section class=\"uturns\"><h2>Every U-turn</h2>\n{}\n<div id=\"uturnsGrid\">\n{}</div></section>\n",
        fragments::filter_bar(ctx.state, ctx.filter, ctx.sort, ctx.root),
        fragments::cards(ctx.state, &records)
    ));
    body.push_str(&format!(
        "<section class=\"speed-runs\"><h2>Speed run hall of fame</h2>\n<div id=\"speedRuns\">\n{}</div></section>\n",
        fragments::speed_run_list(&ctx.state.records)
    ));
    body.push_str(&format!(
        "<section class=\"timeline\"><h2>Timeline</h2>\n<div id=\"timeline\">\n{}</div></section>\n",
        fragments::timeline_list(&ctx.state.records)
    ));
    if let Some(feed) = ctx.feed {
        body.push_str(&format!(
            "<section class=\"feed\"><h2>Latest from the lobby</h2>\n<div id=\"socialFeed\">\n{}</div></section>\n",
            fragments::feed_list(feed)
        ));
    }
    body.push_str(COUNTER_SCRIPT);
    shell("UK U-Turn Tracker", ctx.root, &ctx.state.last_updated, &body)
}

pub fn render_scan_page(state: &AppState, outcome: &ScanOutcome) -> String {
    let body = format!(
        "<section class=\"scan-modal\"><h2>Scan for new U-turns</h2>\n<div id=\"scanResults\">{}</div></section>\n",
        fragments::scan_result(outcome)
    );
    shell("Scan for new U-turns", "", &state.last_updated, &body)
}
