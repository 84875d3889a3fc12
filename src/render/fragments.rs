use std::fmt::Write;

use super::{escape_html, format_date, format_last_updated, view_href};
use crate::animate::{CounterAnimation, FRAME};
use crate::data::Uturn;
use crate::feed::{FeedSnapshot, EMPTY_STATE};
use crate::listing::{speed_runs, timeline, Filter, SortOrder};
use crate::scan::ScanOutcome;
use crate::state::{AppState, LeaderboardEntry};
use crate::stats::Stats;

const PODIUM: [&str; 3] = ["🥇", "🥈", "🥉"];
const SPEED_MEDALS: [&str; 5] = ["🥇", "🥈", "🥉", "4️⃣", "5️⃣"];

pub fn stats_section(stats: &Stats) -> String {
    let frames = CounterAnimation::new(stats.total as u64)
        .frames(FRAME)
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!(
        r#"<section class="stats">
  <div class="stat"><span class="stat-value" id="totalCount" data-frames="{frames}">{total}</span><span class="stat-label">U-turns</span></div>
  <div class="stat"><span class="stat-value">{days}</span><span class="stat-label">Days in power</span></div>
  <div class="stat"><span class="stat-value">{rate}</span><span class="stat-label">U-turns per month</span></div>
  <div class="stat"><span class="stat-value">{fastest}</span><span class="stat-label">Fastest U-turn (days)</span></div>
</section>"#,
        frames = frames,
        total = stats.total,
        days = stats.days_in_power,
        rate = stats.rate_display(),
        fastest = escape_html(&stats.fastest_display()),
    )
}

fn rank_badge(index: usize) -> String {
    PODIUM
        .get(index)
        .map(|m| m.to_string())
        .unwrap_or_else(|| (index + 1).to_string())
}

pub fn leaderboard(entries: &[LeaderboardEntry]) -> String {
    if entries.is_empty() {
        return r#"<p class="empty">No ministers on record.</p>"#.to_string();
    }
    let mut out = String::new();
    for (i, e) in entries.iter().enumerate() {
        let _ = write!(
            out,
            r#"<div class="leader-card">
  <div class="leader-rank">{rank}</div>
  <div class="leader-info"><div class="leader-name">{name}</div><div class="leader-role">{role}</div></div>
  <div class="leader-count">{count}<span class="leader-count-label">U-turns</span></div>
</div>
"#,
            rank = rank_badge(i),
            name = escape_html(&e.name),
            role = escape_html(&e.role),
            count = e.uturns,
        );
    }
    out
}

pub fn card(state: &AppState, u: &Uturn) -> String {
    let category = state.category(&u.category);
    let second = match u.second_reversal.as_deref() {
        Some(s) if u.has_second_reversal() => format!(
            r#"<span class="policy-label">Double U-Turn</span>
      <p class="policy-reversal">↩↩ {}</p>
      "#,
            escape_html(s)
        ),
        _ => String::new(),
    };
    format!(
        r#"<article class="uturn-card {severity}">
  <div class="card-header"><span class="card-category">{emoji} {category}</span><span class="card-days">{days} days</span></div>
  <div class="card-body">
    <h3 class="card-title">{title}</h3>
    <div class="card-policy">
      <span class="policy-label">Original Position</span>
      <p class="policy-original">{original}</p>
      <span class="policy-label">U-Turn</span>
      <p class="policy-reversal">↩ {reversal}</p>
      {second}</div>
    <p class="card-summary">"{summary}"</p>
  </div>
  <div class="card-footer"><span class="card-minister">📌 {minister}</span><span class="card-date">{date}</span></div>
</article>
"#,
        severity = escape_html(&u.severity),
        emoji = escape_html(&category.emoji),
        category = escape_html(&category.name),
        days = u.days_to_uturn,
        title = escape_html(&u.title),
        original = escape_html(&u.original_policy),
        reversal = escape_html(&u.reversal),
        second = second,
        summary = escape_html(&u.summary),
        minister = escape_html(&u.minister),
        date = escape_html(&format_date(&u.date_reversed)),
    )
}

pub fn cards(state: &AppState, records: &[&Uturn]) -> String {
    if records.is_empty() {
        return r#"<p class="empty">No U-turns match this filter.</p>"#.to_string();
    }
    records.iter().map(|u| card(state, u)).collect()
}

pub fn filter_bar(state: &AppState, active: &Filter, sort: SortOrder, root: &str) -> String {
    let mut out = String::from(r#"<nav class="filters">"#);
    for filter in crate::listing::available_filters(state) {
        let label = match &filter {
            Filter::All => "All".to_string(),
            Filter::Major => "Major".to_string(),
            Filter::Category(key) => {
                let c = state.category(key);
                format!("{} {}", c.emoji, c.name)
            }
        };
        let class = if &filter == active { "filter-btn active" } else { "filter-btn" };
        let _ = write!(
            out,
            r#"<a class="{}" data-filter="{}" href="{}">{}</a>"#,
            class,
            escape_html(filter.key()),
            escape_html(&view_href(root, &filter, sort)),
            escape_html(label.trim()),
        );
    }
    out.push_str(r#"</nav><nav class="sort">"#);
    for order in SortOrder::ALL {
        let class = if order == sort { "sort-opt active" } else { "sort-opt" };
        let _ = write!(
            out,
            r#"<a class="{}" href="{}">{}</a>"#,
            class,
            escape_html(&view_href(root, active, order)),
            order.label(),
        );
    }
    out.push_str("</nav>");
    out
}

pub fn speed_run_list(records: &[Uturn]) -> String {
    let fastest = speed_runs(records, SPEED_MEDALS.len());
    if fastest.is_empty() {
        return r#"<p class="empty">No data yet.</p>"#.to_string();
    }
    let mut out = String::new();
    for (i, u) in fastest.iter().enumerate() {
        let _ = write!(
            out,
            r#"<div class="speed-card">
  <div class="speed-medal">{medal}</div>
  <div class="speed-days">{days}<span>days</span></div>
  <div class="speed-info"><div class="speed-title">{title}</div><div class="speed-detail">{from} → {to}</div></div>
</div>
"#,
            medal = SPEED_MEDALS[i],
            days = u.days_to_uturn,
            title = escape_html(&u.title),
            from = escape_html(&format_date(&u.date_announced)),
            to = escape_html(&format_date(&u.date_reversed)),
        );
    }
    out
}

pub fn timeline_list(records: &[Uturn]) -> String {
    let mut out = String::new();
    for u in timeline(records) {
        let _ = write!(
            out,
            r#"<div class="timeline-item"><div class="timeline-date">{}</div><div class="timeline-marker"></div><div class="timeline-content"><div class="timeline-title">{}</div></div></div>
"#,
            escape_html(&format_date(&u.date_reversed)),
            escape_html(&u.title),
        );
    }
    out
}

pub fn scan_result(outcome: &ScanOutcome) -> String {
    match outcome {
        ScanOutcome::NoNewUturns => {
            r#"<p class="scan-status">✅ Scan complete!</p><p><strong>No new U-turns detected today.</strong></p>"#
                .to_string()
        }
        ScanOutcome::Found(list) => {
            let mut out = format!(
                r#"<p class="scan-status">✅ Scan complete!</p><p><strong>Found {} possible new U-turn{}:</strong></p><ul class="scan-found">"#,
                list.len(),
                if list.len() == 1 { "" } else { "s" }
            );
            for c in list {
                let _ = write!(
                    out,
                    r#"<li><strong>{}</strong> ({})<br>{} ↩ {}</li>"#,
                    escape_html(&c.title),
                    escape_html(&format_date(&c.date)),
                    escape_html(&c.original_policy),
                    escape_html(&c.reversal),
                );
            }
            out.push_str("</ul>");
            out
        }
        ScanOutcome::Unparsed { excerpt } => format!(
            r#"<p class="scan-status">⚠️ Scan finished, but the results could not be read.</p><pre class="scan-raw">{}</pre>"#,
            escape_html(excerpt)
        ),
        ScanOutcome::Info { last_updated, links } => {
            let mut out = format!(
                r#"<p>Data last updated: <strong>{}</strong></p><p>Live scanning is switched off. New U-turns are added by hand; these are good places to watch:</p><ul class="scan-links">"#,
                escape_html(&format_last_updated(last_updated))
            );
            for link in links {
                let _ = write!(
                    out,
                    r#"<li><a href="{}" target="_blank" rel="noopener">{}</a></li>"#,
                    escape_html(&link.url),
                    escape_html(&link.label),
                );
            }
            out.push_str("</ul>");
            out
        }
    }
}

pub fn feed_list(snapshot: &FeedSnapshot) -> String {
    if snapshot.is_empty() {
        return format!(r#"<p class="empty">{}</p>"#, EMPTY_STATE);
    }
    let mut out = String::new();
    for p in &snapshot.posts {
        let when = p
            .published
            .map(|d| d.format("%-d %b %Y %H:%M").to_string())
            .unwrap_or_default();
        let _ = write!(
            out,
            r#"<div class="feed-post{hit}"><div class="feed-meta">@{account} · {when}</div><a class="feed-title" href="{link}" target="_blank" rel="noopener">{title}</a></div>
"#,
            hit = if p.keyword_hit { " keyword" } else { "" },
            account = escape_html(&p.account),
            when = escape_html(&when),
            link = escape_html(&p.link),
            title = escape_html(&p.title),
        );
    }
    out
}
