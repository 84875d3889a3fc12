use chrono::{NaiveDate, TimeZone, Utc};
use std::fs;
use tempfile::TempDir;

use uturn_tracker::data::{consistency_report, Category, ConsistencyIssue, Uturn};
use uturn_tracker::feed::{FeedSnapshot, EMPTY_STATE};
use uturn_tracker::scan::InfoScan;
use uturn_tracker::site::build_site;
use uturn_tracker::state::AppState;
use uturn_tracker::stats::Stats;

fn state() -> AppState {
    let mut state = AppState::default();
    state.last_updated = "2025-06-10T08:15:00Z".into();
    state.ministers.insert("Rachel Reeves".into(), "Chancellor".into());
    state.categories.insert(
        "welfare".into(),
        Category { name: "Welfare".into(), emoji: "🏥".into() },
    );
    state.categories.insert(
        "taxation".into(),
        Category { name: "Taxation".into(), emoji: "💷".into() },
    );
    state.records.push(Uturn {
        id: 1,
        title: "Winter fuel <payment>".into(),
        category: "welfare".into(),
        severity: "major".into(),
        minister: "Rachel Reeves".into(),
        date_announced: "2024-07-29".into(),
        date_reversed: "2025-06-09".into(),
        days_to_uturn: 315,
        ..Default::default()
    });
    state
}

fn stats(state: &AppState) -> Stats {
    Stats::compute(
        state,
        NaiveDate::from_ymd_opt(2024, 7, 5).unwrap(),
        NaiveDate::from_ymd_opt(2025, 7, 5).unwrap(),
    )
}

#[test]
fn writes_every_view_and_manifest() {
    let dir = TempDir::new().unwrap();
    let state = state();
    let scan = InfoScan::new(&state.last_updated).outcome();
    let now = Utc.with_ymd_and_hms(2025, 7, 5, 12, 0, 0).unwrap();

    let report = build_site(dir.path(), &state, &stats(&state), &scan, None, now).unwrap();

    // (all, major, taxation, welfare) x 3 sorts, plus index, scan and manifest
    assert_eq!(report.manifest.views.len(), 12);
    assert_eq!(report.pages.len(), 15);
    for view in &report.manifest.views {
        assert!(dir.path().join(view).is_file(), "missing {}", view);
    }

    let index = fs::read_to_string(dir.path().join("index.html")).unwrap();
    assert!(index.contains("Winter fuel &lt;payment&gt;"));
    assert!(!index.contains("<payment>"));
    assert!(index.contains("10 June 2025 at 08:15"));
    assert!(!index.contains("socialFeed"));

    let taxation = fs::read_to_string(dir.path().join("views/cat-taxation-recent.html")).unwrap();
    assert!(taxation.contains("No U-turns match this filter."));

    let scan_page = fs::read_to_string(dir.path().join("scan.html")).unwrap();
    assert!(scan_page.contains("https://www.bbc.co.uk/news/politics"));

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("manifest.json")).unwrap())
            .unwrap();
    assert_eq!(manifest["record_count"], 1);
    assert_eq!(manifest["generated_at"], "2025-07-05T12:00:00Z");
}

#[test]
fn empty_state_still_renders_every_view() {
    let dir = TempDir::new().unwrap();
    let state = AppState::default();
    let scan = InfoScan::new(&state.last_updated).outcome();
    let feed = FeedSnapshot {
        posts: Vec::new(),
        accounts_ok: 0,
        accounts_failed: 6,
        fetched_at: Utc::now(),
    };

    let report = build_site(
        dir.path(),
        &state,
        &stats(&state),
        &scan,
        Some(&feed),
        Utc::now(),
    )
    .unwrap();
    assert_eq!(report.manifest.views.len(), 6);

    let index = fs::read_to_string(dir.path().join("index.html")).unwrap();
    assert!(index.contains("no data"));
    assert!(index.contains(EMPTY_STATE));
}

#[test]
fn category_keyed_like_a_builtin_filter_gets_its_own_views() {
    let dir = TempDir::new().unwrap();
    let mut state = state();
    state.categories.remove("taxation");
    state.categories.insert(
        "all".into(),
        Category { name: "Everything".into(), emoji: "📦".into() },
    );
    state.issues = consistency_report(&state.to_document());
    assert!(state
        .issues
        .contains(&ConsistencyIssue::ReservedCategoryKey { key: "all".into() }));

    let scan = InfoScan::new(&state.last_updated).outcome();
    let report =
        build_site(dir.path(), &state, &stats(&state), &scan, None, Utc::now()).unwrap();

    let mut views = report.manifest.views.clone();
    views.sort();
    views.dedup();
    assert_eq!(views.len(), report.manifest.views.len());
    assert_eq!(views.len(), 12);

    let all = fs::read_to_string(dir.path().join("views/all-fastest.html")).unwrap();
    assert!(all.contains("Winter fuel &lt;payment&gt;"));
    assert!(!all.contains("No U-turns match this filter."));

    let category = fs::read_to_string(dir.path().join("views/cat-all-fastest.html")).unwrap();
    assert!(category.contains("No U-turns match this filter."));
    assert!(report.manifest.issues.contains(&ConsistencyIssue::ReservedCategoryKey {
        key: "all".into()
    }));
}
