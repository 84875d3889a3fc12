use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::data::ConsistencyIssue;
use crate::feed::FeedSnapshot;
use crate::listing::{available_filters, select, SortOrder};
use crate::logging::{log_view_written, ProfileScope};
use crate::render::{render_page, render_scan_page, view_file_name, PageContext};
use crate::scan::ScanOutcome;
use crate::state::AppState;
use crate::stats::Stats;

#[derive(Debug, Clone, Serialize)]
pub struct BuildManifest {
    pub generated_at: String,
    pub data_fingerprint: Option<String>,
    pub record_count: usize,
    pub views: Vec<String>,
    pub issues: Vec<ConsistencyIssue>,
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub pages: Vec<PathBuf>,
    pub manifest: BuildManifest,
}

fn write_page(out_dir: &Path, rel: &str, html: &str) -> Result<PathBuf> {
    let path = out_dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, html).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Writes the index, one page per filter/sort view, the scan page and
/// `manifest.json` into `out_dir`.
pub fn build_site(
    out_dir: &Path,
    state: &AppState,
    stats: &Stats,
    scan: &ScanOutcome,
    feed: Option<&FeedSnapshot>,
    now: DateTime<Utc>,
) -> Result<BuildReport> {
    let _scope = ProfileScope::with_context(
        "build_site",
        &[("out_dir", crate::logging::v_str(&out_dir.to_string_lossy()))],
    );
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut pages = Vec::new();
    let mut views = Vec::new();
    let mut seen = BTreeSet::new();

    for filter in available_filters(state) {
        for sort in SortOrder::ALL {
            let rel = view_file_name(&filter, sort);
            if !seen.insert(rel.clone()) {
                bail!("two views map to {}", rel);
            }
            let html = render_page(&PageContext {
                state,
                stats,
                filter: &filter,
                sort,
                root: "../",
                feed,
            });
            pages.push(write_page(out_dir, &rel, &html)?);
            log_view_written(
                &rel,
                &out_dir.join(&rel).to_string_lossy(),
                select(&state.records, &filter, sort).len(),
            );
            views.push(rel);
        }
    }

    let index = render_page(&PageContext {
        state,
        stats,
        filter: &crate::listing::Filter::All,
        sort: SortOrder::Recent,
        root: "",
        feed,
    });
    pages.push(write_page(out_dir, "index.html", &index)?);
    log_view_written("index.html", &out_dir.join("index.html").to_string_lossy(), state.total_count());

    pages.push(write_page(out_dir, "scan.html", &render_scan_page(state, scan))?);

    let manifest = BuildManifest {
        generated_at: now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        data_fingerprint: state.fingerprint.clone(),
        record_count: state.total_count(),
        views,
        issues: state.issues.clone(),
    };
    let manifest_path = out_dir.join("manifest.json");
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;
    pages.push(manifest_path);

    Ok(BuildReport { pages, manifest })
}
