use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::path::Path;

use crate::data::{
    self, consistency_report, file_sha256, load_document, Category, ConsistencyIssue, Document,
    Meta, MinisterEntry, Uturn,
};
use crate::logging::{log_data_failure, log_data_loaded};

#[derive(Clone, Debug)]
pub struct Config {
    pub data_path: String,
    pub out_dir: String,
    pub store_path: String,
    pub government_start: NaiveDate,
    pub scan_mode: String,
    pub api_key: Option<String>,
    pub anthropic_base: String,
    pub scan_model: String,
    pub scan_max_tokens: u32,
    pub scan_stage_ms: u64,
    pub feed_proxy: String,
    pub feed_mirrors: Vec<String>,
    pub feed_accounts: Vec<String>,
    pub feed_keywords: Vec<String>,
    pub feed_timeout_secs: u64,
    pub feed_poll_secs: u64,
    pub feed_max_posts: usize,
}

pub const DEFAULT_GOVERNMENT_START: &str = "2024-07-05";

fn list_var(name: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(name) {
        Ok(v) => v
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => default.iter().map(|s| s.to_string()).collect(),
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            data_path: std::env::var("DATA_PATH").unwrap_or_else(|_| data::DEFAULT_DATA_PATH.to_string()),
            out_dir: std::env::var("OUT_DIR").unwrap_or_else(|_| "out/site".to_string()),
            store_path: std::env::var("STORE_PATH").unwrap_or_else(|_| "./tracker.sqlite".to_string()),
            government_start: std::env::var("GOVERNMENT_START").ok().and_then(|v| data::parse_date(&v)).unwrap_or_else(default_government_start),
            scan_mode: std::env::var("SCAN_MODE").unwrap_or_else(|_| "disabled".to_string()),
            api_key: std::env::var("ANTHROPIC_API_KEY").ok().filter(|v| !v.trim().is_empty()),
            anthropic_base: std::env::var("ANTHROPIC_BASE").unwrap_or_else(|_| "https://api.anthropic.com".to_string()),
            scan_model: std::env::var("SCAN_MODEL").unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            scan_max_tokens: std::env::var("SCAN_MAX_TOKENS").ok().and_then(|v| v.parse().ok()).unwrap_or(1000),
            scan_stage_ms: std::env::var("SCAN_STAGE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(800),
            feed_proxy: std::env::var("FEED_PROXY").unwrap_or_else(|_| "https://api.rss2json.com/v1/api.json".to_string()),
            feed_mirrors: list_var("FEED_MIRRORS", &["nitter.net", "nitter.poast.org", "nitter.privacydev.net"]),
            feed_accounts: list_var("FEED_ACCOUNTS", &["BBCPolitics", "SkyNewsPolitics", "PoliticsHome", "UKLabour", "Keir_Starmer", "hmtreasury"]),
            feed_keywords: list_var("FEED_KEYWORDS", &["u-turn", "uturn", "reversal", "backs down", "climbdown", "scrapped", "rethink"]),
            feed_timeout_secs: std::env::var("FEED_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(5),
            feed_poll_secs: std::env::var("FEED_POLL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(300),
            feed_max_posts: std::env::var("FEED_MAX_POSTS").ok().and_then(|v| v.parse().ok()).unwrap_or(20),
        }
    }
}

fn default_government_start() -> NaiveDate {
    data::parse_date(DEFAULT_GOVERNMENT_START).unwrap_or_default()
}

// =============================================================================
// Application state
// =============================================================================

/// One row of the minister leaderboard. The count is always derived from the
/// record list, never read from the document.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub name: String,
    pub role: String,
    pub uturns: usize,
}

/// Fields for a manually added record; the id is assigned on insert.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewUturn {
    pub title: String,
    pub category: String,
    pub severity: String,
    pub original_policy: String,
    pub reversal: String,
    pub second_reversal: Option<String>,
    pub summary: String,
    pub minister: String,
    pub date_announced: String,
    pub date_reversed: String,
    pub days_to_uturn: Option<i64>,
}

/// The in-memory working copy of the data document, passed explicitly to
/// everything that renders or queries it.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub records: Vec<Uturn>,
    /// name -> role label
    pub ministers: BTreeMap<String, String>,
    pub categories: BTreeMap<String, Category>,
    pub last_updated: String,
    pub fingerprint: Option<String>,
    pub issues: Vec<ConsistencyIssue>,
}

impl AppState {
    pub fn from_document(doc: Document) -> Self {
        let issues = consistency_report(&doc);
        Self {
            ministers: doc
                .ministers
                .into_iter()
                .map(|(name, entry)| (name, entry.role))
                .collect(),
            categories: doc.categories,
            records: doc.uturns,
            last_updated: doc.meta.last_updated,
            fingerprint: None,
            issues,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let doc = load_document(path)?;
        let mut state = Self::from_document(doc);
        state.fingerprint = file_sha256(path).ok();
        log_data_loaded(
            &path.to_string_lossy(),
            state.records.len(),
            state.fingerprint.as_deref().unwrap_or(""),
        );
        Ok(state)
    }

    /// Load failures are logged and yield an empty state so every view still
    /// renders (empty).
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(state) => state,
            Err(err) => {
                log_data_failure(&path.to_string_lossy(), &format!("{:#}", err));
                Self::default()
            }
        }
    }

    /// Writes the stored aggregates from the derived views. Ministers named only
    /// on records join the roster with an empty role.
    pub fn to_document(&self) -> Document {
        let ministers = self
            .leaderboard()
            .into_iter()
            .map(|e| {
                (
                    e.name,
                    MinisterEntry {
                        role: e.role,
                        uturns: e.uturns,
                    },
                )
            })
            .collect();
        Document {
            meta: Meta {
                total_count: self.total_count(),
                last_updated: self.last_updated.clone(),
            },
            ministers,
            categories: self.categories.clone(),
            uturns: self.records.clone(),
        }
    }

    pub fn total_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn minister_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for r in &self.records {
            *counts.entry(r.minister.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn minister_count(&self, name: &str) -> usize {
        self.records.iter().filter(|r| r.minister == name).count()
    }

    /// Roster ministers plus any name that only appears on records, ranked by
    /// count descending then name.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let counts = self.minister_counts();
        let mut entries: Vec<LeaderboardEntry> = self
            .ministers
            .iter()
            .map(|(name, role)| LeaderboardEntry {
                name: name.clone(),
                role: role.clone(),
                uturns: counts.get(name).copied().unwrap_or(0),
            })
            .collect();
        for (name, count) in &counts {
            if !name.is_empty() && !self.ministers.contains_key(name) {
                entries.push(LeaderboardEntry {
                    name: name.clone(),
                    role: String::new(),
                    uturns: *count,
                });
            }
        }
        entries.sort_by(|a, b| b.uturns.cmp(&a.uturns).then_with(|| a.name.cmp(&b.name)));
        entries
    }

    /// Category for a key, or a placeholder when the key is not in the map.
    pub fn category(&self, key: &str) -> Category {
        self.categories.get(key).cloned().unwrap_or_else(|| Category {
            name: "Unknown category".to_string(),
            emoji: "❓".to_string(),
        })
    }

    /// Appends a record with the next free id and refreshes `last_updated`.
    pub fn add_uturn(&mut self, new: NewUturn, now: DateTime<Utc>) -> u64 {
        let id = self.records.iter().map(|r| r.id).max().map(|m| m + 1).unwrap_or(1);
        let mut record = Uturn {
            id,
            title: new.title,
            category: new.category,
            severity: new.severity,
            original_policy: new.original_policy,
            reversal: new.reversal,
            second_reversal: new.second_reversal,
            summary: new.summary,
            minister: new.minister,
            date_announced: new.date_announced,
            date_reversed: new.date_reversed,
            days_to_uturn: 0,
        };
        record.days_to_uturn = new
            .days_to_uturn
            .or_else(|| record.computed_days())
            .unwrap_or(0);
        self.records.push(record);
        self.last_updated = now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> AppState {
        let mut state = AppState::default();
        state.ministers.insert("Rachel Reeves".into(), "Chancellor".into());
        state.ministers.insert("Liz Kendall".into(), "Work and Pensions".into());
        state.ministers.insert("Idle Minister".into(), "Without Portfolio".into());
        for (id, minister) in [(1, "Rachel Reeves"), (2, "Rachel Reeves"), (3, "Liz Kendall")] {
            state.records.push(Uturn {
                id,
                minister: minister.into(),
                ..Default::default()
            });
        }
        state
    }

    #[test]
    fn leaderboard_derives_counts_and_ranks() {
        let board = sample().leaderboard();
        let names: Vec<&str> = board.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Rachel Reeves", "Liz Kendall", "Idle Minister"]);
        assert_eq!(board[0].uturns, 2);
        assert_eq!(board[2].uturns, 0);
    }

    #[test]
    fn leaderboard_includes_unlisted_ministers() {
        let mut state = sample();
        state.records.push(Uturn { id: 4, minister: "Backbencher".into(), ..Default::default() });
        let board = state.leaderboard();
        let unlisted = board.iter().find(|e| e.name == "Backbencher").unwrap();
        assert_eq!(unlisted.uturns, 1);
        assert_eq!(unlisted.role, "");
    }

    #[test]
    fn unknown_category_falls_back() {
        let state = sample();
        assert_eq!(state.category("nope").name, "Unknown category");
    }

    #[test]
    fn add_assigns_next_id_and_days() {
        let mut state = sample();
        let now = Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap();
        let id = state.add_uturn(
            NewUturn {
                minister: "Liz Kendall".into(),
                date_announced: "2025-03-18".into(),
                date_reversed: "2025-07-01".into(),
                ..Default::default()
            },
            now,
        );
        assert_eq!(id, 4);
        assert_eq!(state.records.last().unwrap().days_to_uturn, 105);
        assert_eq!(state.last_updated, "2025-09-01T12:00:00Z");
    }

    #[test]
    fn add_to_empty_state_starts_at_one() {
        let mut state = AppState::default();
        let id = state.add_uturn(NewUturn::default(), Utc::now());
        assert_eq!(id, 1);
    }

    #[test]
    fn document_round_trip_regenerates_aggregates() {
        let doc = sample().to_document();
        assert_eq!(doc.meta.total_count, 3);
        assert_eq!(doc.ministers["Rachel Reeves"].uturns, 2);
        assert_eq!(doc.ministers["Idle Minister"].uturns, 0);
    }
}
