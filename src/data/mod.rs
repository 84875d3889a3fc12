use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

pub const DEFAULT_DATA_PATH: &str = "data/uturns.json";

/// The static data document: `meta`, `ministers`, `categories`, `uturns`.
///
/// Every field defaults when absent so a partially filled document still loads;
/// blanks show up in the rendered page rather than failing the load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub meta: Meta,
    pub ministers: BTreeMap<String, MinisterEntry>,
    pub categories: BTreeMap<String, Category>,
    pub uturns: Vec<Uturn>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Meta {
    pub total_count: usize,
    pub last_updated: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MinisterEntry {
    pub role: String,
    pub uturns: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub name: String,
    pub emoji: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Uturn {
    pub id: u64,
    pub title: String,
    pub category: String,
    pub severity: String,
    pub original_policy: String,
    pub reversal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_reversal: Option<String>,
    pub summary: String,
    pub minister: String,
    pub date_announced: String,
    pub date_reversed: String,
    pub days_to_uturn: i64,
}

impl Uturn {
    pub fn is_major(&self) -> bool {
        self.severity == "major"
    }

    pub fn announced_on(&self) -> Option<NaiveDate> {
        parse_date(&self.date_announced)
    }

    pub fn reversed_on(&self) -> Option<NaiveDate> {
        parse_date(&self.date_reversed)
    }

    /// Days between the two dates, when both parse.
    pub fn computed_days(&self) -> Option<i64> {
        Some((self.reversed_on()? - self.announced_on()?).num_days())
    }

    pub fn has_second_reversal(&self) -> bool {
        self.second_reversal
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Accepts `YYYY-MM-DD` or anything starting with it (RFC 3339 timestamps).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()
}

pub fn load_document(path: &Path) -> Result<Document> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let doc: Document = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(doc)
}

pub fn save_document(path: &Path, doc: &Document) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let mut body = serde_json::to_string_pretty(doc)?;
    body.push('\n');
    fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

// =============================================================================
// Consistency
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsistencyIssue {
    TotalCountMismatch { stored: usize, actual: usize },
    MinisterCountMismatch { minister: String, stored: usize, actual: usize },
    DaysMismatch { id: u64, stored: i64, computed: i64 },
    UnparseableDates { id: u64 },
    UnknownCategory { id: u64, category: String },
    ReservedCategoryKey { key: String },
}

/// Filter names that a category key must not reuse.
pub const RESERVED_FILTER_KEYS: [&str; 2] = ["all", "major"];

impl std::fmt::Display for ConsistencyIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TotalCountMismatch { stored, actual } => {
                write!(f, "meta.totalCount is {} but there are {} records", stored, actual)
            }
            Self::MinisterCountMismatch { minister, stored, actual } => write!(
                f,
                "{} has a stored count of {} but {} records",
                minister, stored, actual
            ),
            Self::DaysMismatch { id, stored, computed } => write!(
                f,
                "record {}: daysToUturn is {} but the dates are {} days apart",
                id, stored, computed
            ),
            Self::UnparseableDates { id } => write!(f, "record {}: dates do not parse", id),
            Self::UnknownCategory { id, category } => {
                write!(f, "record {}: unknown category '{}'", id, category)
            }
            Self::ReservedCategoryKey { key } => write!(
                f,
                "category key '{}' is also a built-in filter; its views are written under cat-{}",
                key, key
            ),
        }
    }
}

/// Checks the stored aggregates and per-record day counts against the records.
/// Nothing is rejected; callers decide what to do with the issues.
pub fn consistency_report(doc: &Document) -> Vec<ConsistencyIssue> {
    let mut issues = Vec::new();

    if doc.meta.total_count != doc.uturns.len() {
        issues.push(ConsistencyIssue::TotalCountMismatch {
            stored: doc.meta.total_count,
            actual: doc.uturns.len(),
        });
    }

    for key in doc.categories.keys() {
        if RESERVED_FILTER_KEYS.contains(&key.as_str()) {
            issues.push(ConsistencyIssue::ReservedCategoryKey { key: key.clone() });
        }
    }

    for (name, entry) in &doc.ministers {
        let actual = doc.uturns.iter().filter(|u| &u.minister == name).count();
        if entry.uturns != actual {
            issues.push(ConsistencyIssue::MinisterCountMismatch {
                minister: name.clone(),
                stored: entry.uturns,
                actual,
            });
        }
    }

    for u in &doc.uturns {
        match u.computed_days() {
            Some(days) if days != u.days_to_uturn => issues.push(ConsistencyIssue::DaysMismatch {
                id: u.id,
                stored: u.days_to_uturn,
                computed: days,
            }),
            Some(_) => {}
            None => issues.push(ConsistencyIssue::UnparseableDates { id: u.id }),
        }
        if !doc.categories.contains_key(&u.category) {
            issues.push(ConsistencyIssue::UnknownCategory {
                id: u.id,
                category: u.category.clone(),
            });
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, minister: &str, announced: &str, reversed: &str, days: i64) -> Uturn {
        Uturn {
            id,
            title: format!("U-turn {}", id),
            category: "welfare".into(),
            severity: "minor".into(),
            minister: minister.into(),
            date_announced: announced.into(),
            date_reversed: reversed.into(),
            days_to_uturn: days,
            ..Default::default()
        }
    }

    #[test]
    fn parses_plain_and_timestamp_dates() {
        assert_eq!(parse_date("2024-07-05"), NaiveDate::from_ymd_opt(2024, 7, 5));
        assert_eq!(
            parse_date("2025-01-02T09:00:00Z"),
            NaiveDate::from_ymd_opt(2025, 1, 2)
        );
        assert_eq!(parse_date("July 5"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn missing_fields_default() {
        let doc: Document = serde_json::from_str(r#"{"uturns":[{"id":3,"title":"x"}]}"#).unwrap();
        assert_eq!(doc.uturns.len(), 1);
        assert_eq!(doc.uturns[0].minister, "");
        assert_eq!(doc.uturns[0].second_reversal, None);
        assert_eq!(doc.meta.total_count, 0);
    }

    #[test]
    fn computed_days_uses_both_dates() {
        let u = record(1, "A", "2024-07-29", "2024-08-10", 12);
        assert_eq!(u.computed_days(), Some(12));
    }

    #[test]
    fn report_flags_each_kind() {
        let mut doc = Document::default();
        doc.meta.total_count = 5;
        doc.categories.insert(
            "welfare".into(),
            Category { name: "Welfare".into(), emoji: "W".into() },
        );
        doc.ministers.insert("A".into(), MinisterEntry { role: "Chancellor".into(), uturns: 3 });
        doc.uturns.push(record(1, "A", "2024-07-29", "2024-08-10", 40));
        let mut bad = record(2, "B", "someday", "2024-08-10", 1);
        bad.category = "space".into();
        doc.uturns.push(bad);

        let issues = consistency_report(&doc);
        assert!(issues.contains(&ConsistencyIssue::TotalCountMismatch { stored: 5, actual: 2 }));
        assert!(issues.contains(&ConsistencyIssue::MinisterCountMismatch {
            minister: "A".into(),
            stored: 3,
            actual: 1
        }));
        assert!(issues.contains(&ConsistencyIssue::DaysMismatch { id: 1, stored: 40, computed: 12 }));
        assert!(issues.contains(&ConsistencyIssue::UnparseableDates { id: 2 }));
        assert!(issues.contains(&ConsistencyIssue::UnknownCategory {
            id: 2,
            category: "space".into()
        }));
    }

    #[test]
    fn report_flags_reserved_category_keys() {
        let mut doc = Document::default();
        doc.categories.insert("all".into(), Category::default());
        doc.categories.insert("welfare".into(), Category::default());
        assert_eq!(
            consistency_report(&doc),
            vec![ConsistencyIssue::ReservedCategoryKey { key: "all".into() }]
        );
    }

    #[test]
    fn consistent_document_has_no_issues() {
        let mut doc = Document::default();
        doc.meta.total_count = 1;
        doc.categories.insert("welfare".into(), Category::default());
        doc.ministers.insert("A".into(), MinisterEntry { role: String::new(), uturns: 1 });
        doc.uturns.push(record(1, "A", "2024-07-29", "2024-08-10", 12));
        assert!(consistency_report(&doc).is_empty());
    }
}
