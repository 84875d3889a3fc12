use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::data::Uturn;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    Major,
    /// Exact category-key match.
    Category(String),
}

impl Filter {
    pub fn parse(s: &str) -> Self {
        match s {
            "all" => Filter::All,
            "major" => Filter::Major,
            other => Filter::Category(other.to_string()),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Filter::All => "all",
            Filter::Major => "major",
            Filter::Category(key) => key,
        }
    }

    pub fn matches(&self, record: &Uturn) -> bool {
        match self {
            Filter::All => true,
            Filter::Major => record.is_major(),
            Filter::Category(key) => &record.category == key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Recent,
    Fastest,
    Slowest,
}

impl SortOrder {
    pub const ALL: [SortOrder; 3] = [SortOrder::Recent, SortOrder::Fastest, SortOrder::Slowest];

    /// Unknown values fall back to `Recent`.
    pub fn parse(s: &str) -> Self {
        match s {
            "fastest" => SortOrder::Fastest,
            "slowest" => SortOrder::Slowest,
            _ => SortOrder::Recent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Recent => "recent",
            SortOrder::Fastest => "fastest",
            SortOrder::Slowest => "slowest",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Recent => "Most recent",
            SortOrder::Fastest => "Fastest U-turn",
            SortOrder::Slowest => "Slowest U-turn",
        }
    }
}

/// Dated entries first, missing dates last.
fn cmp_dates(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn cmp_dates_desc(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        _ => cmp_dates(a, b),
    }
}

/// Filters then sorts. `sort_by` is stable, so ties keep document order.
pub fn select<'a>(records: &'a [Uturn], filter: &Filter, sort: SortOrder) -> Vec<&'a Uturn> {
    let mut out: Vec<&Uturn> = records.iter().filter(|r| filter.matches(r)).collect();
    match sort {
        SortOrder::Recent => out.sort_by(|a, b| cmp_dates_desc(a.reversed_on(), b.reversed_on())),
        SortOrder::Fastest => out.sort_by(|a, b| a.days_to_uturn.cmp(&b.days_to_uturn)),
        SortOrder::Slowest => out.sort_by(|a, b| b.days_to_uturn.cmp(&a.days_to_uturn)),
    }
    out
}

/// The `n` quickest reversals.
pub fn speed_runs(records: &[Uturn], n: usize) -> Vec<&Uturn> {
    let mut out = select(records, &Filter::All, SortOrder::Fastest);
    out.truncate(n);
    out
}

/// Oldest reversal first.
pub fn timeline(records: &[Uturn]) -> Vec<&Uturn> {
    let mut out: Vec<&Uturn> = records.iter().collect();
    out.sort_by(|a, b| cmp_dates(a.reversed_on(), b.reversed_on()));
    out
}

/// "all", "major", then every category key in the map.
pub fn available_filters(state: &AppState) -> Vec<Filter> {
    let mut filters = vec![Filter::All, Filter::Major];
    filters.extend(state.categories.keys().map(|k| Filter::Category(k.clone())));
    filters
}
