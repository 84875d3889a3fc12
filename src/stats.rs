use chrono::NaiveDate;

use crate::state::AppState;

/// Average month length used to turn days in power into months.
pub const AVG_DAYS_PER_MONTH: f64 = 30.44;

/// Headline numbers shown above the leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub total: usize,
    pub days_in_power: i64,
    pub months_in_power: f64,
    pub rate_per_month: f64,
    /// `None` when there are no records.
    pub fastest: Option<i64>,
}

impl Stats {
    pub fn compute(state: &AppState, start: NaiveDate, today: NaiveDate) -> Self {
        let days_in_power = (today - start).num_days().max(0);
        let months_in_power = days_in_power as f64 / AVG_DAYS_PER_MONTH;
        let total = state.total_count();
        let rate_per_month = if months_in_power > 0.0 {
            total as f64 / months_in_power
        } else {
            0.0
        };
        Self {
            total,
            days_in_power,
            months_in_power,
            rate_per_month,
            fastest: fastest_uturn(state),
        }
    }

    pub fn rate_display(&self) -> String {
        format!("{:.1}", self.rate_per_month)
    }

    pub fn fastest_display(&self) -> String {
        match self.fastest {
            Some(days) => days.to_string(),
            None => "no data".to_string(),
        }
    }
}

pub fn fastest_uturn(state: &AppState) -> Option<i64> {
    state.records.iter().map(|r| r.days_to_uturn).min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Uturn;

    fn state_with_days(days: &[i64]) -> AppState {
        let mut state = AppState::default();
        for (i, d) in days.iter().enumerate() {
            state.records.push(Uturn {
                id: i as u64 + 1,
                days_to_uturn: *d,
                ..Default::default()
            });
        }
        state
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn fastest_is_minimum() {
        let state = state_with_days(&[45, 12, 300]);
        assert_eq!(fastest_uturn(&state), Some(12));
    }

    #[test]
    fn empty_state_has_no_fastest() {
        let stats = Stats::compute(&AppState::default(), date(2024, 7, 5), date(2025, 7, 5));
        assert_eq!(stats.fastest, None);
        assert_eq!(stats.fastest_display(), "no data");
        assert_eq!(stats.rate_display(), "0.0");
    }

    #[test]
    fn rate_uses_average_month() {
        let state = state_with_days(&[1; 10]);
        let stats = Stats::compute(&state, date(2024, 7, 5), date(2025, 7, 5));
        assert_eq!(stats.days_in_power, 365);
        // 10 / (365 / 30.44) = 0.834
        assert_eq!(stats.rate_display(), "0.8");
    }

    #[test]
    fn before_start_clamps_to_zero() {
        let state = state_with_days(&[3]);
        let stats = Stats::compute(&state, date(2024, 7, 5), date(2024, 7, 1));
        assert_eq!(stats.days_in_power, 0);
        assert_eq!(stats.rate_per_month, 0.0);
    }
}
