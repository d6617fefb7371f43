use chrono::{Days, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitStats {
    pub habit_id: i64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub completion_rate_30_days: f64,
    pub window_days: u32,
    pub total_completions: u64,
}

impl HabitStats {
    /// Builds statistics from the ascending list of completed check-in dates.
    ///
    /// `current_streak` is the cached value from the habit row and is not recomputed.
    pub fn compute(
        habit_id: i64,
        current_streak: u32,
        completed_dates: &[NaiveDate],
        today: NaiveDate,
        window_days: u32,
    ) -> Self {
        let completed = completed_in_window(completed_dates, today, window_days);

        Self {
            habit_id,
            current_streak,
            longest_streak: longest_run(completed_dates),
            completion_rate_30_days: completion_rate(completed, window_days),
            window_days,
            total_completions: completed_dates.len() as u64,
        }
    }
}

/// Longest run of consecutive calendar days in an ascending date sequence.
///
/// Duplicate or out-of-order dates break the run; they are never de-duplicated here.
pub fn longest_run(dates: &[NaiveDate]) -> u32 {
    let mut longest = 0_u32;
    let mut current = 0_u32;
    let mut previous: Option<NaiveDate> = None;

    for &date in dates {
        current = match previous {
            Some(prev) if prev.succ_opt() == Some(date) => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(date);
    }

    longest
}

/// First day of the trailing window of `window_days` days ending on `today`.
pub fn window_start(today: NaiveDate, window_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(window_days.saturating_sub(1))))
        .unwrap_or(NaiveDate::MIN)
}

pub fn completed_in_window(dates: &[NaiveDate], today: NaiveDate, window_days: u32) -> u32 {
    if window_days == 0 {
        return 0;
    }

    let start = window_start(today, window_days);
    dates
        .iter()
        .filter(|date| (start..=today).contains(*date))
        .count() as u32
}

/// Percentage of the window covered by completions, rounded to two decimals.
pub fn completion_rate(completed: u32, window_days: u32) -> f64 {
    if window_days == 0 {
        return 0.0;
    }

    let rate = f64::from(completed) / f64::from(window_days) * 100.0;
    (rate * 100.0).round() / 100.0
}
