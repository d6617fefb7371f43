pub mod stats;

use chrono::NaiveDate;

/// Cached streak fields carried on a habit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckinState {
    pub streak: u32,
    pub last_checkin: Option<NaiveDate>,
}

/// Applies a check-in on `today` to the cached streak.
///
/// The streak only grows when the previous check-in was exactly the day before.
/// Any other previous date, including one on or after `today`, restarts the run at 1.
pub fn next_checkin(state: CheckinState, today: NaiveDate) -> CheckinState {
    let streak = match state.last_checkin {
        Some(last) if today.pred_opt() == Some(last) => state.streak.saturating_add(1),
        _ => 1,
    };

    CheckinState {
        streak,
        last_checkin: Some(today),
    }
}

#[cfg(test)]
mod tests {
    use super::{CheckinState, next_checkin};
    use chrono::NaiveDate;

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    #[test]
    fn first_checkin_starts_at_one() {
        let next = next_checkin(CheckinState::default(), day("2024-01-01"));

        assert_eq!(next.streak, 1);
        assert_eq!(next.last_checkin, Some(day("2024-01-01")));
    }

    #[test]
    fn consecutive_day_extends_streak() {
        let state = CheckinState {
            streak: 6,
            last_checkin: Some(day("2024-02-28")),
        };

        assert_eq!(next_checkin(state, day("2024-02-29")).streak, 7);
    }

    #[test]
    fn gap_resets_streak() {
        let state = CheckinState {
            streak: 4,
            last_checkin: Some(day("2024-01-02")),
        };

        let next = next_checkin(state, day("2024-01-04"));
        assert_eq!(next.streak, 1);
        assert_eq!(next.last_checkin, Some(day("2024-01-04")));
    }

    #[test]
    fn backfilled_date_resets_streak() {
        let state = CheckinState {
            streak: 3,
            last_checkin: Some(day("2024-01-10")),
        };

        let next = next_checkin(state, day("2024-01-05"));
        assert_eq!(next.streak, 1);
        assert_eq!(next.last_checkin, Some(day("2024-01-05")));
    }

    #[test]
    fn consecutive_across_year_boundary() {
        let state = CheckinState {
            streak: 1,
            last_checkin: Some(day("2023-12-31")),
        };

        assert_eq!(next_checkin(state, day("2024-01-01")).streak, 2);
    }
}
