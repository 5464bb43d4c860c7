//! Planning-horizon week generation.
//!
//! A quarter spans three calendar months. Each month contributes every Monday
//! that falls inside it, so a week is attributed to the month of its Monday
//! even when it runs into the next month. Ids run `W1, W2, ...` across the
//! whole quarter.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::error::{ServiceError, ServiceResult};
use crate::types::Week;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn validate_quarter(quarter: u8) -> ServiceResult<()> {
    if (1..=4).contains(&quarter) {
        Ok(())
    } else {
        Err(ServiceError::InvalidQuarter(quarter))
    }
}

/// Zero-based month indices covered by `quarter`.
pub fn quarter_months(quarter: u8) -> [u32; 3] {
    let first = 3 * (u32::from(quarter.clamp(1, 4)) - 1);
    [first, first + 1, first + 2]
}

pub fn quarter_of(date: NaiveDate) -> u8 {
    (date.month0() / 3 + 1) as u8
}

pub fn generate_weeks(quarter: u8, year: i32) -> ServiceResult<Vec<Week>> {
    validate_quarter(quarter)?;

    let mut weeks = Vec::new();
    for month0 in quarter_months(quarter) {
        let month = month0 + 1;
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            continue;
        };
        let last = last_day_of_month(first);
        let mut monday = first_monday_on_or_after(first);
        while monday <= last {
            weeks.push(Week {
                id: format!("W{}", weeks.len() + 1),
                date: monday.format("%d-%m").to_string(),
                month: MONTH_NAMES[month0 as usize].to_string(),
            });
            monday += Duration::days(7);
        }
    }
    Ok(weeks)
}

fn first_monday_on_or_after(date: NaiveDate) -> NaiveDate {
    let offset = (7 - date.weekday().num_days_from_monday()) % 7;
    date + Duration::days(i64::from(offset))
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

pub fn is_monday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Mon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn q4_2025_runs_october_to_december() {
        let weeks = generate_weeks(4, 2025).unwrap();
        assert_eq!(weeks.len(), 13);

        let first = &weeks[0];
        assert_eq!(first.id, "W1");
        assert_eq!(first.date, "06-10");
        assert_eq!(first.month, "October");

        let last = weeks.last().unwrap();
        assert_eq!(last.id, "W13");
        assert_eq!(last.date, "29-12");
        assert_eq!(last.month, "December");

        let mondays: Vec<NaiveDate> = weeks.iter().map(|w| w.monday(2025).unwrap()).collect();
        assert!(mondays.iter().all(|d| is_monday(*d)));
        assert!(mondays.windows(2).all(|w| w[0] < w[1]));
        for (i, week) in weeks.iter().enumerate() {
            assert_eq!(week.id, format!("W{}", i + 1));
        }
    }

    #[test]
    fn month_starting_on_monday_keeps_the_first() {
        // 1 April 2024 is a Monday.
        let weeks = generate_weeks(2, 2024).unwrap();
        assert_eq!(weeks[0].date, "01-04");
        assert_eq!(weeks[0].month, "April");
        assert_eq!(weeks.len(), 13);
        assert_eq!(weeks.last().unwrap().date, "24-06");
    }

    #[test]
    fn week_spanning_months_belongs_to_its_monday() {
        // Monday 29 September 2025 runs into October but stays in September.
        let weeks = generate_weeks(3, 2025).unwrap();
        let last = weeks.last().unwrap();
        assert_eq!(last.date, "29-09");
        assert_eq!(last.month, "September");
    }

    #[test]
    fn invalid_quarter_is_rejected() {
        assert!(matches!(
            generate_weeks(0, 2025),
            Err(ServiceError::InvalidQuarter(0))
        ));
        assert!(generate_weeks(5, 2025).is_err());
    }

    #[test]
    fn quarter_of_date() {
        assert_eq!(quarter_of(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()), 1);
        assert_eq!(quarter_of(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()), 4);
    }
}
