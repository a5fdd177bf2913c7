use crate::schema::Granularity;
use chrono::{Datelike, Days, NaiveDate};

/// Returns the Sunday on or before the given date.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let days_since_sunday = (date.weekday().num_days_from_monday() + 1) % 7;
    date.checked_sub_days(Days::new(days_since_sunday as u64))
        .unwrap_or(date)
}

/// Returns the first day of the month the given date falls in.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap()
        .checked_sub_days(Days::new(1))
        .unwrap()
}

pub fn next_month_start(date: NaiveDate) -> NaiveDate {
    let year = if date.month() == 12 {
        date.year() + 1
    } else {
        date.year()
    };

    let month = if date.month() == 12 {
        1
    } else {
        date.month() + 1
    };

    NaiveDate::from_ymd_opt(year, month, 1).unwrap()
}

/// Bucket a calendar date to its period start for the given granularity.
pub fn period_start(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    match granularity {
        Granularity::Weekly => week_start(date),
        Granularity::Monthly => month_start(date),
    }
}

/// Inclusive end of the period that starts on `start`: Saturday for a weekly
/// period, the last calendar day of the month for a monthly one.
pub fn period_end(start: NaiveDate, granularity: Granularity) -> NaiveDate {
    match granularity {
        Granularity::Weekly => start
            .checked_add_days(Days::new(6))
            .unwrap_or(start),
        Granularity::Monthly => last_day_of_month(start.year(), start.month()),
    }
}

/// The continuous sequence of period starts covering `[min_date, max_date]`.
/// The first period is aligned to the granularity boundary on or before
/// `min_date`.
pub fn expected_periods(
    min_date: NaiveDate,
    max_date: NaiveDate,
    granularity: Granularity,
) -> Vec<NaiveDate> {
    let mut periods = Vec::new();
    let mut current = period_start(min_date, granularity);

    while current <= max_date {
        periods.push(current);
        current = match granularity {
            Granularity::Weekly => match current.checked_add_days(Days::new(7)) {
                Some(next) => next,
                None => break,
            },
            Granularity::Monthly => next_month_start(current),
        };
    }

    periods
}

pub fn same_month_prior_year(month: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(month.year() - 1, month.month(), 1).unwrap_or(month)
}

/// Column label for a period: "Jan_11" for weekly, "Jan_2025" for monthly.
pub fn period_label(date: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Weekly => date.format("%b_%d").to_string(),
        Granularity::Monthly => date.format("%b_%Y").to_string(),
    }
}
