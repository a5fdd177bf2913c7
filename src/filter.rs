use crate::schema::{AdRecord, BusinessRecord, Granularity, TimeRange};
use crate::utils::{month_start, week_start};
use chrono::NaiveDate;

/// All filters are conjunctive; an empty result is valid, not an error.
/// Week membership buckets the row date to its week start first, so daily
/// advertising rows match the week they fall in; month membership does the
/// same with the month start.
pub fn date_matches(range: &TimeRange, date: NaiveDate) -> bool {
    if let Some(start) = range.start_date {
        if date < start {
            return false;
        }
    }

    if let Some(end) = range.end_date {
        if date > end {
            return false;
        }
    }

    if !range.specific_weeks.is_empty() && !range.specific_weeks.contains(&week_start(date)) {
        return false;
    }

    if !range.specific_months.is_empty() && !range.specific_months.contains(&month_start(date)) {
        return false;
    }

    true
}

/// Restrict business rows to one granularity and the given time range.
pub fn filter_business(
    rows: &[BusinessRecord],
    range: &TimeRange,
    granularity: Option<Granularity>,
) -> Vec<BusinessRecord> {
    rows.iter()
        .filter(|row| granularity.map_or(true, |g| row.period_granularity == g))
        .filter(|row| date_matches(range, row.period_start_date))
        .cloned()
        .collect()
}

pub fn filter_ads(rows: &[AdRecord], range: &TimeRange) -> Vec<AdRecord> {
    rows.iter()
        .filter(|row| date_matches(range, row.record_date))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn biz(period: &str, granularity: Granularity) -> BusinessRecord {
        BusinessRecord {
            seller_id: 1,
            seller_name: "Acme".to_string(),
            child_asin: "B001".to_string(),
            period_start_date: period.parse().unwrap(),
            period_granularity: granularity,
            sales_total: 100.0,
            sessions_total: Some(10.0),
            units_total: Some(1.0),
            page_views_total: Some(20.0),
        }
    }

    fn ad(date: &str) -> AdRecord {
        AdRecord {
            seller_id: 1,
            child_asin: "B001".to_string(),
            record_date: date.parse().unwrap(),
            spend: 5.0,
            ad_sales: 20.0,
            impressions: 1000.0,
            clicks: 10.0,
            ad_orders: Some(2.0),
            ad_units: Some(2.0),
        }
    }

    #[test]
    fn test_granularity_filter() {
        let rows = vec![
            biz("2025-01-05", Granularity::Weekly),
            biz("2025-01-01", Granularity::Monthly),
        ];

        let weekly = filter_business(&rows, &TimeRange::default(), Some(Granularity::Weekly));
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].period_granularity, Granularity::Weekly);
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let rows = vec![
            biz("2025-01-05", Granularity::Weekly),
            biz("2025-01-12", Granularity::Weekly),
            biz("2025-01-19", Granularity::Weekly),
        ];

        let range = TimeRange {
            start_date: Some("2025-01-05".parse().unwrap()),
            end_date: Some("2025-01-12".parse().unwrap()),
            ..TimeRange::default()
        };

        let filtered = filter_business(&rows, &range, None);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_specific_weeks_match_daily_ad_rows() {
        let rows = vec![ad("2025-01-06"), ad("2025-01-08"), ad("2025-01-15")];

        let range = TimeRange {
            specific_weeks: vec!["2025-01-05".parse().unwrap()],
            ..TimeRange::default()
        };

        // Both days of the Jan 5 week survive; the Jan 12 week does not.
        let filtered = filter_ads(&rows, &range);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_specific_months_truncate_before_matching() {
        let rows = vec![
            biz("2025-01-05", Granularity::Weekly),
            biz("2025-02-02", Granularity::Weekly),
        ];

        let range = TimeRange::for_months(vec!["2025-01-01".parse().unwrap()]);

        let filtered = filter_business(&rows, &range, None);
        assert_eq!(filtered.len(), 1);
        assert_eq!(
            filtered[0].period_start_date,
            "2025-01-05".parse::<NaiveDate>().unwrap()
        );
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let rows = vec![ad("2025-01-06"), ad("2025-01-13")];

        let range = TimeRange {
            start_date: Some("2025-01-10".parse().unwrap()),
            specific_weeks: vec![
                "2025-01-05".parse().unwrap(),
                "2025-01-12".parse().unwrap(),
            ],
            ..TimeRange::default()
        };

        // Jan 6 is in a selected week but before start_date.
        let filtered = filter_ads(&rows, &range);
        assert_eq!(filtered.len(), 1);
        assert_eq!(
            filtered[0].record_date,
            "2025-01-13".parse::<NaiveDate>().unwrap()
        );
    }

    #[test]
    fn test_empty_result_is_valid() {
        let rows = vec![biz("2025-01-05", Granularity::Weekly)];
        let range = TimeRange {
            start_date: Some("2026-01-01".parse().unwrap()),
            ..TimeRange::default()
        };

        assert!(filter_business(&rows, &range, None).is_empty());
    }
}
