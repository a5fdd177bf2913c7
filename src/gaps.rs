use crate::schema::{AdRecord, BusinessRecord, Granularity};
use crate::utils::{expected_periods, period_end, period_start};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    MissingBusiness,
    MissingAds,
    MissingBoth,
}

impl GapType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GapType::MissingBusiness => "missing_business",
            GapType::MissingAds => "missing_ads",
            GapType::MissingBoth => "missing_both",
        }
    }
}

impl fmt::Display for GapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expected reporting period for which one or both source tables lack
/// data for a seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapRecord {
    pub seller_id: i64,
    pub seller_name: Option<String>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub granularity: Granularity,
    pub gap_type: GapType,
    pub has_business_data: bool,
    pub has_ads_data: bool,
}

/// Per-seller data coverage: observed date ranges and period counts for
/// both source tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub seller_id: i64,
    pub seller_name: Option<String>,
    pub business_first_period: Option<NaiveDate>,
    pub business_last_period: Option<NaiveDate>,
    pub business_period_count: usize,
    pub business_weekly_periods: usize,
    pub business_monthly_periods: usize,
    pub ads_first_date: Option<NaiveDate>,
    pub ads_last_date: Option<NaiveDate>,
    pub ads_day_count: usize,
}

/// Classify every expected period between the earliest and latest observed
/// period per seller. Fully covered periods are omitted from the output.
pub fn detect_data_gaps(
    business: &[BusinessRecord],
    ads: &[AdRecord],
    granularity: Granularity,
) -> Vec<GapRecord> {
    let mut gaps = Vec::new();

    for seller_id in all_sellers(business, ads) {
        let seller_name = seller_name_for(business, seller_id);

        let business_periods: BTreeSet<NaiveDate> = business
            .iter()
            .filter(|r| r.seller_id == seller_id && r.period_granularity == granularity)
            .map(|r| r.period_start_date)
            .collect();

        let ads_periods: BTreeSet<NaiveDate> = ads
            .iter()
            .filter(|r| r.seller_id == seller_id)
            .map(|r| period_start(r.record_date, granularity))
            .collect();

        let all_periods: BTreeSet<NaiveDate> =
            business_periods.union(&ads_periods).copied().collect();

        let (Some(&min_date), Some(&max_date)) =
            (all_periods.iter().next(), all_periods.iter().next_back())
        else {
            continue;
        };

        for period in expected_periods(min_date, max_date, granularity) {
            let has_business = business_periods.contains(&period);
            let has_ads = ads_periods.contains(&period);

            let gap_type = match (has_business, has_ads) {
                (true, true) => continue,
                (false, false) => GapType::MissingBoth,
                (false, true) => GapType::MissingBusiness,
                (true, false) => GapType::MissingAds,
            };

            gaps.push(GapRecord {
                seller_id,
                seller_name: seller_name.clone(),
                period_start: period,
                period_end: period_end(period, granularity),
                granularity,
                gap_type,
                has_business_data: has_business,
                has_ads_data: has_ads,
            });
        }
    }

    gaps
}

/// Coverage summary for every seller present in either table, sorted by
/// seller name.
pub fn coverage_summary(business: &[BusinessRecord], ads: &[AdRecord]) -> Vec<CoverageSummary> {
    let mut summaries: Vec<CoverageSummary> = all_sellers(business, ads)
        .into_iter()
        .map(|seller_id| {
            let seller_rows: Vec<&BusinessRecord> = business
                .iter()
                .filter(|r| r.seller_id == seller_id)
                .collect();

            let business_periods: BTreeSet<NaiveDate> =
                seller_rows.iter().map(|r| r.period_start_date).collect();

            let count_granularity = |granularity: Granularity| {
                seller_rows
                    .iter()
                    .filter(|r| r.period_granularity == granularity)
                    .map(|r| r.period_start_date)
                    .collect::<BTreeSet<_>>()
                    .len()
            };

            let ad_days: BTreeSet<NaiveDate> = ads
                .iter()
                .filter(|r| r.seller_id == seller_id)
                .map(|r| r.record_date)
                .collect();

            CoverageSummary {
                seller_id,
                seller_name: seller_name_for(business, seller_id),
                business_first_period: business_periods.iter().next().copied(),
                business_last_period: business_periods.iter().next_back().copied(),
                business_period_count: business_periods.len(),
                business_weekly_periods: count_granularity(Granularity::Weekly),
                business_monthly_periods: count_granularity(Granularity::Monthly),
                ads_first_date: ad_days.iter().next().copied(),
                ads_last_date: ad_days.iter().next_back().copied(),
                ads_day_count: ad_days.len(),
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        a.seller_name
            .cmp(&b.seller_name)
            .then(a.seller_id.cmp(&b.seller_id))
    });
    summaries
}

fn all_sellers(business: &[BusinessRecord], ads: &[AdRecord]) -> BTreeSet<i64> {
    business
        .iter()
        .map(|r| r.seller_id)
        .chain(ads.iter().map(|r| r.seller_id))
        .collect()
}

fn seller_name_for(business: &[BusinessRecord], seller_id: i64) -> Option<String> {
    business
        .iter()
        .find(|r| r.seller_id == seller_id)
        .map(|r| r.seller_name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn biz(seller_id: i64, period: &str, granularity: Granularity) -> BusinessRecord {
        BusinessRecord {
            seller_id,
            seller_name: format!("Seller {}", seller_id),
            child_asin: "B001".to_string(),
            period_start_date: period.parse().unwrap(),
            period_granularity: granularity,
            sales_total: 100.0,
            sessions_total: None,
            units_total: None,
            page_views_total: None,
        }
    }

    fn ad(seller_id: i64, date: &str) -> AdRecord {
        AdRecord {
            seller_id,
            child_asin: "B001".to_string(),
            record_date: date.parse().unwrap(),
            spend: 1.0,
            ad_sales: 2.0,
            impressions: 100.0,
            clicks: 1.0,
            ad_orders: None,
            ad_units: None,
        }
    }

    #[test]
    fn test_full_coverage_yields_no_gaps() {
        let business = vec![
            biz(1, "2025-01-05", Granularity::Weekly),
            biz(1, "2025-01-12", Granularity::Weekly),
            biz(1, "2025-01-19", Granularity::Weekly),
        ];
        let ads = vec![
            ad(1, "2025-01-06"),
            ad(1, "2025-01-14"),
            ad(1, "2025-01-20"),
        ];

        assert!(detect_data_gaps(&business, &ads, Granularity::Weekly).is_empty());
    }

    #[test]
    fn test_missing_business_week_detected() {
        // Business data skips the Jan 12 week; ads cover all three.
        let business = vec![
            biz(1, "2025-01-05", Granularity::Weekly),
            biz(1, "2025-01-19", Granularity::Weekly),
        ];
        let ads = vec![
            ad(1, "2025-01-06"),
            ad(1, "2025-01-14"),
            ad(1, "2025-01-20"),
        ];

        let gaps = detect_data_gaps(&business, &ads, Granularity::Weekly);
        assert_eq!(gaps.len(), 1);

        let gap = &gaps[0];
        assert_eq!(gap.gap_type, GapType::MissingBusiness);
        assert_eq!(gap.period_start, "2025-01-12".parse::<NaiveDate>().unwrap());
        assert_eq!(gap.period_end, "2025-01-18".parse::<NaiveDate>().unwrap());
        assert!(!gap.has_business_data);
        assert!(gap.has_ads_data);
    }

    #[test]
    fn test_missing_both_in_middle_of_range() {
        let business = vec![
            biz(1, "2025-01-05", Granularity::Weekly),
            biz(1, "2025-01-26", Granularity::Weekly),
        ];
        let ads = vec![ad(1, "2025-01-06"), ad(1, "2025-01-27")];

        let gaps = detect_data_gaps(&business, &ads, Granularity::Weekly);
        assert_eq!(gaps.len(), 2);
        assert!(gaps.iter().all(|g| g.gap_type == GapType::MissingBoth));
    }

    #[test]
    fn test_monthly_gap_spans_calendar_month() {
        let business = vec![
            biz(1, "2025-01-01", Granularity::Monthly),
            biz(1, "2025-03-01", Granularity::Monthly),
        ];

        let gaps = detect_data_gaps(&business, &[], Granularity::Monthly);

        let february = gaps
            .iter()
            .find(|g| g.period_start == "2025-02-01".parse::<NaiveDate>().unwrap())
            .unwrap();
        assert_eq!(
            february.period_end,
            "2025-02-28".parse::<NaiveDate>().unwrap()
        );
        // No ads at all: January and March are missing_ads, February both.
        assert_eq!(february.gap_type, GapType::MissingBoth);
        assert_eq!(gaps.len(), 3);
    }

    #[test]
    fn test_sellers_tracked_independently() {
        let business = vec![
            biz(1, "2025-01-05", Granularity::Weekly),
            biz(2, "2025-01-05", Granularity::Weekly),
            biz(2, "2025-01-19", Granularity::Weekly),
        ];

        let gaps = detect_data_gaps(&business, &[], Granularity::Weekly);

        // Seller 1 spans one week (missing ads only); seller 2 spans three
        // weeks with the middle one absent from business too.
        let seller_two: Vec<&GapRecord> = gaps.iter().filter(|g| g.seller_id == 2).collect();
        assert_eq!(seller_two.len(), 3);
        assert_eq!(
            seller_two
                .iter()
                .filter(|g| g.gap_type == GapType::MissingBoth)
                .count(),
            1
        );
    }

    #[test]
    fn test_coverage_summary_counts() {
        let business = vec![
            biz(1, "2025-01-05", Granularity::Weekly),
            biz(1, "2025-01-12", Granularity::Weekly),
            biz(1, "2025-01-01", Granularity::Monthly),
        ];
        let ads = vec![ad(1, "2025-01-06"), ad(1, "2025-01-07")];

        let summaries = coverage_summary(&business, &ads);
        assert_eq!(summaries.len(), 1);

        let summary = &summaries[0];
        assert_eq!(summary.business_period_count, 3);
        assert_eq!(summary.business_weekly_periods, 2);
        assert_eq!(summary.business_monthly_periods, 1);
        assert_eq!(summary.ads_day_count, 2);
        assert_eq!(
            summary.business_first_period,
            Some("2025-01-01".parse().unwrap())
        );
        assert_eq!(summary.ads_last_date, Some("2025-01-07".parse().unwrap()));
    }

    #[test]
    fn test_empty_tables_produce_empty_reports() {
        assert!(detect_data_gaps(&[], &[], Granularity::Weekly).is_empty());
        assert!(coverage_summary(&[], &[]).is_empty());
    }
}
