use crate::hierarchy::AsinHierarchy;
use crate::metrics::{BaseMetrics, DerivedMetrics, MetricRow};
use crate::schema::{AdRecord, BusinessRecord, Granularity, Level};
use crate::utils::period_start;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Daily advertising rows summed to one row per (seller, child ASIN,
/// period start). Bucketing always happens before any level join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdPeriodRow {
    pub seller_id: i64,
    pub child_asin: String,
    pub period_start: NaiveDate,
    pub spend: f64,
    pub ad_sales: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub ad_orders: f64,
    pub ad_units: f64,
}

pub fn bucket_ads_to_period(ads: &[AdRecord], granularity: Granularity) -> Vec<AdPeriodRow> {
    let mut grouped: BTreeMap<(i64, String, NaiveDate), AdPeriodRow> = BTreeMap::new();

    for record in ads {
        let period = period_start(record.record_date, granularity);
        let key = (record.seller_id, record.child_asin.clone(), period);

        let row = grouped.entry(key).or_insert_with(|| AdPeriodRow {
            seller_id: record.seller_id,
            child_asin: record.child_asin.clone(),
            period_start: period,
            spend: 0.0,
            ad_sales: 0.0,
            impressions: 0.0,
            clicks: 0.0,
            ad_orders: 0.0,
            ad_units: 0.0,
        });

        row.spend += record.spend;
        row.ad_sales += record.ad_sales;
        row.impressions += record.impressions;
        row.clicks += record.clicks;
        row.ad_orders += record.ad_orders.unwrap_or(0.0);
        row.ad_units += record.ad_units.unwrap_or(0.0);
    }

    grouped.into_values().collect()
}

// Grouping key for one aggregated row. Fields outside the requested level
// stay None, which also gives BTreeMap a stable output order: seller,
// entity, period ascending.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    seller_id: Option<i64>,
    seller_name: Option<String>,
    normalized_name: Option<String>,
    child_asin: Option<String>,
    variant_name: Option<String>,
    period: NaiveDate,
}

impl GroupKey {
    fn for_level(level: Level, record: &BusinessRecord, hierarchy: &AsinHierarchy) -> Self {
        let period = record.period_start_date;

        match level {
            Level::Child => GroupKey {
                seller_id: Some(record.seller_id),
                seller_name: Some(record.seller_name.clone()),
                normalized_name: Some(resolve_parent(hierarchy, &record.child_asin)),
                child_asin: Some(record.child_asin.clone()),
                variant_name: hierarchy
                    .variant_of(&record.child_asin)
                    .map(|v| v.to_string()),
                period,
            },
            Level::Parent => GroupKey {
                seller_id: Some(record.seller_id),
                seller_name: Some(record.seller_name.clone()),
                normalized_name: Some(resolve_parent(hierarchy, &record.child_asin)),
                child_asin: None,
                variant_name: None,
                period,
            },
            Level::Account => GroupKey {
                seller_id: Some(record.seller_id),
                seller_name: Some(record.seller_name.clone()),
                normalized_name: None,
                child_asin: None,
                variant_name: None,
                period,
            },
            Level::Custom => GroupKey {
                seller_id: None,
                seller_name: None,
                normalized_name: None,
                child_asin: None,
                variant_name: None,
                period,
            },
        }
    }

    // Advertising rows join on the subset of the key they can carry:
    // seller + entity + period.
    fn ads_join_key(&self, level: Level) -> AdsJoinKey {
        let entity = match level {
            Level::Child => self.child_asin.clone(),
            Level::Parent => self.normalized_name.clone(),
            Level::Account | Level::Custom => None,
        };

        AdsJoinKey {
            seller_id: self.seller_id,
            entity,
            period: self.period,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct AdsJoinKey {
    seller_id: Option<i64>,
    entity: Option<String>,
    period: NaiveDate,
}

fn ads_join_key_for_row(level: Level, row: &AdPeriodRow, hierarchy: &AsinHierarchy) -> AdsJoinKey {
    let entity = match level {
        Level::Child => Some(row.child_asin.clone()),
        Level::Parent => Some(resolve_parent(hierarchy, &row.child_asin)),
        Level::Account | Level::Custom => None,
    };

    AdsJoinKey {
        seller_id: match level {
            Level::Custom => None,
            _ => Some(row.seller_id),
        },
        entity,
        period: row.period_start,
    }
}

// A child the ASIN table does not know stands in for its own parent, so
// unmapped rows still aggregate instead of vanishing.
fn resolve_parent(hierarchy: &AsinHierarchy, child_asin: &str) -> String {
    hierarchy
        .parent_of(child_asin)
        .unwrap_or(child_asin)
        .to_string()
}

/// Group business and period-bucketed advertising rows to the requested
/// level and left-join ads onto business per period. Business presence
/// defines a valid reporting period: periods with business data and no ads
/// keep zeroed ad columns, ad-only periods are dropped.
pub fn aggregate(
    business: &[BusinessRecord],
    ads: &[AdPeriodRow],
    level: Level,
    hierarchy: &AsinHierarchy,
) -> Vec<MetricRow> {
    let mut business_groups: BTreeMap<GroupKey, BaseMetrics> = BTreeMap::new();

    for record in business {
        let key = GroupKey::for_level(level, record, hierarchy);
        let base = business_groups.entry(key).or_default();

        base.total_sales += record.sales_total;
        base.sessions += record.sessions_total.unwrap_or(0.0);
        base.units += record.units_total.unwrap_or(0.0);
        base.page_views += record.page_views_total.unwrap_or(0.0);
    }

    let mut ad_groups: BTreeMap<AdsJoinKey, BaseMetrics> = BTreeMap::new();

    for row in ads {
        let key = ads_join_key_for_row(level, row, hierarchy);
        let base = ad_groups.entry(key).or_default();

        base.ad_spend += row.spend;
        base.ad_sales += row.ad_sales;
        base.impressions += row.impressions;
        base.clicks += row.clicks;
        base.ad_orders += row.ad_orders;
        base.ad_units += row.ad_units;
    }

    business_groups
        .into_iter()
        .map(|(key, mut base)| {
            if let Some(ad_base) = ad_groups.get(&key.ads_join_key(level)) {
                base.ad_spend = ad_base.ad_spend;
                base.ad_sales = ad_base.ad_sales;
                base.impressions = ad_base.impressions;
                base.clicks = ad_base.clicks;
                base.ad_orders = ad_base.ad_orders;
                base.ad_units = ad_base.ad_units;
            }

            MetricRow {
                seller_id: key.seller_id,
                seller_name: key.seller_name,
                normalized_name: key.normalized_name,
                child_asin: key.child_asin,
                variant_name: key.variant_name,
                period_start: key.period,
                base,
                derived: DerivedMetrics::default(),
                comparison: None,
            }
        })
        .collect()
}
