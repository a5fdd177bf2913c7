use crate::metrics::{round1, MetricKey, MetricRow};
use crate::schema::Level;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metrics compared year over year. Ratio metrics compare the two months'
/// independently computed ratios, not re-derived blends.
pub const YOY_METRICS: [MetricKey; 14] = [
    MetricKey::TotalSales,
    MetricKey::Sessions,
    MetricKey::Units,
    MetricKey::PageViews,
    MetricKey::AdSpend,
    MetricKey::AdSales,
    MetricKey::Impressions,
    MetricKey::Clicks,
    MetricKey::OrganicSales,
    MetricKey::CvrPct,
    MetricKey::CtrPct,
    MetricKey::Roas,
    MetricKey::AcosPct,
    MetricKey::TacosPct,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YoyMetric {
    pub current: f64,
    pub prior: f64,
    pub change: f64,
    pub change_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoyRow {
    pub seller_id: Option<i64>,
    pub seller_name: Option<String>,
    pub normalized_name: Option<String>,
    pub child_asin: Option<String>,
    pub current_month: NaiveDate,
    pub prior_year_month: NaiveDate,
    pub metrics: BTreeMap<MetricKey, YoyMetric>,
}

type YoyEntityKey = (Option<i64>, Option<String>);

fn entity_key(level: Level, row: &MetricRow) -> YoyEntityKey {
    let entity = match level {
        Level::Child => row.child_asin.clone(),
        Level::Parent => row.normalized_name.clone(),
        _ => None,
    };

    (row.seller_id, entity)
}

/// Join two independently aggregated months on the level's entity key.
/// An entity missing from the prior month compares against zeros: positive
/// current values count as 100% growth, not undefined.
pub fn build_yoy(
    current_rows: &[MetricRow],
    prior_rows: &[MetricRow],
    level: Level,
    current_month: NaiveDate,
    prior_year_month: NaiveDate,
) -> Vec<YoyRow> {
    let mut prior_by_entity: BTreeMap<YoyEntityKey, &MetricRow> = BTreeMap::new();
    for row in prior_rows {
        prior_by_entity.entry(entity_key(level, row)).or_insert(row);
    }

    current_rows
        .iter()
        .map(|row| {
            let prior = prior_by_entity.get(&entity_key(level, row)).copied();

            let mut metrics = BTreeMap::new();
            for metric in YOY_METRICS {
                let current = row.metric_value(metric);
                let prior_value = prior.map_or(0.0, |p| p.metric_value(metric));
                let change = current - prior_value;

                let change_pct = if prior_value > 0.0 {
                    round1(change / prior_value * 100.0)
                } else if current > 0.0 {
                    100.0
                } else {
                    0.0
                };

                metrics.insert(
                    metric,
                    YoyMetric {
                        current,
                        prior: prior_value,
                        change,
                        change_pct,
                    },
                );
            }

            YoyRow {
                seller_id: row.seller_id,
                seller_name: row.seller_name.clone(),
                normalized_name: row.normalized_name.clone(),
                child_asin: row.child_asin.clone(),
                current_month,
                prior_year_month,
                metrics,
            }
        })
        .collect()
}
