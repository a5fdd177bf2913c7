use crate::metrics::{round1, BaseMetrics, DerivedMetrics, MetricKey, MetricRow};
use crate::schema::Granularity;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Base metrics that get prior-period comparison columns.
pub const COMPARED_METRICS: [MetricKey; 6] = [
    MetricKey::TotalSales,
    MetricKey::Sessions,
    MetricKey::Units,
    MetricKey::AdSpend,
    MetricKey::AdSales,
    MetricKey::OrganicSales,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareBasis {
    WeekOverWeek,
    MonthOverMonth,
}

impl CompareBasis {
    pub fn for_granularity(granularity: Granularity) -> Self {
        match granularity {
            Granularity::Weekly => CompareBasis::WeekOverWeek,
            Granularity::Monthly => CompareBasis::MonthOverMonth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub previous: Option<f64>,
    pub change: f64,
    pub change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub basis: CompareBasis,
    pub deltas: BTreeMap<MetricKey, MetricDelta>,
}

/// Attach prior-period deltas to every row. Rows are compared against the
/// previous period of the same entity (normalized name / child ASIN when
/// present); an entity's first period has no previous value and a zero
/// change.
pub fn add_period_comparison(rows: &mut [MetricRow], granularity: Granularity) {
    let basis = CompareBasis::for_granularity(granularity);

    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| {
        entity_key(&rows[a])
            .cmp(&entity_key(&rows[b]))
            .then(rows[a].period_start.cmp(&rows[b].period_start))
    });

    let mut previous: Option<(EntityKey, usize)> = None;

    for &idx in &order {
        let key = entity_key(&rows[idx]);
        let prior_idx = match &previous {
            Some((prev_key, prev_idx)) if *prev_key == key => Some(*prev_idx),
            _ => None,
        };

        let mut deltas = BTreeMap::new();
        for metric in COMPARED_METRICS {
            let current = rows[idx].metric_value(metric);
            let prior = prior_idx.map(|i| rows[i].metric_value(metric));

            let (change, change_pct) = match prior {
                Some(prev) if prev > 0.0 => {
                    let change = current - prev;
                    (change, round1(change / prev * 100.0))
                }
                Some(prev) => (current - prev, 0.0),
                None => (0.0, 0.0),
            };

            deltas.insert(
                metric,
                MetricDelta {
                    previous: prior,
                    change,
                    change_pct,
                },
            );
        }

        rows[idx].comparison = Some(PeriodComparison {
            basis,
            deltas,
        });
        previous = Some((key, idx));
    }
}

type EntityKey = (Option<String>, Option<String>);

fn entity_key(row: &MetricRow) -> EntityKey {
    (row.normalized_name.clone(), row.child_asin.clone())
}

/// One row summing all selected periods, with ratios recomputed from the
/// summed bases rather than averaged from per-period ratios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CumulativeMetrics {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub periods_count: usize,
    #[serde(flatten)]
    pub base: BaseMetrics,
    #[serde(flatten)]
    pub derived: DerivedMetrics,
}

pub fn cumulative_rollup(rows: &[MetricRow]) -> Option<CumulativeMetrics> {
    let first = rows.first()?;

    let mut base = BaseMetrics::default();
    let mut period_start = first.period_start;
    let mut period_end = first.period_start;
    let mut distinct_periods = std::collections::BTreeSet::new();

    for row in rows {
        base.accumulate(&row.base);
        period_start = period_start.min(row.period_start);
        period_end = period_end.max(row.period_start);
        distinct_periods.insert(row.period_start);
    }

    let derived = DerivedMetrics::from_base(&base);

    Some(CumulativeMetrics {
        period_start,
        period_end,
        periods_count: distinct_periods.len(),
        base,
        derived,
    })
}
