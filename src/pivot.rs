use crate::metrics::{round1, round2, MetricKey, MetricRow};
use crate::schema::{Granularity, Level};
use crate::utils::period_label;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodOrder {
    RecentFirst,
    OldestFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotColumn {
    pub period: NaiveDate,
    pub metric: MetricKey,
    /// Flat-export header, e.g. "Jan_11_total_sales" or "Jan_2025_roas".
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotRow {
    pub seller_id: Option<i64>,
    pub seller_name: Option<String>,
    pub normalized_name: Option<String>,
    pub child_asin: Option<String>,
    pub variant_name: Option<String>,
    pub is_total: bool,
    /// One value per column, aligned with `PivotTable::columns`. Always
    /// populated; absent cells are 0 so the table exports rectangular.
    pub values: Vec<f64>,
}

/// Entity rows by (period x metric) columns, with the selected periods and
/// metrics carried alongside so the table can be refiltered and reordered
/// after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotTable {
    pub columns: Vec<PivotColumn>,
    pub rows: Vec<PivotRow>,
    pub periods: Vec<NaiveDate>,
    pub metrics: Vec<MetricKey>,
    pub granularity: Granularity,
    pub level: Level,
}

pub fn build_pivot(
    metric_rows: &[MetricRow],
    level: Level,
    granularity: Granularity,
    metrics: Option<&[MetricKey]>,
    include_totals: bool,
) -> PivotTable {
    let metrics: Vec<MetricKey> = metrics
        .map(|m| m.to_vec())
        .unwrap_or_else(|| MetricKey::ALL.to_vec());

    // Distinct periods, most recent first.
    let mut periods: Vec<NaiveDate> = metric_rows.iter().map(|r| r.period_start).collect();
    periods.sort_unstable();
    periods.dedup();
    periods.reverse();

    let columns = make_columns(&periods, &metrics, granularity);

    let mut grouped: BTreeMap<EntityIdentity, Vec<&MetricRow>> = BTreeMap::new();
    for row in metric_rows {
        grouped.entry(EntityIdentity::of(row)).or_default().push(row);
    }

    let mut rows: Vec<PivotRow> = grouped
        .into_iter()
        .map(|(identity, entity_rows)| {
            let values = columns
                .iter()
                .map(|col| {
                    entity_rows
                        .iter()
                        .find(|r| r.period_start == col.period)
                        .map(|r| r.metric_value(col.metric))
                        .unwrap_or(0.0)
                })
                .collect();

            identity.into_row(values)
        })
        .collect();

    // Default sort: descending by the most recent period's first metric.
    if !columns.is_empty() {
        rows.sort_by(|a, b| {
            b.values[0]
                .partial_cmp(&a.values[0])
                .unwrap_or(Ordering::Equal)
        });
    }

    if include_totals && rows.len() > 1 {
        let totals = totals_row(&rows, &columns, level);
        rows.push(totals);
    }

    PivotTable {
        columns,
        rows,
        periods,
        metrics,
        granularity,
        level,
    }
}

impl PivotTable {
    /// Keep only the named metrics and/or periods, preserving the order of
    /// the provided lists. Entries not present in the stored metadata are
    /// ignored.
    pub fn filter_columns(
        &self,
        metrics: Option<&[MetricKey]>,
        periods: Option<&[NaiveDate]>,
    ) -> PivotTable {
        let target_periods: Vec<NaiveDate> = periods
            .map(|requested| {
                requested
                    .iter()
                    .filter(|period| self.periods.contains(*period))
                    .copied()
                    .collect()
            })
            .unwrap_or_else(|| self.periods.clone());

        let target_metrics: Vec<MetricKey> = metrics
            .map(|requested| {
                requested
                    .iter()
                    .filter(|metric| self.metrics.contains(*metric))
                    .copied()
                    .collect()
            })
            .unwrap_or_else(|| self.metrics.clone());

        self.project(&target_periods, &target_metrics)
    }

    /// Reorder columns by explicit metric priority and period direction.
    /// Metrics not listed keep their stored order after the listed ones.
    pub fn reorder_columns(
        &self,
        metric_order: Option<&[MetricKey]>,
        period_order: PeriodOrder,
    ) -> PivotTable {
        let mut ordered_periods = self.periods.clone();
        ordered_periods.sort_unstable();
        if period_order == PeriodOrder::RecentFirst {
            ordered_periods.reverse();
        }

        let ordered_metrics = match metric_order {
            Some(order) => {
                let mut metrics: Vec<MetricKey> = order
                    .iter()
                    .filter(|metric| self.metrics.contains(*metric))
                    .copied()
                    .collect();
                let remaining: Vec<MetricKey> = self
                    .metrics
                    .iter()
                    .filter(|metric| !metrics.contains(*metric))
                    .copied()
                    .collect();
                metrics.extend(remaining);
                metrics
            }
            None => self.metrics.clone(),
        };

        self.project(&ordered_periods, &ordered_metrics)
    }

    // Rebuild the table over the given period/metric lists, re-projecting
    // each row's values through the existing columns.
    fn project(&self, periods: &[NaiveDate], metrics: &[MetricKey]) -> PivotTable {
        let columns = make_columns(periods, metrics, self.granularity);

        let index_of: BTreeMap<(NaiveDate, MetricKey), usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, col)| ((col.period, col.metric), idx))
            .collect();

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let values = columns
                    .iter()
                    .map(|col| {
                        index_of
                            .get(&(col.period, col.metric))
                            .map(|&idx| row.values[idx])
                            .unwrap_or(0.0)
                    })
                    .collect();

                PivotRow {
                    values,
                    ..row.clone()
                }
            })
            .collect();

        PivotTable {
            columns,
            rows,
            periods: periods.to_vec(),
            metrics: metrics.to_vec(),
            granularity: self.granularity,
            level: self.level,
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

fn make_columns(
    periods: &[NaiveDate],
    metrics: &[MetricKey],
    granularity: Granularity,
) -> Vec<PivotColumn> {
    let mut columns = Vec::with_capacity(periods.len() * metrics.len());

    for period in periods {
        let label = period_label(*period, granularity);
        for metric in metrics {
            columns.push(PivotColumn {
                period: *period,
                metric: *metric,
                name: format!("{}_{}", label, metric.as_str()),
            });
        }
    }

    columns
}

// Sum-type columns total by addition; ratio columns are recomputed from the
// summed bases of the same period, never averaged from displayed ratios.
fn totals_row(rows: &[PivotRow], columns: &[PivotColumn], level: Level) -> PivotRow {
    let entity_rows: Vec<&PivotRow> = rows.iter().filter(|r| !r.is_total).collect();

    let mut sums_by_period: BTreeMap<NaiveDate, BTreeMap<MetricKey, f64>> = BTreeMap::new();
    for (idx, col) in columns.iter().enumerate() {
        if col.metric.is_summable() {
            let sum: f64 = entity_rows.iter().map(|r| r.values[idx]).sum();
            sums_by_period
                .entry(col.period)
                .or_default()
                .insert(col.metric, sum);
        }
    }

    let values = columns
        .iter()
        .map(|col| {
            let sums = sums_by_period.get(&col.period);
            let base = |key: MetricKey| sums.and_then(|s| s.get(&key)).copied().unwrap_or(0.0);

            if col.metric.is_summable() {
                base(col.metric)
            } else {
                ratio_from_sums(col.metric, &base)
            }
        })
        .collect();

    let label = |present: bool| present.then(|| "TOTAL".to_string());

    PivotRow {
        seller_id: None,
        seller_name: label(true),
        normalized_name: label(matches!(level, Level::Parent | Level::Child)),
        child_asin: None,
        variant_name: label(matches!(level, Level::Child)),
        is_total: true,
        values,
    }
}

fn ratio_from_sums(metric: MetricKey, base: &dyn Fn(MetricKey) -> f64) -> f64 {
    let guarded = |num: f64, den: f64| if den > 0.0 { num / den } else { 0.0 };

    match metric {
        MetricKey::CvrPct => round2(guarded(base(MetricKey::Units), base(MetricKey::Sessions)) * 100.0),
        MetricKey::CtrPct => round2(
            guarded(base(MetricKey::Clicks), base(MetricKey::Impressions)) * 100.0,
        ),
        MetricKey::Roas => round2(guarded(base(MetricKey::AdSales), base(MetricKey::AdSpend))),
        MetricKey::AcosPct => round1(
            guarded(base(MetricKey::AdSpend), base(MetricKey::AdSales)) * 100.0,
        ),
        MetricKey::TacosPct => round1(
            guarded(base(MetricKey::AdSpend), base(MetricKey::TotalSales)) * 100.0,
        ),
        MetricKey::OrganicPct => round1(
            guarded(base(MetricKey::OrganicSales), base(MetricKey::TotalSales)) * 100.0,
        ),
        MetricKey::AdSalesPct => round1(
            guarded(base(MetricKey::AdSales), base(MetricKey::TotalSales)) * 100.0,
        ),
        // Summable metrics never reach here.
        _ => 0.0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct EntityIdentity {
    seller_id: Option<i64>,
    seller_name: Option<String>,
    normalized_name: Option<String>,
    child_asin: Option<String>,
    variant_name: Option<String>,
}

impl EntityIdentity {
    fn of(row: &MetricRow) -> Self {
        EntityIdentity {
            seller_id: row.seller_id,
            seller_name: row.seller_name.clone(),
            normalized_name: row.normalized_name.clone(),
            child_asin: row.child_asin.clone(),
            variant_name: row.variant_name.clone(),
        }
    }

    fn into_row(self, values: Vec<f64>) -> PivotRow {
        PivotRow {
            seller_id: self.seller_id,
            seller_name: self.seller_name,
            normalized_name: self.normalized_name,
            child_asin: self.child_asin,
            variant_name: self.variant_name,
            is_total: false,
            values,
        }
    }
}
