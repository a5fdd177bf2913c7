use crate::compare::PeriodComparison;
use crate::error::{MetricsError, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every metric the engine can report, identified by its flat-export key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    TotalSales,
    Sessions,
    Units,
    CvrPct,
    AdSpend,
    AdSales,
    Roas,
    AcosPct,
    OrganicSales,
    TacosPct,
    PageViews,
    Impressions,
    Clicks,
    CtrPct,
    OrganicPct,
    AdSalesPct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricFormat {
    Currency,
    Number,
    Percent,
    Decimal,
}

impl MetricKey {
    pub const ALL: [MetricKey; 16] = [
        MetricKey::TotalSales,
        MetricKey::Sessions,
        MetricKey::Units,
        MetricKey::CvrPct,
        MetricKey::AdSpend,
        MetricKey::AdSales,
        MetricKey::Roas,
        MetricKey::AcosPct,
        MetricKey::OrganicSales,
        MetricKey::TacosPct,
        MetricKey::PageViews,
        MetricKey::Impressions,
        MetricKey::Clicks,
        MetricKey::CtrPct,
        MetricKey::OrganicPct,
        MetricKey::AdSalesPct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::TotalSales => "total_sales",
            MetricKey::Sessions => "sessions",
            MetricKey::Units => "units",
            MetricKey::CvrPct => "cvr_pct",
            MetricKey::AdSpend => "ad_spend",
            MetricKey::AdSales => "ad_sales",
            MetricKey::Roas => "roas",
            MetricKey::AcosPct => "acos_pct",
            MetricKey::OrganicSales => "organic_sales",
            MetricKey::TacosPct => "tacos_pct",
            MetricKey::PageViews => "page_views",
            MetricKey::Impressions => "impressions",
            MetricKey::Clicks => "clicks",
            MetricKey::CtrPct => "ctr_pct",
            MetricKey::OrganicPct => "organic_pct",
            MetricKey::AdSalesPct => "ad_sales_pct",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetricKey::TotalSales => "Sales",
            MetricKey::Sessions => "Sessions",
            MetricKey::Units => "Units",
            MetricKey::CvrPct => "CVR%",
            MetricKey::AdSpend => "Ad_Spend",
            MetricKey::AdSales => "Ad_Sales",
            MetricKey::Roas => "ROAS",
            MetricKey::AcosPct => "ACOS%",
            MetricKey::OrganicSales => "Organic_Sales",
            MetricKey::TacosPct => "TACoS%",
            MetricKey::PageViews => "Page_Views",
            MetricKey::Impressions => "Impressions",
            MetricKey::Clicks => "Clicks",
            MetricKey::CtrPct => "CTR%",
            MetricKey::OrganicPct => "Organic%",
            MetricKey::AdSalesPct => "Ad_Sales%",
        }
    }

    pub fn format(&self) -> MetricFormat {
        match self {
            MetricKey::TotalSales
            | MetricKey::AdSpend
            | MetricKey::AdSales
            | MetricKey::OrganicSales => MetricFormat::Currency,
            MetricKey::Sessions
            | MetricKey::Units
            | MetricKey::PageViews
            | MetricKey::Impressions
            | MetricKey::Clicks => MetricFormat::Number,
            MetricKey::Roas => MetricFormat::Decimal,
            _ => MetricFormat::Percent,
        }
    }

    /// Summable metrics total by column addition; everything else is a ratio
    /// that must be recomputed from summed bases.
    pub fn is_summable(&self) -> bool {
        matches!(
            self,
            MetricKey::TotalSales
                | MetricKey::Sessions
                | MetricKey::Units
                | MetricKey::AdSpend
                | MetricKey::AdSales
                | MetricKey::OrganicSales
                | MetricKey::PageViews
                | MetricKey::Impressions
                | MetricKey::Clicks
        )
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKey {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self> {
        MetricKey::ALL
            .iter()
            .find(|key| key.as_str() == s)
            .copied()
            .ok_or_else(|| MetricsError::UnknownMetric(s.to_string()))
    }
}

/// Resolve a named preset to its metric keys. Unknown names are a hard
/// validation error, not a silent fallback.
pub fn metric_preset(name: &str) -> Result<Vec<MetricKey>> {
    let keys = match name {
        "sales_overview" => vec![
            MetricKey::TotalSales,
            MetricKey::Sessions,
            MetricKey::Units,
            MetricKey::CvrPct,
        ],
        "advertising" => vec![
            MetricKey::AdSpend,
            MetricKey::AdSales,
            MetricKey::Roas,
            MetricKey::AcosPct,
            MetricKey::Impressions,
            MetricKey::Clicks,
            MetricKey::CtrPct,
        ],
        "organic_vs_paid" => vec![
            MetricKey::TotalSales,
            MetricKey::AdSales,
            MetricKey::OrganicSales,
            MetricKey::OrganicPct,
            MetricKey::TacosPct,
        ],
        "traffic" => vec![
            MetricKey::Sessions,
            MetricKey::PageViews,
            MetricKey::Impressions,
            MetricKey::Clicks,
            MetricKey::CvrPct,
            MetricKey::CtrPct,
        ],
        "all" => MetricKey::ALL.to_vec(),
        other => return Err(MetricsError::UnknownMetricPreset(other.to_string())),
    };

    Ok(keys)
}

pub fn preset_names() -> [&'static str; 5] {
    [
        "sales_overview",
        "advertising",
        "organic_vs_paid",
        "traffic",
        "all",
    ]
}

/// Summed base metrics for one aggregated row. Ads columns default to zero
/// for periods with business data and no advertising.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseMetrics {
    pub total_sales: f64,
    pub sessions: f64,
    pub units: f64,
    pub page_views: f64,
    pub ad_spend: f64,
    pub ad_sales: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub ad_orders: f64,
    pub ad_units: f64,
}

impl BaseMetrics {
    pub fn accumulate(&mut self, other: &BaseMetrics) {
        self.total_sales += other.total_sales;
        self.sessions += other.sessions;
        self.units += other.units;
        self.page_views += other.page_views;
        self.ad_spend += other.ad_spend;
        self.ad_sales += other.ad_sales;
        self.impressions += other.impressions;
        self.clicks += other.clicks;
        self.ad_orders += other.ad_orders;
        self.ad_units += other.ad_units;
    }
}

/// Ratio metrics computed from summed bases. Every division is guarded: a
/// denominator of zero (or below) yields 0.0, never NaN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub organic_sales: f64,
    pub cvr_pct: f64,
    pub ctr_pct: f64,
    pub roas: f64,
    pub acos_pct: f64,
    pub tacos_pct: f64,
    pub organic_pct: f64,
    pub ad_sales_pct: f64,
}

impl DerivedMetrics {
    /// Must only ever be applied to already-summed bases. Summary rows
    /// recompute ratios from their own sums rather than averaging
    /// per-period ratios.
    pub fn from_base(base: &BaseMetrics) -> Self {
        let organic_sales = base.total_sales - base.ad_sales;

        DerivedMetrics {
            organic_sales,
            cvr_pct: round2(guarded_ratio(base.units, base.sessions) * 100.0),
            ctr_pct: round2(guarded_ratio(base.clicks, base.impressions) * 100.0),
            roas: round2(guarded_ratio(base.ad_sales, base.ad_spend)),
            acos_pct: round1(guarded_ratio(base.ad_spend, base.ad_sales) * 100.0),
            tacos_pct: round1(guarded_ratio(base.ad_spend, base.total_sales) * 100.0),
            organic_pct: round1(guarded_ratio(organic_sales, base.total_sales) * 100.0),
            ad_sales_pct: round1(guarded_ratio(base.ad_sales, base.total_sales) * 100.0),
        }
    }
}

/// One aggregated output row. Group-key fields not part of the requested
/// level are None; a custom-level row carries the period only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRow {
    pub seller_id: Option<i64>,
    pub seller_name: Option<String>,
    pub normalized_name: Option<String>,
    pub child_asin: Option<String>,
    pub variant_name: Option<String>,
    pub period_start: NaiveDate,
    #[serde(flatten)]
    pub base: BaseMetrics,
    #[serde(flatten)]
    pub derived: DerivedMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<PeriodComparison>,
}

impl MetricRow {
    pub fn metric_value(&self, key: MetricKey) -> f64 {
        match key {
            MetricKey::TotalSales => self.base.total_sales,
            MetricKey::Sessions => self.base.sessions,
            MetricKey::Units => self.base.units,
            MetricKey::PageViews => self.base.page_views,
            MetricKey::AdSpend => self.base.ad_spend,
            MetricKey::AdSales => self.base.ad_sales,
            MetricKey::Impressions => self.base.impressions,
            MetricKey::Clicks => self.base.clicks,
            MetricKey::CvrPct => self.derived.cvr_pct,
            MetricKey::CtrPct => self.derived.ctr_pct,
            MetricKey::Roas => self.derived.roas,
            MetricKey::AcosPct => self.derived.acos_pct,
            MetricKey::OrganicSales => self.derived.organic_sales,
            MetricKey::TacosPct => self.derived.tacos_pct,
            MetricKey::OrganicPct => self.derived.organic_pct,
            MetricKey::AdSalesPct => self.derived.ad_sales_pct,
        }
    }
}

/// Recompute the derived block of every row from its summed bases.
pub fn apply_derived(rows: &mut [MetricRow]) {
    for row in rows {
        row.derived = DerivedMetrics::from_base(&row.base);
    }
}

fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
