use crate::error::MetricsError;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[schemars(description = "Sunday-anchored weekly periods")]
    Weekly,

    #[schemars(description = "Calendar-month periods")]
    Monthly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            other => Err(MetricsError::InvalidGranularity(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[schemars(description = "One row per child ASIN per period")]
    Child,

    #[schemars(description = "One row per parent (normalized product name) per period")]
    Parent,

    #[schemars(description = "One row per seller account per period")]
    Account,

    #[schemars(
        description = "One ASIN-agnostic row per period covering the whole selection; used for totals across an arbitrary set of ASINs"
    )]
    Custom,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Child => "child",
            Level::Parent => "parent",
            Level::Account => "account",
            Level::Custom => "custom",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "child" => Ok(Level::Child),
            "parent" => Ok(Level::Parent),
            "account" => Ok(Level::Account),
            "custom" => Ok(Level::Custom),
            other => Err(MetricsError::InvalidLevel(other.to_string())),
        }
    }
}

/// One row of the ASIN hierarchy snapshot: a child ASIN and the product
/// family (normalized name) it rolls up to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsinRecord {
    pub seller_id: i64,
    pub seller_name: String,
    #[serde(default)]
    pub marketplace: String,
    pub child_asin: String,
    #[serde(default)]
    pub parent_asin: String,
    pub normalized_name: String,
    #[serde(default)]
    pub variant_name: String,
    #[serde(default)]
    pub title: String,
}

/// One business-report row: sales and traffic for a (child ASIN, period,
/// granularity) triple. Optional columns may be absent in some source
/// snapshots and aggregate as zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub seller_id: i64,
    pub seller_name: String,
    pub child_asin: String,
    pub period_start_date: NaiveDate,
    pub period_granularity: Granularity,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sales_total: f64,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub sessions_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub units_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub page_views_total: Option<f64>,
}

/// One advertising row: daily spend and performance for a child ASIN.
/// Must be bucketed to a period before joining with business data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdRecord {
    pub seller_id: i64,
    pub child_asin: String,
    pub record_date: NaiveDate,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub spend: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ad_sales: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub impressions: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub clicks: f64,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub ad_orders: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub ad_units: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AsinSelection {
    #[serde(default)]
    #[schemars(
        description = "Parent product names to include; each cascades to all of its child ASINs. Unknown names contribute nothing."
    )]
    pub parent_names: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Specific child ASINs to include, unioned with the parent cascade")]
    pub child_asins: Vec<String>,
}

impl AsinSelection {
    pub fn is_empty(&self) -> bool {
        self.parent_names.is_empty() && self.child_asins.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TimeRange {
    #[serde(default)]
    #[schemars(description = "Inclusive lower bound on the period/record date")]
    pub start_date: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(description = "Inclusive upper bound on the period/record date")]
    pub end_date: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(description = "Explicit week-start dates (Sundays) to keep")]
    pub specific_weeks: Vec<NaiveDate>,

    #[serde(default)]
    #[schemars(description = "Explicit month-start dates to keep; row dates are truncated to their month start before the membership test")]
    pub specific_months: Vec<NaiveDate>,
}

impl TimeRange {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && self.specific_weeks.is_empty()
            && self.specific_months.is_empty()
    }

    pub fn for_months(months: Vec<NaiveDate>) -> Self {
        TimeRange {
            specific_months: months,
            ..TimeRange::default()
        }
    }
}

/// Parameters accepted by every reporting entry point.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MetricsRequest {
    #[serde(default)]
    #[schemars(description = "Seller to report on; omit if the input tables already hold a single seller")]
    pub seller_id: Option<i64>,

    #[serde(default)]
    #[schemars(description = "ASIN selection; an empty selection means all ASINs")]
    pub selection: AsinSelection,

    #[serde(default)]
    #[schemars(description = "Time filter; an empty filter keeps every period at the requested granularity")]
    pub time_range: TimeRange,

    #[schemars(description = "Entity grouping applied to the report")]
    pub level: Level,

    #[schemars(description = "Period size used for time bucketing")]
    pub granularity: Granularity,

    #[serde(default)]
    #[schemars(description = "Add week-over-week / month-over-month comparison columns")]
    pub include_comparison: bool,
}

impl Default for MetricsRequest {
    fn default() -> Self {
        MetricsRequest {
            seller_id: None,
            selection: AsinSelection::default(),
            time_range: TimeRange::default(),
            level: Level::Account,
            granularity: Granularity::Weekly,
            include_comparison: false,
        }
    }
}

impl MetricsRequest {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(MetricsRequest)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

// Warehouse exports occasionally carry numbers as strings or nulls; those
// coerce to zero instead of failing the whole table.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Number(f64),
    Text(String),
    Missing,
}

impl LenientNumber {
    fn to_f64(&self) -> Option<f64> {
        match self {
            LenientNumber::Number(n) => Some(*n),
            LenientNumber::Text(s) => s.trim().parse::<f64>().ok(),
            LenientNumber::Missing => None,
        }
    }
}

pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = LenientNumber::deserialize(deserializer)?;
    Ok(raw.to_f64().unwrap_or(0.0))
}

pub(crate) fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = LenientNumber::deserialize(deserializer)?;
    Ok(raw.to_f64())
}
