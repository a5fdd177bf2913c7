//! # Seller Metrics Engine
//!
//! A library for turning raw per-ASIN sales and advertising records into
//! consistently-aggregated business metrics and flat report tables.
//!
//! ## Core Concepts
//!
//! - **ASIN hierarchy**: child ASINs (sellable variants) roll up to a parent
//!   product family (normalized name); selections cascade parent -> children
//! - **Granularity**: Sunday-anchored weekly periods or calendar months;
//!   daily advertising rows are bucketed to a period before any join
//! - **Level**: reports group to child, parent, account, or a single custom
//!   bucket per period
//! - **Recompute, never average**: every ratio metric (ROAS, ACOS, CVR, ...)
//!   is computed from summed bases, so totals and cumulative rows stay
//!   consistent with their per-row sums
//! - **Business-anchored joins**: a reporting period exists when the business
//!   report has data for it; ad-only periods are dropped
//!
//! ## Example
//!
//! ```rust,ignore
//! use seller_metrics_engine::*;
//!
//! let engine = MetricsEngine::new(asin_rows, business_rows, ad_rows);
//!
//! let request = MetricsRequest {
//!     level: Level::Parent,
//!     granularity: Granularity::Weekly,
//!     include_comparison: true,
//!     ..MetricsRequest::default()
//! };
//!
//! let rows = engine.get_metrics(&request);
//! let pivot = engine.pivot_report(&request, Some(&metric_preset("advertising")?), true);
//! let gaps = engine.detect_data_gaps(Granularity::Weekly);
//! ```
//!
//! The engine performs no I/O: the three input tables come from an external
//! data-retrieval collaborator, and every operation is a pure synchronous
//! transform over the snapshot it was constructed with.

pub mod aggregate;
pub mod compare;
pub mod engine;
pub mod error;
pub mod filter;
pub mod gaps;
pub mod hierarchy;
pub mod metrics;
pub mod pivot;
pub mod schema;
pub mod utils;
pub mod yoy;

pub use aggregate::{aggregate as aggregate_rows, bucket_ads_to_period, AdPeriodRow};
pub use compare::{
    add_period_comparison, cumulative_rollup, CompareBasis, CumulativeMetrics, MetricDelta,
    PeriodComparison, COMPARED_METRICS,
};
pub use engine::MetricsEngine;
pub use error::{MetricsError, Result};
pub use filter::{filter_ads, filter_business};
pub use gaps::{coverage_summary, detect_data_gaps, CoverageSummary, GapRecord, GapType};
pub use hierarchy::{sellers, AsinHierarchy, ChildDetail, ParentGroup, SellerSummary};
pub use metrics::{
    apply_derived, metric_preset, preset_names, BaseMetrics, DerivedMetrics, MetricFormat,
    MetricKey, MetricRow,
};
pub use pivot::{build_pivot, PeriodOrder, PivotColumn, PivotRow, PivotTable};
pub use schema::{
    AdRecord, AsinRecord, AsinSelection, BusinessRecord, Granularity, Level, MetricsRequest,
    TimeRange,
};
pub use utils::*;
pub use yoy::{build_yoy, YoyMetric, YoyRow, YOY_METRICS};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_surface_round_trip() {
        let request = MetricsRequest::default();
        assert_eq!(request.level, Level::Account);
        assert_eq!(request.granularity, Granularity::Weekly);

        let engine = MetricsEngine::new(vec![], vec![], vec![]);
        assert!(engine.get_metrics(&request).is_empty());
        assert!(engine.sellers().is_empty());
        assert!(engine.detect_data_gaps(Granularity::Weekly).is_empty());
    }

    #[test]
    fn test_preset_resolution_from_lib_root() {
        assert!(metric_preset("sales_overview").is_ok());
        assert!(metric_preset("nope").is_err());
    }
}
