use crate::aggregate::{aggregate, bucket_ads_to_period};
use crate::compare::{add_period_comparison, cumulative_rollup, CumulativeMetrics};
use crate::error::{MetricsError, Result};
use crate::filter::{filter_ads, filter_business};
use crate::gaps::{coverage_summary, detect_data_gaps, CoverageSummary, GapRecord};
use crate::hierarchy::{sellers, AsinHierarchy, ParentGroup, SellerSummary};
use crate::metrics::{apply_derived, MetricKey, MetricRow};
use crate::pivot::{build_pivot, PivotTable};
use crate::schema::{
    AdRecord, AsinRecord, AsinSelection, BusinessRecord, Granularity, Level, MetricsRequest,
    TimeRange,
};
use crate::utils::{month_start, same_month_prior_year};
use crate::yoy::{build_yoy, YoyRow};
use chrono::NaiveDate;
use log::{debug, info};

/// A pure, stateless view over one snapshot of the three source tables.
/// Construction copies the tables and builds the ASIN hierarchy once; every
/// operation is a deterministic transform returning new data. One engine per
/// request/seller snapshot; instances can run in parallel freely.
pub struct MetricsEngine {
    asin_records: Vec<AsinRecord>,
    business: Vec<BusinessRecord>,
    ads: Vec<AdRecord>,
    hierarchy: AsinHierarchy,
}

impl MetricsEngine {
    pub fn new(
        asin_records: Vec<AsinRecord>,
        business: Vec<BusinessRecord>,
        ads: Vec<AdRecord>,
    ) -> Self {
        let hierarchy = AsinHierarchy::from_records(&asin_records);

        info!(
            "Metrics engine built from {} ASIN rows, {} business rows, {} ad rows",
            asin_records.len(),
            business.len(),
            ads.len()
        );

        MetricsEngine {
            asin_records,
            business,
            ads,
            hierarchy,
        }
    }

    pub fn hierarchy(&self) -> &AsinHierarchy {
        &self.hierarchy
    }

    /// Period-by-period metrics at the requested level and granularity.
    /// Returns an empty table when the filters leave no business data.
    pub fn get_metrics(&self, request: &MetricsRequest) -> Vec<MetricRow> {
        let (business, ads) = self.filtered_inputs(request);

        if business.is_empty() {
            return Vec::new();
        }

        let bucketed = bucket_ads_to_period(&ads, request.granularity);
        debug!(
            "Aggregating {} business rows against {} ad period rows at {} level",
            business.len(),
            bucketed.len(),
            request.level
        );

        let mut rows = aggregate(&business, &bucketed, request.level, &self.hierarchy);
        apply_derived(&mut rows);

        if request.include_comparison && request.level != Level::Custom {
            add_period_comparison(&mut rows, request.granularity);
        }

        rows
    }

    /// One row summing every period the request selects. Ratios are
    /// recomputed from the summed bases; a single-period rollup therefore
    /// matches the per-period row exactly.
    pub fn get_cumulative_metrics(&self, request: &MetricsRequest) -> Option<CumulativeMetrics> {
        let request = MetricsRequest {
            include_comparison: false,
            ..request.clone()
        };

        let rows = self.get_metrics(&request);
        cumulative_rollup(&rows)
    }

    /// Compare a month against the same month one year prior, aggregated
    /// independently at the requested level. The custom level has no entity
    /// key to join on and is rejected.
    pub fn get_yoy_comparison(
        &self,
        seller_id: Option<i64>,
        month: NaiveDate,
        selection: &AsinSelection,
        level: Level,
    ) -> Result<Vec<YoyRow>> {
        if level == Level::Custom {
            return Err(MetricsError::UnsupportedLevel {
                level: level.to_string(),
                operation: "year-over-year comparison",
            });
        }

        let current_month = month_start(month);
        let prior_year_month = same_month_prior_year(current_month);

        let month_request = |month: NaiveDate| MetricsRequest {
            seller_id,
            selection: selection.clone(),
            time_range: TimeRange::for_months(vec![month]),
            level,
            granularity: Granularity::Monthly,
            include_comparison: false,
        };

        let current_rows = self.get_metrics(&month_request(current_month));
        let prior_rows = self.get_metrics(&month_request(prior_year_month));

        Ok(build_yoy(
            &current_rows,
            &prior_rows,
            level,
            current_month,
            prior_year_month,
        ))
    }

    /// Pivot report: fetch metrics per the request, then reshape to one row
    /// per entity with one column per (period, metric) pair.
    pub fn pivot_report(
        &self,
        request: &MetricsRequest,
        metrics: Option<&[MetricKey]>,
        include_totals: bool,
    ) -> PivotTable {
        let request = MetricsRequest {
            include_comparison: false,
            ..request.clone()
        };

        let rows = self.get_metrics(&request);
        build_pivot(
            &rows,
            request.level,
            request.granularity,
            metrics,
            include_totals,
        )
    }

    pub fn sellers(&self) -> Vec<SellerSummary> {
        sellers(&self.asin_records)
    }

    pub fn asin_hierarchy(&self, seller_id: Option<i64>) -> Vec<ParentGroup> {
        self.hierarchy.hierarchy(seller_id)
    }

    pub fn detect_data_gaps(&self, granularity: Granularity) -> Vec<GapRecord> {
        detect_data_gaps(&self.business, &self.ads, granularity)
    }

    pub fn coverage_summary(&self) -> Vec<CoverageSummary> {
        coverage_summary(&self.business, &self.ads)
    }

    // Seller, granularity, time, and ASIN filters applied to both tables.
    // A non-empty selection always filters, so a selection that expands to
    // nothing yields empty data rather than silently reporting everything.
    fn filtered_inputs(&self, request: &MetricsRequest) -> (Vec<BusinessRecord>, Vec<AdRecord>) {
        let seller_matches = |id: i64| request.seller_id.map_or(true, |wanted| id == wanted);

        let business: Vec<BusinessRecord> = self
            .business
            .iter()
            .filter(|r| seller_matches(r.seller_id))
            .cloned()
            .collect();
        let ads: Vec<AdRecord> = self
            .ads
            .iter()
            .filter(|r| seller_matches(r.seller_id))
            .cloned()
            .collect();

        let mut business = filter_business(&business, &request.time_range, Some(request.granularity));
        let mut ads = filter_ads(&ads, &request.time_range);

        if !request.selection.is_empty() {
            let selected = self.hierarchy.expand(&request.selection);
            business.retain(|r| selected.contains(&r.child_asin));
            ads.retain(|r| selected.contains(&r.child_asin));
        }

        (business, ads)
    }
}
