use chrono::NaiveDate;
use seller_metrics_engine::*;

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn asin(seller_id: i64, child: &str, parent: &str, variant: &str) -> AsinRecord {
    AsinRecord {
        seller_id,
        seller_name: "Retail Haven".to_string(),
        marketplace: "US".to_string(),
        child_asin: child.to_string(),
        parent_asin: format!("P-{}", parent),
        normalized_name: parent.to_string(),
        variant_name: variant.to_string(),
        title: format!("{} ({})", parent, variant),
    }
}

fn biz(
    seller_id: i64,
    child: &str,
    period: &str,
    granularity: Granularity,
    sales: f64,
    sessions: f64,
    units: f64,
) -> BusinessRecord {
    BusinessRecord {
        seller_id,
        seller_name: "Retail Haven".to_string(),
        child_asin: child.to_string(),
        period_start_date: date(period),
        period_granularity: granularity,
        sales_total: sales,
        sessions_total: Some(sessions),
        units_total: Some(units),
        page_views_total: Some(sessions * 2.0),
    }
}

fn ad(seller_id: i64, child: &str, day: &str, spend: f64, ad_sales: f64) -> AdRecord {
    AdRecord {
        seller_id,
        child_asin: child.to_string(),
        record_date: date(day),
        spend,
        ad_sales,
        impressions: 1000.0,
        clicks: 20.0,
        ad_orders: Some(3.0),
        ad_units: Some(4.0),
    }
}

/// Two ASINs under "Widget", one under "Gadget", two weekly periods, ads
/// spread over individual days of those weeks.
fn sample_engine() -> MetricsEngine {
    MetricsEngine::new(
        vec![
            asin(1, "B001", "Widget", "Red"),
            asin(1, "B002", "Widget", "Blue"),
            asin(1, "B003", "Gadget", "Large"),
        ],
        vec![
            biz(1, "B001", "2025-01-05", Granularity::Weekly, 100.0, 200.0, 20.0),
            biz(1, "B002", "2025-01-05", Granularity::Weekly, 50.0, 100.0, 5.0),
            biz(1, "B003", "2025-01-05", Granularity::Weekly, 30.0, 60.0, 3.0),
            biz(1, "B001", "2025-01-12", Granularity::Weekly, 140.0, 210.0, 21.0),
            biz(1, "B002", "2025-01-12", Granularity::Weekly, 70.0, 120.0, 6.0),
        ],
        vec![
            ad(1, "B001", "2025-01-06", 10.0, 40.0),
            ad(1, "B001", "2025-01-09", 6.0, 24.0),
            ad(1, "B002", "2025-01-07", 4.0, 16.0),
            ad(1, "B003", "2025-01-08", 2.0, 8.0),
            ad(1, "B001", "2025-01-13", 12.0, 48.0),
        ],
    )
}

fn request(level: Level) -> MetricsRequest {
    MetricsRequest {
        level,
        ..MetricsRequest::default()
    }
}

#[test]
fn test_child_rows_sum_to_parent_row() {
    let engine = sample_engine();

    let child_rows = engine.get_metrics(&request(Level::Child));
    let parent_rows = engine.get_metrics(&request(Level::Parent));

    let week = date("2025-01-05");
    let widget_child_sales: f64 = child_rows
        .iter()
        .filter(|r| r.normalized_name.as_deref() == Some("Widget") && r.period_start == week)
        .map(|r| r.base.total_sales)
        .sum();

    let widget_parent = parent_rows
        .iter()
        .find(|r| r.normalized_name.as_deref() == Some("Widget") && r.period_start == week)
        .unwrap();

    assert_eq!(widget_child_sales, 150.0);
    assert_eq!(widget_parent.base.total_sales, 150.0);

    // Ad spend follows the same rollup: B001 (10+6) + B002 (4).
    assert_eq!(widget_parent.base.ad_spend, 20.0);
}

#[test]
fn test_parent_rows_sum_to_account_row() {
    let engine = sample_engine();

    let parent_rows = engine.get_metrics(&request(Level::Parent));
    let account_rows = engine.get_metrics(&request(Level::Account));

    let week = date("2025-01-05");
    let parent_total: f64 = parent_rows
        .iter()
        .filter(|r| r.period_start == week)
        .map(|r| r.base.total_sales)
        .sum();

    let account = account_rows
        .iter()
        .find(|r| r.period_start == week)
        .unwrap();

    assert_eq!(parent_total, 180.0);
    assert_eq!(account.base.total_sales, 180.0);
}

#[test]
fn test_account_equals_single_parent_when_only_widget_selected() {
    let engine = sample_engine();

    let selection = AsinSelection {
        parent_names: vec!["Widget".to_string()],
        child_asins: vec![],
    };

    let account_rows = engine.get_metrics(&MetricsRequest {
        selection,
        ..request(Level::Account)
    });

    let week_one = account_rows
        .iter()
        .find(|r| r.period_start == date("2025-01-05"))
        .unwrap();
    assert_eq!(week_one.base.total_sales, 150.0);
}

#[test]
fn test_cumulative_recomputes_ratios_from_summed_bases() {
    let engine = sample_engine();

    let cumulative = engine
        .get_cumulative_metrics(&request(Level::Account))
        .unwrap();

    // All ads: spend 10+6+4+2+12, sales 40+24+16+8+48.
    assert_eq!(cumulative.base.ad_spend, 34.0);
    assert_eq!(cumulative.base.ad_sales, 136.0);
    assert_eq!(cumulative.derived.roas, 4.0);

    assert_eq!(cumulative.period_start, date("2025-01-05"));
    assert_eq!(cumulative.period_end, date("2025-01-12"));
    assert_eq!(cumulative.periods_count, 2);
}

#[test]
fn test_cumulative_identity_over_single_period() {
    let engine = sample_engine();

    let single_week = MetricsRequest {
        time_range: TimeRange {
            specific_weeks: vec![date("2025-01-12")],
            ..TimeRange::default()
        },
        ..request(Level::Account)
    };

    let rows = engine.get_metrics(&single_week);
    assert_eq!(rows.len(), 1);

    let cumulative = engine.get_cumulative_metrics(&single_week).unwrap();
    assert_eq!(cumulative.base, rows[0].base);
    assert_eq!(cumulative.derived, rows[0].derived);
    assert_eq!(cumulative.periods_count, 1);
}

#[test]
fn test_week_over_week_comparison_values() {
    let engine = sample_engine();

    let rows = engine.get_metrics(&MetricsRequest {
        include_comparison: true,
        ..request(Level::Account)
    });

    assert_eq!(rows.len(), 2);

    let week_two = rows
        .iter()
        .find(|r| r.period_start == date("2025-01-12"))
        .unwrap();
    let comparison = week_two.comparison.as_ref().unwrap();
    assert_eq!(comparison.basis, CompareBasis::WeekOverWeek);

    // Account sales: 180 then 210.
    let sales = &comparison.deltas[&MetricKey::TotalSales];
    assert_eq!(sales.previous, Some(180.0));
    assert_eq!(sales.change, 30.0);
    assert_eq!(sales.change_pct, 16.7);

    // The first week has no prior period.
    let week_one = rows
        .iter()
        .find(|r| r.period_start == date("2025-01-05"))
        .unwrap();
    let first = &week_one.comparison.as_ref().unwrap().deltas[&MetricKey::TotalSales];
    assert_eq!(first.previous, None);
    assert_eq!(first.change, 0.0);
}

#[test]
fn test_yoy_comparison_with_new_and_repeat_entities() {
    let engine = MetricsEngine::new(
        vec![
            asin(1, "B001", "Widget", "Red"),
            asin(1, "B003", "Gadget", "Large"),
        ],
        vec![
            biz(1, "B001", "2024-01-01", Granularity::Monthly, 100.0, 400.0, 40.0),
            biz(1, "B001", "2025-01-01", Granularity::Monthly, 150.0, 500.0, 50.0),
            // Gadget is new this year.
            biz(1, "B003", "2025-01-01", Granularity::Monthly, 150.0, 300.0, 30.0),
        ],
        vec![],
    );

    let rows = engine
        .get_yoy_comparison(
            Some(1),
            date("2025-01-20"),
            &AsinSelection::default(),
            Level::Parent,
        )
        .unwrap();

    assert_eq!(rows.len(), 2);

    let widget = rows
        .iter()
        .find(|r| r.normalized_name.as_deref() == Some("Widget"))
        .unwrap();
    let sales = &widget.metrics[&MetricKey::TotalSales];
    assert_eq!(sales.prior, 100.0);
    assert_eq!(sales.change, 50.0);
    assert_eq!(sales.change_pct, 50.0);
    assert_eq!(widget.current_month, date("2025-01-01"));
    assert_eq!(widget.prior_year_month, date("2024-01-01"));

    // New entity: prior 0, current 150 -> change 150, pct exactly 100.
    let gadget = rows
        .iter()
        .find(|r| r.normalized_name.as_deref() == Some("Gadget"))
        .unwrap();
    let sales = &gadget.metrics[&MetricKey::TotalSales];
    assert_eq!(sales.prior, 0.0);
    assert_eq!(sales.change, 150.0);
    assert_eq!(sales.change_pct, 100.0);
}

#[test]
fn test_gap_detection_round_trip() {
    // Full coverage first: three consecutive weeks in both tables.
    let full_business = vec![
        biz(1, "B001", "2025-01-05", Granularity::Weekly, 10.0, 10.0, 1.0),
        biz(1, "B001", "2025-01-12", Granularity::Weekly, 10.0, 10.0, 1.0),
        biz(1, "B001", "2025-01-19", Granularity::Weekly, 10.0, 10.0, 1.0),
    ];
    let full_ads = vec![
        ad(1, "B001", "2025-01-06", 1.0, 2.0),
        ad(1, "B001", "2025-01-13", 1.0, 2.0),
        ad(1, "B001", "2025-01-21", 1.0, 2.0),
    ];

    let covered = MetricsEngine::new(vec![], full_business.clone(), full_ads.clone());
    assert!(covered.detect_data_gaps(Granularity::Weekly).is_empty());

    // Remove the middle business week: exactly one missing_business gap
    // spanning that week.
    let mut partial_business = full_business;
    partial_business.remove(1);

    let gappy = MetricsEngine::new(vec![], partial_business, full_ads);
    let gaps = gappy.detect_data_gaps(Granularity::Weekly);

    assert_eq!(gaps.len(), 1);
    let gap = &gaps[0];
    assert_eq!(gap.gap_type, GapType::MissingBusiness);
    assert_eq!(gap.period_start, date("2025-01-12"));
    assert_eq!(gap.period_end, date("2025-01-18"));
    assert!(!gap.has_business_data);
    assert!(gap.has_ads_data);
}

#[test]
fn test_pivot_totals_match_column_sums() {
    let engine = sample_engine();

    let metrics = metric_preset("organic_vs_paid").unwrap();
    let table = engine.pivot_report(&request(Level::Parent), Some(&metrics), true);

    // Widget + Gadget entity rows plus TOTAL.
    assert_eq!(table.rows.len(), 3);
    let total = table.rows.last().unwrap();
    assert!(total.is_total);

    let names = table.column_names();
    let sales_idx = names
        .iter()
        .position(|n| *n == "Jan_05_total_sales")
        .unwrap();
    let entity_sum: f64 = table
        .rows
        .iter()
        .filter(|r| !r.is_total)
        .map(|r| r.values[sales_idx])
        .sum();

    assert_eq!(entity_sum, 180.0);
    assert_eq!(total.values[sales_idx], 180.0);

    // TACoS on the totals row comes from summed bases: the preset carries
    // total_sales and ad_sales but no ad_spend column, so the recomputed
    // ratio treats spend as absent.
    let tacos_idx = names.iter().position(|n| *n == "Jan_05_tacos_pct").unwrap();
    assert_eq!(total.values[tacos_idx], 0.0);
}

#[test]
fn test_pivot_roas_total_recomputed_from_period_sums() {
    let engine = sample_engine();

    let metrics = [MetricKey::AdSpend, MetricKey::AdSales, MetricKey::Roas];
    let table = engine.pivot_report(&request(Level::Parent), Some(&metrics), true);
    let total = table.rows.last().unwrap();
    assert!(total.is_total);

    let names = table.column_names();
    let spend_idx = names.iter().position(|n| *n == "Jan_05_ad_spend").unwrap();
    let sales_idx = names.iter().position(|n| *n == "Jan_05_ad_sales").unwrap();
    let roas_idx = names.iter().position(|n| *n == "Jan_05_roas").unwrap();

    // Jan 5 week across Widget and Gadget: spend 20 + 2, ad sales 80 + 8.
    assert_eq!(total.values[spend_idx], 22.0);
    assert_eq!(total.values[sales_idx], 88.0);
    assert_eq!(total.values[roas_idx], 4.0);
}

#[test]
fn test_time_range_bounds_restrict_periods() {
    let engine = sample_engine();

    let rows = engine.get_metrics(&MetricsRequest {
        time_range: TimeRange {
            start_date: Some(date("2025-01-12")),
            ..TimeRange::default()
        },
        ..request(Level::Account)
    });

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].period_start, date("2025-01-12"));
    // Only the Jan 13 ad day falls inside the bound.
    assert_eq!(rows[0].base.ad_spend, 12.0);
}

#[test]
fn test_custom_level_collapses_selection_to_one_row_per_period() {
    let engine = sample_engine();

    let rows = engine.get_metrics(&MetricsRequest {
        selection: AsinSelection {
            parent_names: vec!["Widget".to_string()],
            child_asins: vec!["B003".to_string()],
        },
        ..request(Level::Custom)
    });

    assert_eq!(rows.len(), 2);
    let week_one = rows
        .iter()
        .find(|r| r.period_start == date("2025-01-05"))
        .unwrap();

    assert!(week_one.seller_id.is_none());
    assert!(week_one.child_asin.is_none());
    assert_eq!(week_one.base.total_sales, 180.0);
}

#[test]
fn test_request_serialization_round_trip() -> anyhow::Result<()> {
    let request = MetricsRequest {
        seller_id: Some(7),
        selection: AsinSelection {
            parent_names: vec!["Widget".to_string()],
            child_asins: vec!["B009".to_string()],
        },
        time_range: TimeRange {
            start_date: Some(date("2025-01-01")),
            end_date: Some(date("2025-03-31")),
            ..TimeRange::default()
        },
        level: Level::Child,
        granularity: Granularity::Monthly,
        include_comparison: true,
    };

    let json = serde_json::to_string(&request)?;
    let back: MetricsRequest = serde_json::from_str(&json)?;

    assert_eq!(back.seller_id, Some(7));
    assert_eq!(back.level, Level::Child);
    assert_eq!(back.granularity, Granularity::Monthly);
    assert!(back.include_comparison);
    Ok(())
}

#[test]
fn test_sellers_and_hierarchy_listing() {
    let engine = sample_engine();

    let sellers = engine.sellers();
    assert_eq!(sellers.len(), 1);
    assert_eq!(sellers[0].asin_count, 3);
    assert_eq!(sellers[0].product_count, 2);

    let hierarchy = engine.asin_hierarchy(Some(1));
    let names: Vec<&str> = hierarchy
        .iter()
        .map(|g| g.normalized_name.as_str())
        .collect();
    assert_eq!(names, vec!["Gadget", "Widget"]);
}

#[test]
fn test_metric_rows_never_produce_non_finite_ratios() {
    // Sessions, impressions, spend, and sales all zero.
    let engine = MetricsEngine::new(
        vec![asin(1, "B001", "Widget", "Red")],
        vec![BusinessRecord {
            seller_id: 1,
            seller_name: "Retail Haven".to_string(),
            child_asin: "B001".to_string(),
            period_start_date: date("2025-01-05"),
            period_granularity: Granularity::Weekly,
            sales_total: 0.0,
            sessions_total: None,
            units_total: None,
            page_views_total: None,
        }],
        vec![],
    );

    let rows = engine.get_metrics(&request(Level::Child));
    assert_eq!(rows.len(), 1);

    let derived = &rows[0].derived;
    for value in [
        derived.cvr_pct,
        derived.ctr_pct,
        derived.roas,
        derived.acos_pct,
        derived.tacos_pct,
        derived.organic_pct,
        derived.ad_sales_pct,
    ] {
        assert_eq!(value, 0.0);
        assert!(value.is_finite());
    }
}
