use chrono::NaiveDate;

use super::common::*;
use crate::affordability::classifier::Classification;
use crate::affordability::domain::{AmenityKind, City, FilterRule, TravelMode};
use crate::affordability::report::ClassificationReport;
use crate::affordability::session::ClassificationSession;

fn report_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date")
}

#[test]
fn report_requires_a_ready_session() {
    let session = ClassificationSession::new(City::Oslo);
    assert!(ClassificationReport::from_session(&session, report_date()).is_err());
}

#[test]
fn rows_follow_postal_code_order() {
    let mut session = ready_session();
    session.set_filter_rule(
        AmenityKind::ShoppingMall,
        Some(FilterRule::within(TravelMode::Walking, Some(2.0), None)),
    );

    let report = ClassificationReport::from_session(&session, report_date()).expect("ready");
    let codes: Vec<_> = report.rows.iter().map(|row| row.postal_code.as_str()).collect();
    assert_eq!(codes, vec!["0150", "0151", "0152", "0153"]);

    assert_eq!(report.rows[2].classification, Classification::Unaffordable);
    assert!(report.rows[2].filtered);
    assert_eq!(report.rows[3].price, None);
    assert_eq!(report.summary.total, 4);
}

#[test]
fn csv_output_has_a_header_and_one_line_per_region() {
    let session = ready_session();
    let report = ClassificationReport::from_session(&session, report_date()).expect("ready");

    let mut buffer = Vec::new();
    report.write_csv(&mut buffer).expect("csv written");
    let csv = String::from_utf8(buffer).expect("utf8");
    let lines: Vec<_> = csv.lines().collect();

    assert_eq!(lines[0], "postal_code,place_name,price,classification,filtered");
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[1], "0150,,2500000,strongly_affordable,false");
    assert_eq!(lines[4], "0153,,,unaffordable,false");
}

#[test]
fn text_output_lists_categories_and_regions() {
    let session = ready_session();
    let report = ClassificationReport::from_session(&session, report_date()).expect("ready");
    let text = report.render_text();

    assert!(text.contains("Generated 2024-03-01"));
    assert!(text.contains("ceiling 3300000"));
    assert!(text.contains("- marginally_affordable: 1"));
    assert!(text.contains("- 0153 - | no price | unaffordable"));
}

#[test]
fn text_output_lists_active_filters_by_amenity() {
    let mut session = ready_session();
    assert!(!ClassificationReport::from_session(&session, report_date())
        .expect("ready")
        .render_text()
        .contains("Proximity filters"));

    session.set_filter_rule(
        AmenityKind::ShoppingMall,
        Some(FilterRule::within(TravelMode::Walking, Some(2.0), None)),
    );
    session.set_filter_rule(
        AmenityKind::LiquorStore,
        Some(FilterRule {
            active: false,
            ..FilterRule::within(TravelMode::Driving, None, Some(15.0))
        }),
    );
    let text = ClassificationReport::from_session(&session, report_date())
        .expect("ready")
        .render_text();

    assert!(text.contains("Proximity filters\n- Shopping mall: walking under 2 km\n"));
    assert!(!text.contains("Liquor store"));
    assert!(text.ends_with("unaffordable\n"));
}

#[test]
fn json_output_carries_summary_and_rows() {
    let session = ready_session();
    let report = ClassificationReport::from_session(&session, report_date()).expect("ready");

    let mut buffer = Vec::new();
    report.write_json(&mut buffer).expect("json written");
    let payload: serde_json::Value = serde_json::from_slice(&buffer).expect("valid json");

    assert_eq!(payload["city"], "oslo");
    assert_eq!(payload["generated_on"], "2024-03-01");
    assert_eq!(payload["reference_size"], 60);
    assert_eq!(payload["rows"].as_array().map(Vec::len), Some(4));
    assert_eq!(payload["summary"]["counts"]["strongly_affordable"], 2);
}
