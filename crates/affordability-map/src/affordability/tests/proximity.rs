use super::common::*;
use crate::affordability::domain::{
    AmenityKind, AmenityTravelRecord, FilterConfiguration, FilterRule, TravelMode,
};
use crate::affordability::proximity::{evaluate, explain, ProximityFailureReason};

fn walk_to_mall(max_distance_km: Option<f64>, max_minutes: Option<f64>) -> FilterConfiguration {
    FilterConfiguration::new().with_rule(
        AmenityKind::ShoppingMall,
        FilterRule::within(TravelMode::Walking, max_distance_km, max_minutes),
    )
}

#[test]
fn empty_configuration_filters_nothing() {
    let record = remote("0152");
    assert!(!evaluate(Some(&record), &FilterConfiguration::new()));
}

#[test]
fn inactive_rules_impose_no_constraint() {
    let record = remote("0152");
    let config = FilterConfiguration::new().with_rule(
        AmenityKind::ShoppingMall,
        FilterRule {
            active: false,
            mode: TravelMode::Walking,
            max_distance_km: Some(0.1),
            max_minutes: Some(1.0),
        },
    );
    assert!(!evaluate(Some(&record), &config));
}

#[test]
fn limits_are_exclusive() {
    let record = well_connected("0150");

    assert!(!evaluate(Some(&record), &walk_to_mall(Some(0.81), None)));
    assert!(evaluate(Some(&record), &walk_to_mall(Some(0.8), None)));
    assert!(!evaluate(Some(&record), &walk_to_mall(None, Some(10.5))));
    assert!(evaluate(Some(&record), &walk_to_mall(None, Some(10.0))));
}

#[test]
fn either_limit_failing_filters_the_region() {
    let record = well_connected("0150");
    let config = walk_to_mall(Some(5.0), Some(5.0));

    assert!(evaluate(Some(&record), &config));
    let failures = explain(Some(&record), &config);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].amenity, AmenityKind::ShoppingMall);
    assert!(matches!(
        failures[0].reason,
        ProximityFailureReason::DurationLimit { max_minutes, .. } if max_minutes == 5.0
    ));
}

#[test]
fn rules_use_the_selected_travel_mode() {
    let record = well_connected("0150");
    let by_car = FilterConfiguration::new().with_rule(
        AmenityKind::ShoppingMall,
        FilterRule::within(TravelMode::Driving, Some(1.0), None),
    );
    // Walking distance is 0.8 km but the car route is 1.5 km.
    assert!(evaluate(Some(&record), &by_car));
}

#[test]
fn missing_figure_for_an_active_rule_filters_the_region() {
    let record = well_connected("0150");
    let walk_to_liquor = FilterConfiguration::new().with_rule(
        AmenityKind::LiquorStore,
        FilterRule::within(TravelMode::Walking, None, None),
    );

    assert!(evaluate(Some(&record), &walk_to_liquor));
    let failures = explain(Some(&record), &walk_to_liquor);
    assert_eq!(
        failures[0].reason,
        ProximityFailureReason::MissingTravelData {
            mode: TravelMode::Walking
        }
    );
}

#[test]
fn missing_amenity_kind_filters_the_region() {
    let record = travel_record(
        "0160",
        &[(
            AmenityKind::LiquorStore,
            destination("Vinmonopolet", &[(TravelMode::Walking, leg(0.5, 6.0))]),
        )],
    );
    assert!(evaluate(Some(&record), &walk_to_mall(Some(10.0), None)));
}

#[test]
fn regions_without_any_amenity_data_pass() {
    let config = walk_to_mall(Some(0.1), Some(1.0));

    assert!(!evaluate(None, &config));
    assert!(!evaluate(Some(&AmenityTravelRecord::new("0153")), &config));
    assert!(explain(None, &config).is_empty());
}

#[test]
fn activating_more_rules_never_unfilters_a_region() {
    let records = [well_connected("0150"), remote("0152")];
    let single = walk_to_mall(Some(2.0), None);
    let both = single.clone().with_rule(
        AmenityKind::LiquorStore,
        FilterRule::within(TravelMode::Driving, Some(5.0), Some(15.0)),
    );

    for record in &records {
        if evaluate(Some(record), &single) {
            assert!(evaluate(Some(record), &both));
        }
    }
    assert!(!evaluate(Some(&records[0]), &both));
    assert!(evaluate(Some(&records[1]), &both));
}

#[test]
fn explain_lists_every_failing_amenity() {
    let record = remote("0152");
    let config = walk_to_mall(Some(2.0), None).with_rule(
        AmenityKind::LiquorStore,
        FilterRule::within(TravelMode::Driving, None, Some(15.0)),
    );

    let failures = explain(Some(&record), &config);
    let amenities: Vec<_> = failures.iter().map(|failure| failure.amenity).collect();
    assert_eq!(
        amenities,
        vec![AmenityKind::ShoppingMall, AmenityKind::LiquorStore]
    );
}
