use super::common::*;
use crate::affordability::classifier::{classify, Classification};

#[test]
fn boundaries_around_the_headroom_factor() {
    let price = Some(1_000_000.0);

    assert_eq!(
        classify(ceiling(1_000_000.0), price, false),
        Classification::Unaffordable
    );
    assert_eq!(
        classify(ceiling(1_199_999.0), price, false),
        Classification::MarginallyAffordable
    );
    assert_eq!(
        classify(ceiling(1_200_000.0), price, false),
        Classification::MarginallyAffordable
    );
    assert_eq!(
        classify(ceiling(1_200_001.0), price, false),
        Classification::StronglyAffordable
    );
}

#[test]
fn ceiling_below_price_is_unaffordable() {
    assert_eq!(
        classify(ceiling(999_999.0), Some(1_000_000.0), false),
        Classification::Unaffordable
    );
    assert_eq!(
        classify(ceiling(-50_000.0), Some(1_000_000.0), false),
        Classification::Unaffordable
    );
}

#[test]
fn filtered_regions_are_unaffordable_regardless_of_price() {
    assert_eq!(
        classify(ceiling(5_000_000.0), Some(1_000_000.0), true),
        Classification::Unaffordable
    );
}

#[test]
fn missing_or_degenerate_prices_fail_closed() {
    for price in [None, Some(0.0), Some(-10.0), Some(f64::NAN), Some(f64::INFINITY)] {
        assert_eq!(
            classify(ceiling(50_000_000.0), price, false),
            Classification::Unaffordable,
            "price {price:?} must not be treated as affordable"
        );
    }
}

#[test]
fn classification_is_deterministic() {
    let first = classify(ceiling(3_300_000.0), Some(2_800_000.0), false);
    for _ in 0..10 {
        assert_eq!(classify(ceiling(3_300_000.0), Some(2_800_000.0), false), first);
    }
    assert_eq!(first, Classification::MarginallyAffordable);
}
