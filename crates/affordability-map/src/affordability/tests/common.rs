use std::collections::BTreeMap;
use std::sync::Arc;

use crate::affordability::domain::{
    AmenityDestination, AmenityKind, AmenityTravelRecord, City, FinancialProfileUpdate, Region,
    RegionDataset, TravelDirectory, TravelLeg, TravelMode,
};
use crate::affordability::purchasing_power::AffordabilityCeiling;
use crate::affordability::session::ClassificationSession;

pub(super) fn ceiling(value: f64) -> AffordabilityCeiling {
    AffordabilityCeiling::new(value)
}

/// Buyer whose ceiling is exactly 3,300,000.
pub(super) fn buyer_update() -> FinancialProfileUpdate {
    FinancialProfileUpdate {
        equity: Some(500_000.0),
        annual_income: Some(600_000.0),
        existing_debt: Some(200_000.0),
        extra_loan: Some(0.0),
    }
}

pub(super) fn leg(distance_km: f64, duration_minutes: f64) -> TravelLeg {
    TravelLeg {
        distance_km,
        duration_minutes,
    }
}

pub(super) fn destination(name: &str, legs: &[(TravelMode, TravelLeg)]) -> AmenityDestination {
    AmenityDestination {
        name: name.to_string(),
        address: None,
        legs: legs.iter().copied().collect::<BTreeMap<_, _>>(),
    }
}

pub(super) fn travel_record(
    postal_code: &str,
    amenities: &[(AmenityKind, AmenityDestination)],
) -> AmenityTravelRecord {
    let mut record = AmenityTravelRecord::new(postal_code);
    for (kind, destination) in amenities {
        record.amenities.insert(*kind, destination.clone());
    }
    record
}

/// Mall within a short walk and a liquor store only reachable by car.
pub(super) fn well_connected(postal_code: &str) -> AmenityTravelRecord {
    travel_record(
        postal_code,
        &[
            (
                AmenityKind::ShoppingMall,
                destination(
                    "Oslo City",
                    &[
                        (TravelMode::Walking, leg(0.8, 10.0)),
                        (TravelMode::Driving, leg(1.5, 4.0)),
                    ],
                ),
            ),
            (
                AmenityKind::LiquorStore,
                destination("Vinmonopolet", &[(TravelMode::Driving, leg(3.0, 8.0))]),
            ),
        ],
    )
}

/// Everything is a long way off.
pub(super) fn remote(postal_code: &str) -> AmenityTravelRecord {
    travel_record(
        postal_code,
        &[
            (
                AmenityKind::ShoppingMall,
                destination(
                    "Storsenter",
                    &[
                        (TravelMode::Walking, leg(9.0, 110.0)),
                        (TravelMode::Driving, leg(11.0, 18.0)),
                    ],
                ),
            ),
            (
                AmenityKind::LiquorStore,
                destination(
                    "Vinmonopolet",
                    &[
                        (TravelMode::Walking, leg(12.0, 150.0)),
                        (TravelMode::Driving, leg(14.0, 20.0)),
                    ],
                ),
            ),
        ],
    )
}

/// Regions A, B and C: A and C share a price, B is pricier, C is remote.
pub(super) fn oslo_regions() -> Arc<RegionDataset> {
    let regions = vec![
        Region::new("0150")
            .with_price(60, 2_500_000.0)
            .with_price(80, 3_400_000.0),
        Region::new("0151").with_price(60, 2_800_000.0),
        Region::new("0152").with_price(60, 2_500_000.0),
        Region::new("0153"),
    ];
    Arc::new(RegionDataset::new(City::Oslo, regions).expect("unique postal codes"))
}

pub(super) fn oslo_travel() -> Arc<TravelDirectory> {
    Arc::new(TravelDirectory::from_records([
        well_connected("0150"),
        well_connected("0151"),
        remote("0152"),
    ]))
}

pub(super) fn bergen_regions() -> Arc<RegionDataset> {
    let regions = vec![
        Region::new("5003").with_price(60, 3_100_000.0),
        Region::new("5004").with_price(60, 2_000_000.0),
    ];
    Arc::new(RegionDataset::new(City::Bergen, regions).expect("unique postal codes"))
}

/// Oslo session with both datasets applied and the 3,300,000 buyer.
pub(super) fn ready_session() -> ClassificationSession {
    let mut session = ClassificationSession::new(City::Oslo);
    let ticket = session.region_load_ticket();
    session.apply_regions(ticket, Ok(oslo_regions()));
    session.apply_travel_directory(Ok(oslo_travel()));
    session.set_financial_profile(buyer_update());
    session
}
