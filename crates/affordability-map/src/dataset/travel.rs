use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io::Read;

use serde::Deserialize;
use tracing::{debug, warn};

use super::DatasetError;
use crate::affordability::{
    AmenityDestination, AmenityKind, AmenityTravelRecord, PostalCode, TravelDirectory, TravelLeg,
    TravelMode,
};

/// Parse the nearest-amenity travel directory keyed by postal code.
///
/// Amenity kinds and travel modes the engine does not know about are skipped, as
/// are legs lacking either a distance or a duration. Keys are read in sorted order;
/// when two keys name the same postal code or amenity the first one is kept.
pub fn parse_travel_directory<R: Read>(reader: R) -> Result<TravelDirectory, DatasetError> {
    let raw: BTreeMap<String, RawEntry> = serde_json::from_reader(reader)?;
    let records = raw
        .into_iter()
        .map(|(postal_code, entry)| entry.into_record(PostalCode::new(postal_code.trim())));
    Ok(TravelDirectory::from_records(records))
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    nearest_location: BTreeMap<String, RawLocation>,
}

#[derive(Debug, Deserialize)]
struct RawLocation {
    #[serde(default)]
    destination_name: String,
    #[serde(default)]
    destination_address: Option<String>,
    #[serde(default)]
    travel_data: BTreeMap<String, RawTravelMethod>,
}

#[derive(Debug, Deserialize)]
struct RawTravelMethod {
    #[serde(default)]
    distance: Option<RawDistance>,
    #[serde(default)]
    duration: Option<RawDuration>,
}

#[derive(Debug, Deserialize)]
struct RawDistance {
    #[serde(default)]
    kilometers: Option<f64>,
    #[serde(default)]
    meters: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawDuration {
    #[serde(default)]
    minutes: Option<f64>,
    #[serde(default)]
    seconds: Option<f64>,
}

impl RawEntry {
    fn into_record(self, postal_code: PostalCode) -> AmenityTravelRecord {
        let mut amenities = BTreeMap::new();
        for (key, location) in self.nearest_location {
            let Ok(kind) = key.parse::<AmenityKind>() else {
                debug!(%postal_code, amenity = %key, "skipping unknown amenity");
                continue;
            };
            match amenities.entry(kind) {
                Entry::Vacant(slot) => {
                    slot.insert(location.into_destination(&postal_code));
                }
                Entry::Occupied(_) => {
                    warn!(%postal_code, amenity = %key, "duplicate amenity entry dropped");
                }
            }
        }

        AmenityTravelRecord {
            postal_code,
            amenities,
        }
    }
}

impl RawLocation {
    fn into_destination(self, postal_code: &PostalCode) -> AmenityDestination {
        let mut legs = BTreeMap::new();
        for (mode, method) in self.travel_data {
            let Some(mode) = TravelMode::from_slug(mode.trim()) else {
                continue;
            };
            match method.into_leg() {
                Some(leg) => {
                    legs.insert(mode, leg);
                }
                None => debug!(%postal_code, %mode, "travel leg without distance or duration"),
            }
        }

        AmenityDestination {
            name: self.destination_name,
            address: self
                .destination_address
                .filter(|address| !address.trim().is_empty()),
            legs,
        }
    }
}

impl RawTravelMethod {
    fn into_leg(self) -> Option<TravelLeg> {
        let distance = self.distance?;
        let duration = self.duration?;
        let distance_km = distance
            .kilometers
            .or_else(|| distance.meters.map(|meters| meters / 1000.0))?;
        let duration_minutes = duration
            .minutes
            .or_else(|| duration.seconds.map(|seconds| seconds / 60.0))?;

        Some(TravelLeg {
            distance_km,
            duration_minutes,
        })
    }
}
