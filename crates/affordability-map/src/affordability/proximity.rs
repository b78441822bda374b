use serde::{Deserialize, Serialize};

use super::domain::{AmenityKind, AmenityTravelRecord, FilterConfiguration, FilterRule, TravelMode};

/// Why an active filter rule rejected a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ProximityFailureReason {
    MissingTravelData { mode: TravelMode },
    DistanceLimit { distance_km: f64, max_distance_km: f64 },
    DurationLimit { duration_minutes: f64, max_minutes: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityFailure {
    pub amenity: AmenityKind,
    #[serde(flatten)]
    pub reason: ProximityFailureReason,
}

/// Returns `true` when the region fails at least one active rule and is filtered out.
///
/// Regions without any amenity data pass: amenity filtering only applies where the
/// dataset covers the region.
pub fn evaluate(travel: Option<&AmenityTravelRecord>, config: &FilterConfiguration) -> bool {
    let Some(record) = travel.filter(|record| !record.is_empty()) else {
        return false;
    };

    config
        .active_rules()
        .any(|(kind, rule)| check_rule(record, kind, rule).is_some())
}

/// Every failing active rule, in amenity order. Empty when the region passes.
pub fn explain(
    travel: Option<&AmenityTravelRecord>,
    config: &FilterConfiguration,
) -> Vec<ProximityFailure> {
    let Some(record) = travel.filter(|record| !record.is_empty()) else {
        return Vec::new();
    };

    config
        .active_rules()
        .filter_map(|(kind, rule)| {
            check_rule(record, kind, rule).map(|reason| ProximityFailure {
                amenity: kind,
                reason,
            })
        })
        .collect()
}

fn check_rule(
    record: &AmenityTravelRecord,
    kind: AmenityKind,
    rule: &FilterRule,
) -> Option<ProximityFailureReason> {
    let Some(leg) = record.leg(kind, rule.mode) else {
        return Some(ProximityFailureReason::MissingTravelData { mode: rule.mode });
    };

    if let Some(max_distance_km) = rule.max_distance_km {
        if leg.distance_km >= max_distance_km {
            return Some(ProximityFailureReason::DistanceLimit {
                distance_km: leg.distance_km,
                max_distance_km,
            });
        }
    }

    if let Some(max_minutes) = rule.max_minutes {
        if leg.duration_minutes >= max_minutes {
            return Some(ProximityFailureReason::DurationLimit {
                duration_minutes: leg.duration_minutes,
                max_minutes,
            });
        }
    }

    None
}
