//! Affordability and amenity-proximity classification.
//!
//! [`purchasing_power`], [`proximity`] and [`classifier`] are pure functions;
//! [`ClassificationSession`] owns the buyer's inputs and the loaded datasets and
//! re-runs them on every change.

pub mod classifier;
pub mod domain;
pub mod proximity;
pub mod purchasing_power;
pub mod report;
pub mod session;

#[cfg(test)]
mod tests;

pub use classifier::{classify, Classification, STRONG_HEADROOM_FACTOR};
pub use domain::{
    AmenityDestination, AmenityKind, AmenityTravelRecord, City, DuplicatePostalCode,
    FilterConfiguration, FilterRule, FinancialProfile, FinancialProfileUpdate, MapCentre,
    PostalCode, ReferenceSize, ReferenceSizeError, Region, RegionDataset, RegionStatistics,
    TravelDirectory, TravelLeg, TravelMode, UnknownAmenity, UnknownCity, UnknownTravelMode,
};
pub use proximity::{ProximityFailure, ProximityFailureReason};
pub use purchasing_power::{AffordabilityCeiling, LOAN_TO_INCOME_MULTIPLIER};
pub use report::{ClassificationReport, ReportError, ReportRow};
pub use session::{
    ClassificationSession, ClassificationSummary, LoadOutcome, LoadTicket, Readiness,
    RegionAssessment, SelectionDetail, SessionError,
};
