use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::classifier::{classify, Classification};
use super::domain::{
    AmenityKind, AmenityTravelRecord, City, FilterConfiguration, FilterRule, FinancialProfile,
    FinancialProfileUpdate, PostalCode, ReferenceSize, Region, RegionDataset, TravelDirectory,
};
use super::proximity::{self, ProximityFailure};
use super::purchasing_power::{self, AffordabilityCeiling};
use crate::dataset::DatasetError;

/// Whether the session can answer classification and selection queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Readiness {
    /// Datasets for the active city have not arrived yet.
    Uninitialized,
    /// The last load attempt failed; the next successful load recovers.
    Unavailable { reason: String },
    Ready,
}

/// Identifies one region load request so late arrivals for a replaced city can be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadTicket {
    pub city: City,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    Applied,
    Stale,
    Unavailable,
}

/// Per-region result of the most recent recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionAssessment {
    pub classification: Classification,
    pub filtered: bool,
    /// Price at the current reference size, if the region publishes one.
    pub price: Option<f64>,
}

/// Detail record for the selected region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionDetail {
    pub region: Region,
    pub travel: Option<AmenityTravelRecord>,
    pub assessment: RegionAssessment,
    pub proximity_failures: Vec<ProximityFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationSummary {
    pub city: City,
    pub ceiling: AffordabilityCeiling,
    pub reference_size: ReferenceSize,
    pub total: usize,
    pub filtered: usize,
    pub counts: BTreeMap<Classification, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("datasets for {city} are not ready")]
    NotReady { city: City, readiness: Readiness },
    #[error("postal code {postal_code} is not part of the {city} dataset")]
    UnknownRegion { city: City, postal_code: PostalCode },
}

/// Owned classification state for one buyer.
///
/// Every setter recomputes the classification of every loaded region before it
/// returns, so reads never observe a category derived from superseded inputs.
/// Region counts are in the low thousands and edits are user-paced, which keeps the
/// total pass cheap enough.
#[derive(Debug)]
pub struct ClassificationSession {
    profile: FinancialProfile,
    ceiling: AffordabilityCeiling,
    reference_size: ReferenceSize,
    filters: FilterConfiguration,
    city: City,
    generation: u64,
    regions: Option<Arc<RegionDataset>>,
    travel: Option<Arc<TravelDirectory>>,
    region_failure: Option<String>,
    travel_failure: Option<String>,
    assessments: BTreeMap<PostalCode, RegionAssessment>,
    selection: Option<PostalCode>,
}

impl ClassificationSession {
    pub fn new(city: City) -> Self {
        let profile = FinancialProfile::default();
        Self {
            profile,
            ceiling: purchasing_power::compute(&profile),
            reference_size: ReferenceSize::default(),
            filters: FilterConfiguration::default(),
            city,
            generation: 0,
            regions: None,
            travel: None,
            region_failure: None,
            travel_failure: None,
            assessments: BTreeMap::new(),
            selection: None,
        }
    }

    pub fn profile(&self) -> FinancialProfile {
        self.profile
    }

    pub fn ceiling(&self) -> AffordabilityCeiling {
        self.ceiling
    }

    pub fn reference_size(&self) -> ReferenceSize {
        self.reference_size
    }

    pub fn filters(&self) -> &FilterConfiguration {
        &self.filters
    }

    pub fn active_city(&self) -> City {
        self.city
    }

    pub fn readiness(&self) -> Readiness {
        if self.regions.is_some() && self.travel.is_some() {
            return Readiness::Ready;
        }

        match self.region_failure.as_ref().or(self.travel_failure.as_ref()) {
            Some(reason) => Readiness::Unavailable {
                reason: reason.clone(),
            },
            None => Readiness::Uninitialized,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.readiness() == Readiness::Ready
    }

    pub fn has_travel_directory(&self) -> bool {
        self.travel.is_some()
    }

    pub fn set_financial_profile(&mut self, update: FinancialProfileUpdate) {
        self.profile = update.apply_to(self.profile);
        self.recompute();
    }

    pub fn set_reference_size(&mut self, size: ReferenceSize) {
        self.reference_size = size;
        self.recompute();
    }

    /// Replace the rule for `kind`; `None` removes the constraint.
    pub fn set_filter_rule(&mut self, kind: AmenityKind, rule: Option<FilterRule>) {
        self.filters.set(kind, rule);
        self.recompute();
    }

    /// Switch the active city and return the ticket its region load must present.
    ///
    /// Re-selecting the current city keeps the loaded dataset; the returned ticket
    /// then allows a reload of the same city.
    pub fn set_active_city(&mut self, city: City) -> LoadTicket {
        if city != self.city {
            info!(from = %self.city, to = %city, "switching active city");
            self.city = city;
            self.generation += 1;
            self.regions = None;
            self.region_failure = None;
        }
        self.recompute();
        self.region_load_ticket()
    }

    pub fn region_load_ticket(&self) -> LoadTicket {
        LoadTicket {
            city: self.city,
            generation: self.generation,
        }
    }

    /// Apply the result of a region load started with `ticket`.
    pub fn apply_regions(
        &mut self,
        ticket: LoadTicket,
        result: Result<Arc<RegionDataset>, DatasetError>,
    ) -> LoadOutcome {
        if ticket != self.region_load_ticket() {
            debug!(city = %ticket.city, "discarding region load for inactive city");
            return LoadOutcome::Stale;
        }

        let dataset = match result {
            Ok(dataset) if dataset.city() == ticket.city => dataset,
            Ok(dataset) => {
                debug!(
                    expected = %ticket.city,
                    received = %dataset.city(),
                    "discarding region dataset for another city"
                );
                return LoadOutcome::Stale;
            }
            Err(err) => {
                warn!(city = %ticket.city, error = %err, "region dataset unavailable");
                self.region_failure = Some(err.to_string());
                return LoadOutcome::Unavailable;
            }
        };

        info!(city = %ticket.city, regions = dataset.len(), "region dataset loaded");
        if let Some(selected) = &self.selection {
            if !dataset.contains(selected) {
                debug!(postal_code = %selected, "clearing selection missing from new dataset");
                self.selection = None;
            }
        }
        self.regions = Some(dataset);
        self.region_failure = None;
        self.recompute();
        LoadOutcome::Applied
    }

    /// Apply the result of the city-independent travel directory load.
    pub fn apply_travel_directory(
        &mut self,
        result: Result<Arc<TravelDirectory>, DatasetError>,
    ) -> LoadOutcome {
        match result {
            Ok(directory) => {
                info!(records = directory.len(), "travel directory loaded");
                self.travel = Some(directory);
                self.travel_failure = None;
                self.recompute();
                LoadOutcome::Applied
            }
            Err(err) => {
                warn!(error = %err, "travel directory unavailable");
                self.travel_failure = Some(err.to_string());
                LoadOutcome::Unavailable
            }
        }
    }

    pub fn classification(&self, postal_code: &PostalCode) -> Result<Classification, SessionError> {
        self.assessment(postal_code)
            .map(|assessment| assessment.classification)
    }

    pub fn assessment(&self, postal_code: &PostalCode) -> Result<RegionAssessment, SessionError> {
        self.ensure_ready()?;
        self.assessments
            .get(postal_code)
            .copied()
            .ok_or_else(|| self.unknown_region(postal_code))
    }

    /// Category per postal code for the render surface.
    pub fn classifications(&self) -> Result<BTreeMap<PostalCode, Classification>, SessionError> {
        self.ensure_ready()?;
        Ok(self
            .assessments
            .iter()
            .map(|(postal_code, assessment)| (postal_code.clone(), assessment.classification))
            .collect())
    }

    pub fn assessments(&self) -> Result<&BTreeMap<PostalCode, RegionAssessment>, SessionError> {
        self.ensure_ready()?;
        Ok(&self.assessments)
    }

    /// Toggle the selection. Selecting the selected region, or passing `None`, clears it.
    pub fn select_region(
        &mut self,
        postal_code: Option<&PostalCode>,
    ) -> Result<Option<SelectionDetail>, SessionError> {
        self.ensure_ready()?;

        let Some(postal_code) = postal_code else {
            self.selection = None;
            return Ok(None);
        };

        if !self.assessments.contains_key(postal_code) {
            return Err(self.unknown_region(postal_code));
        }

        if self.selection.as_ref() == Some(postal_code) {
            self.selection = None;
        } else {
            self.selection = Some(postal_code.clone());
        }
        self.selection()
    }

    pub fn selection(&self) -> Result<Option<SelectionDetail>, SessionError> {
        self.ensure_ready()?;
        let (Some(regions), Some(travel)) = (&self.regions, &self.travel) else {
            return Ok(None);
        };

        let detail = self.selection.as_ref().and_then(|postal_code| {
            let region = regions.get(postal_code)?;
            let assessment = self.assessments.get(postal_code).copied()?;
            let record = travel.get(postal_code);
            Some(SelectionDetail {
                region: region.clone(),
                travel: record.cloned(),
                assessment,
                proximity_failures: proximity::explain(record, &self.filters),
            })
        });
        Ok(detail)
    }

    pub fn selected_postal_code(&self) -> Option<&PostalCode> {
        self.selection.as_ref()
    }

    pub fn summary(&self) -> Result<ClassificationSummary, SessionError> {
        self.ensure_ready()?;
        Ok(self.build_summary())
    }

    pub fn regions(&self) -> Result<&RegionDataset, SessionError> {
        self.ensure_ready()?;
        self.regions.as_deref().ok_or_else(|| self.not_ready())
    }

    fn build_summary(&self) -> ClassificationSummary {
        let mut counts: BTreeMap<Classification, usize> = Classification::ordered()
            .into_iter()
            .map(|classification| (classification, 0))
            .collect();
        let mut filtered = 0;
        for assessment in self.assessments.values() {
            *counts.entry(assessment.classification).or_default() += 1;
            if assessment.filtered {
                filtered += 1;
            }
        }

        ClassificationSummary {
            city: self.city,
            ceiling: self.ceiling,
            reference_size: self.reference_size,
            total: self.assessments.len(),
            filtered,
            counts,
        }
    }

    fn recompute(&mut self) {
        self.ceiling = purchasing_power::compute(&self.profile);

        let (Some(regions), Some(travel)) = (&self.regions, &self.travel) else {
            self.assessments.clear();
            return;
        };

        let ceiling = self.ceiling;
        let size = self.reference_size;
        let filters = &self.filters;
        self.assessments = regions
            .regions()
            .iter()
            .map(|region| {
                let filtered = proximity::evaluate(travel.get(&region.postal_code), filters);
                let price = region.price_for(size);
                let assessment = RegionAssessment {
                    classification: classify(ceiling, price, filtered),
                    filtered,
                    price,
                };
                (region.postal_code.clone(), assessment)
            })
            .collect();

        let summary = self.build_summary();
        debug!(
            city = %summary.city,
            ceiling = %summary.ceiling,
            reference_size = %summary.reference_size,
            regions = summary.total,
            filtered = summary.filtered,
            counts = ?summary.counts,
            "classifications recomputed"
        );
    }

    fn ensure_ready(&self) -> Result<(), SessionError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(self.not_ready())
        }
    }

    fn not_ready(&self) -> SessionError {
        SessionError::NotReady {
            city: self.city,
            readiness: self.readiness(),
        }
    }

    fn unknown_region(&self, postal_code: &PostalCode) -> SessionError {
        SessionError::UnknownRegion {
            city: self.city,
            postal_code: postal_code.clone(),
        }
    }
}
