use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Identifier of a region, unique within one city dataset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostalCode(pub String);

impl PostalCode {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostalCode {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Cities with a published region dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum City {
    Oslo,
    Bergen,
    Trondheim,
    Stavanger,
    Kristiansand,
    Drammen,
    Tromso,
    Bodo,
}

impl City {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::Oslo,
            Self::Bergen,
            Self::Trondheim,
            Self::Stavanger,
            Self::Kristiansand,
            Self::Drammen,
            Self::Tromso,
            Self::Bodo,
        ]
    }

    /// Key used for dataset file names and URLs.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Oslo => "oslo",
            Self::Bergen => "bergen",
            Self::Trondheim => "trondheim",
            Self::Stavanger => "stavanger",
            Self::Kristiansand => "kristiansand",
            Self::Drammen => "drammen",
            Self::Tromso => "tromso",
            Self::Bodo => "bodo",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Oslo => "Oslo",
            Self::Bergen => "Bergen",
            Self::Trondheim => "Trondheim",
            Self::Stavanger => "Stavanger",
            Self::Kristiansand => "Kristiansand",
            Self::Drammen => "Drammen",
            Self::Tromso => "Tromsø",
            Self::Bodo => "Bodø",
        }
    }

    /// Initial map centre for the render surface.
    pub const fn centre(self) -> MapCentre {
        let (lat, lng) = match self {
            Self::Oslo => (59.9139, 10.7522),
            Self::Bergen => (60.3913, 5.3221),
            Self::Trondheim => (63.4305, 10.3951),
            Self::Stavanger => (58.9700, 5.7331),
            Self::Kristiansand => (58.1599, 8.0182),
            Self::Drammen => (59.7441, 10.2045),
            Self::Tromso => (69.6492, 18.9553),
            Self::Bodo => (67.2804, 14.4049),
        };
        MapCentre { lat, lng }
    }
}

impl Default for City {
    fn default() -> Self {
        Self::Oslo
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for City {
    type Err = UnknownCity;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "oslo" => Ok(Self::Oslo),
            "bergen" => Ok(Self::Bergen),
            "trondheim" => Ok(Self::Trondheim),
            "stavanger" => Ok(Self::Stavanger),
            "kristiansand" => Ok(Self::Kristiansand),
            "drammen" => Ok(Self::Drammen),
            "tromso" | "tromsø" => Ok(Self::Tromso),
            "bodo" | "bodø" => Ok(Self::Bodo),
            _ => Err(UnknownCity(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown city '{0}'")]
pub struct UnknownCity(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapCentre {
    pub lat: f64,
    pub lng: f64,
}

/// Buyer-supplied financial inputs. Amounts are whole currency units and are
/// expected to be non-negative, though nothing enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinancialProfile {
    pub equity: f64,
    pub annual_income: f64,
    pub existing_debt: f64,
    pub extra_loan: f64,
}

impl Default for FinancialProfile {
    fn default() -> Self {
        Self {
            equity: 0.0,
            annual_income: 400_000.0,
            existing_debt: 0.0,
            extra_loan: 0.0,
        }
    }
}

/// Partial edit of a [`FinancialProfile`]; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialProfileUpdate {
    #[serde(default)]
    pub equity: Option<f64>,
    #[serde(default)]
    pub annual_income: Option<f64>,
    #[serde(default)]
    pub existing_debt: Option<f64>,
    #[serde(default)]
    pub extra_loan: Option<f64>,
}

impl FinancialProfileUpdate {
    pub fn apply_to(&self, profile: FinancialProfile) -> FinancialProfile {
        FinancialProfile {
            equity: self.equity.unwrap_or(profile.equity),
            annual_income: self.annual_income.unwrap_or(profile.annual_income),
            existing_debt: self.existing_debt.unwrap_or(profile.existing_debt),
            extra_loan: self.extra_loan.unwrap_or(profile.extra_loan),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.equity.is_none()
            && self.annual_income.is_none()
            && self.existing_debt.is_none()
            && self.extra_loan.is_none()
    }
}

/// Dwelling size in square meters used to pick a region's per-size price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct ReferenceSize(u16);

impl ReferenceSize {
    pub const MIN: u16 = 20;
    pub const MAX: u16 = 200;
    pub const STEP: u16 = 10;

    pub fn new(square_meters: u16) -> Result<Self, ReferenceSizeError> {
        if !(Self::MIN..=Self::MAX).contains(&square_meters) {
            return Err(ReferenceSizeError::OutOfRange {
                value: square_meters,
            });
        }
        if square_meters % Self::STEP != 0 {
            return Err(ReferenceSizeError::OffStep {
                value: square_meters,
            });
        }
        Ok(Self(square_meters))
    }

    pub const fn square_meters(self) -> u16 {
        self.0
    }
}

impl Default for ReferenceSize {
    fn default() -> Self {
        Self(60)
    }
}

impl TryFrom<u16> for ReferenceSize {
    type Error = ReferenceSizeError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReferenceSize> for u16 {
    fn from(value: ReferenceSize) -> Self {
        value.0
    }
}

impl fmt::Display for ReferenceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} m²", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceSizeError {
    #[error(
        "reference size {value} m² is outside {}..={} m²",
        ReferenceSize::MIN,
        ReferenceSize::MAX
    )]
    OutOfRange { value: u16 },
    #[error("reference size {value} m² is not a multiple of {}", ReferenceSize::STEP)]
    OffStep { value: u16 },
}

/// Market statistics shown in the region detail panel. Not used for classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionStatistics {
    pub average_price: Option<f64>,
    pub price_change_last_year: Option<f64>,
    pub price_change_last_quarter: Option<f64>,
    pub average_sales_time_days: Option<f64>,
    pub estates_sold_last_quarter: Option<u32>,
    pub estates_sold_last_month: Option<u32>,
    pub last_updated: Option<NaiveDate>,
}

/// One postal-code polygon with its price statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub postal_code: PostalCode,
    pub place_name: Option<String>,
    /// Average dwelling price keyed by size in square meters.
    pub average_price_per_size: BTreeMap<u16, f64>,
    pub average_square_meter_price: Option<f64>,
    #[serde(default)]
    pub statistics: RegionStatistics,
    /// Polygon geometry, carried through untouched for the render surface.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub geometry: serde_json::Value,
}

impl Region {
    pub fn new(postal_code: impl Into<String>) -> Self {
        Self {
            postal_code: PostalCode::new(postal_code),
            place_name: None,
            average_price_per_size: BTreeMap::new(),
            average_square_meter_price: None,
            statistics: RegionStatistics::default(),
            geometry: serde_json::Value::Null,
        }
    }

    pub fn with_price(mut self, square_meters: u16, price: f64) -> Self {
        self.average_price_per_size.insert(square_meters, price);
        self
    }

    pub fn price_for(&self, size: ReferenceSize) -> Option<f64> {
        self.average_price_per_size
            .get(&size.square_meters())
            .copied()
    }
}

/// All regions of one city, indexed by postal code.
#[derive(Debug, Clone)]
pub struct RegionDataset {
    city: City,
    regions: Vec<Region>,
    index: HashMap<PostalCode, usize>,
}

impl RegionDataset {
    pub fn new(city: City, regions: Vec<Region>) -> Result<Self, DuplicatePostalCode> {
        let mut index = HashMap::with_capacity(regions.len());
        for (position, region) in regions.iter().enumerate() {
            if index.insert(region.postal_code.clone(), position).is_some() {
                return Err(DuplicatePostalCode {
                    city,
                    postal_code: region.postal_code.clone(),
                });
            }
        }

        Ok(Self {
            city,
            regions,
            index,
        })
    }

    pub fn city(&self) -> City {
        self.city
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn get(&self, postal_code: &PostalCode) -> Option<&Region> {
        self.index
            .get(postal_code)
            .and_then(|position| self.regions.get(*position))
    }

    pub fn contains(&self, postal_code: &PostalCode) -> bool {
        self.index.contains_key(postal_code)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("postal code {postal_code} appears more than once in the {city} dataset")]
pub struct DuplicatePostalCode {
    pub city: City,
    pub postal_code: PostalCode,
}

/// Point-of-interest categories with precomputed travel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmenityKind {
    ShoppingMall,
    #[serde(alias = "vinmonopolet")]
    LiquorStore,
}

impl AmenityKind {
    pub const fn slug(self) -> &'static str {
        match self {
            Self::ShoppingMall => "shopping_mall",
            Self::LiquorStore => "liquor_store",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ShoppingMall => "Shopping mall",
            Self::LiquorStore => "Liquor store",
        }
    }
}

impl fmt::Display for AmenityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for AmenityKind {
    type Err = UnknownAmenity;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "shopping_mall" => Ok(Self::ShoppingMall),
            "liquor_store" | "vinmonopolet" => Ok(Self::LiquorStore),
            _ => Err(UnknownAmenity(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown amenity '{0}'")]
pub struct UnknownAmenity(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Walking,
    Driving,
}

impl TravelMode {
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Walking => "walking",
            Self::Driving => "driving",
        }
    }

    pub(crate) fn from_slug(value: &str) -> Option<Self> {
        match value {
            "walking" => Some(Self::Walking),
            "driving" => Some(Self::Driving),
            _ => None,
        }
    }
}

impl Default for TravelMode {
    fn default() -> Self {
        Self::Walking
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for TravelMode {
    type Err = UnknownTravelMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_slug(value.trim().to_ascii_lowercase().as_str())
            .ok_or_else(|| UnknownTravelMode(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown travel mode '{0}'")]
pub struct UnknownTravelMode(pub String);

/// Distance and duration to the nearest instance of an amenity for one travel mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TravelLeg {
    pub distance_km: f64,
    pub duration_minutes: f64,
}

/// Nearest destination of one amenity kind, with a leg per available travel mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmenityDestination {
    pub name: String,
    pub address: Option<String>,
    pub legs: BTreeMap<TravelMode, TravelLeg>,
}

impl AmenityDestination {
    pub fn leg(&self, mode: TravelMode) -> Option<&TravelLeg> {
        self.legs.get(&mode)
    }
}

/// Amenity travel detail for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmenityTravelRecord {
    pub postal_code: PostalCode,
    pub amenities: BTreeMap<AmenityKind, AmenityDestination>,
}

impl AmenityTravelRecord {
    pub fn new(postal_code: impl Into<String>) -> Self {
        Self {
            postal_code: PostalCode::new(postal_code),
            amenities: BTreeMap::new(),
        }
    }

    pub fn destination(&self, kind: AmenityKind) -> Option<&AmenityDestination> {
        self.amenities.get(&kind)
    }

    pub fn leg(&self, kind: AmenityKind, mode: TravelMode) -> Option<&TravelLeg> {
        self.destination(kind).and_then(|destination| destination.leg(mode))
    }

    pub fn is_empty(&self) -> bool {
        self.amenities.is_empty()
    }
}

/// City-independent travel records keyed by postal code.
#[derive(Debug, Clone, Default)]
pub struct TravelDirectory {
    records: HashMap<PostalCode, AmenityTravelRecord>,
}

impl TravelDirectory {
    /// The first record for a postal code wins; later duplicates are logged and dropped.
    pub fn from_records(records: impl IntoIterator<Item = AmenityTravelRecord>) -> Self {
        let mut by_code = HashMap::new();
        for record in records {
            match by_code.entry(record.postal_code.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(_) => {
                    warn!(postal_code = %record.postal_code, "duplicate travel record dropped");
                }
            }
        }
        Self { records: by_code }
    }

    pub fn get(&self, postal_code: &PostalCode) -> Option<&AmenityTravelRecord> {
        self.records.get(postal_code)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Proximity constraint for one amenity kind. `None` limits are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    pub active: bool,
    #[serde(default)]
    pub mode: TravelMode,
    #[serde(default)]
    pub max_distance_km: Option<f64>,
    #[serde(default)]
    pub max_minutes: Option<f64>,
}

impl FilterRule {
    pub fn within(mode: TravelMode, max_distance_km: Option<f64>, max_minutes: Option<f64>) -> Self {
        Self {
            active: true,
            mode,
            max_distance_km,
            max_minutes,
        }
    }
}

impl Default for FilterRule {
    fn default() -> Self {
        Self {
            active: false,
            mode: TravelMode::Walking,
            max_distance_km: None,
            max_minutes: None,
        }
    }
}

/// Filter rules keyed by amenity kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterConfiguration(BTreeMap<AmenityKind, FilterRule>);

impl FilterConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, kind: AmenityKind, rule: FilterRule) -> Self {
        self.0.insert(kind, rule);
        self
    }

    /// Replace or clear the rule for `kind`.
    pub fn set(&mut self, kind: AmenityKind, rule: Option<FilterRule>) {
        match rule {
            Some(rule) => {
                self.0.insert(kind, rule);
            }
            None => {
                self.0.remove(&kind);
            }
        }
    }

    pub fn active_rules(&self) -> impl Iterator<Item = (AmenityKind, &FilterRule)> {
        self.0
            .iter()
            .filter(|(_, rule)| rule.active)
            .map(|(kind, rule)| (*kind, rule))
    }

    pub fn has_active_rules(&self) -> bool {
        self.active_rules().next().is_some()
    }
}
