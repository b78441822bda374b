use affordability_map::affordability::{
    AmenityKind, City, ClassificationSession, FilterRule, LoadOutcome, LoadTicket, TravelMode,
};
use affordability_map::dataset::{DatasetCache, DatasetError, DatasetKey, DatasetSource};
use affordability_map::error::AppError;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinError;
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Shared classification session plus the cache its datasets come from.
#[derive(Clone)]
pub(crate) struct SessionState {
    session: Arc<Mutex<ClassificationSession>>,
    datasets: Arc<DatasetCache>,
}

impl SessionState {
    pub(crate) fn new(city: City, source: Arc<dyn DatasetSource>) -> Self {
        Self {
            session: Arc::new(Mutex::new(ClassificationSession::new(city))),
            datasets: Arc::new(DatasetCache::new(source)),
        }
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, ClassificationSession>, AppError> {
        self.session.lock().map_err(|_| AppError::StatePoisoned)
    }

    /// Fetch the travel directory off the async runtime and hand it to the session.
    pub(crate) async fn load_travel_directory(&self) -> Result<LoadOutcome, AppError> {
        let datasets = Arc::clone(&self.datasets);
        let result = tokio::task::spawn_blocking(move || datasets.travel_directory())
            .await
            .unwrap_or_else(|err| Err(join_failure(DatasetKey::TravelDirectory, err)));

        let mut session = self.lock()?;
        Ok(session.apply_travel_directory(result))
    }

    /// Fetch regions for the ticket's city; the session discards the result if the
    /// active city changed in the meantime.
    pub(crate) async fn load_regions(&self, ticket: LoadTicket) -> Result<LoadOutcome, AppError> {
        let datasets = Arc::clone(&self.datasets);
        let city = ticket.city;
        let result = tokio::task::spawn_blocking(move || datasets.regions(city))
            .await
            .unwrap_or_else(|err| Err(join_failure(DatasetKey::Regions(city), err)));

        let mut session = self.lock()?;
        let outcome = session.apply_regions(ticket, result);
        debug!(%city, ?outcome, "region load finished");
        Ok(outcome)
    }
}

fn join_failure(key: DatasetKey, err: JoinError) -> DatasetError {
    DatasetError::Unavailable {
        key,
        reason: err.to_string(),
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Parse `kind:mode[:max_km[:max_minutes]]`, e.g. `shopping_mall:walking:2` or
/// `liquor_store:driving::15`. Empty limits are unbounded.
pub(crate) fn parse_filter(raw: &str) -> Result<(AmenityKind, FilterRule), String> {
    let mut parts = raw.trim().split(':');
    let kind = parts
        .next()
        .filter(|part| !part.is_empty())
        .ok_or_else(|| format!("filter '{raw}' is missing an amenity"))?
        .parse::<AmenityKind>()
        .map_err(|err| err.to_string())?;
    let mode = parts
        .next()
        .filter(|part| !part.is_empty())
        .ok_or_else(|| format!("filter '{raw}' is missing a travel mode"))?
        .parse::<TravelMode>()
        .map_err(|err| err.to_string())?;
    let max_distance_km = parse_limit(raw, parts.next())?;
    let max_minutes = parse_limit(raw, parts.next())?;

    if parts.next().is_some() {
        return Err(format!(
            "filter '{raw}' has too many segments (expected kind:mode[:km[:minutes]])"
        ));
    }

    Ok((kind, FilterRule::within(mode, max_distance_km, max_minutes)))
}

fn parse_limit(raw: &str, part: Option<&str>) -> Result<Option<f64>, String> {
    match part.map(str::trim).filter(|part| !part.is_empty()) {
        None => Ok(None),
        Some(value) => match value.parse::<f64>() {
            Ok(limit) if limit.is_finite() && limit >= 0.0 => Ok(Some(limit)),
            _ => Err(format!(
                "filter '{raw}' has an invalid limit '{value}' (expected a non-negative number)"
            )),
        },
    }
}
