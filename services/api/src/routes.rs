use crate::infra::{AppState, SessionState};
use affordability_map::affordability::{
    AffordabilityCeiling, AmenityKind, City, ClassificationReport, ClassificationSession,
    ClassificationSummary, FilterConfiguration, FilterRule, FinancialProfile,
    FinancialProfileUpdate, MapCentre, PostalCode, Readiness, ReferenceSize, RegionAssessment,
    SelectionDetail, TravelMode,
};
use affordability_map::error::AppError;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub(crate) struct SessionView {
    pub(crate) city: City,
    pub(crate) readiness: Readiness,
    pub(crate) profile: FinancialProfile,
    pub(crate) ceiling: AffordabilityCeiling,
    pub(crate) reference_size: ReferenceSize,
    pub(crate) filters: FilterConfiguration,
    pub(crate) selected_postal_code: Option<PostalCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) summary: Option<ClassificationSummary>,
}

impl SessionView {
    fn from_session(session: &ClassificationSession) -> Self {
        Self {
            city: session.active_city(),
            readiness: session.readiness(),
            profile: session.profile(),
            ceiling: session.ceiling(),
            reference_size: session.reference_size(),
            filters: session.filters().clone(),
            selected_postal_code: session.selected_postal_code().cloned(),
            summary: session.summary().ok(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CityView {
    pub(crate) city: City,
    pub(crate) label: &'static str,
    pub(crate) centre: MapCentre,
    pub(crate) active: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassificationsView {
    pub(crate) city: City,
    pub(crate) ceiling: AffordabilityCeiling,
    pub(crate) reference_size: ReferenceSize,
    pub(crate) regions: BTreeMap<PostalCode, RegionAssessment>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegionClassificationView {
    pub(crate) postal_code: PostalCode,
    #[serde(flatten)]
    pub(crate) assessment: RegionAssessment,
}

#[derive(Debug, Serialize)]
pub(crate) struct SelectionView {
    pub(crate) selection: Option<SelectionDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReferenceSizeRequest {
    pub(crate) square_meters: u16,
}

/// Rule body for `PUT /api/v1/session/filters/:amenity`. `active` defaults to on; a rule
/// sent with `active: false` keeps its limits but constrains nothing.
#[derive(Debug, Deserialize)]
pub(crate) struct FilterRuleRequest {
    #[serde(default = "default_rule_active")]
    pub(crate) active: bool,
    #[serde(default)]
    pub(crate) mode: TravelMode,
    #[serde(default)]
    pub(crate) max_distance_km: Option<f64>,
    #[serde(default)]
    pub(crate) max_minutes: Option<f64>,
}

fn default_rule_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(crate) struct CityRequest {
    pub(crate) city: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SelectionRequest {
    #[serde(default)]
    pub(crate) postal_code: Option<PostalCode>,
}

/// Session, classification, selection and report endpoints.
pub(crate) fn session_router(state: SessionState) -> Router {
    Router::new()
        .route("/api/v1/cities", get(cities_endpoint))
        .route("/api/v1/session", get(session_endpoint))
        .route("/api/v1/session/profile", put(profile_endpoint))
        .route("/api/v1/session/reference-size", put(reference_size_endpoint))
        .route(
            "/api/v1/session/filters/:amenity",
            put(set_filter_endpoint).delete(clear_filter_endpoint),
        )
        .route("/api/v1/session/city", put(city_endpoint))
        .route("/api/v1/classifications", get(classifications_endpoint))
        .route(
            "/api/v1/classifications/:postal_code",
            get(region_classification_endpoint),
        )
        .route(
            "/api/v1/selection",
            post(select_endpoint).get(selection_endpoint),
        )
        .route("/api/v1/report", get(report_endpoint))
        .route("/api/v1/report.csv", get(report_csv_endpoint))
        .with_state(state)
}

pub(crate) fn with_session_routes(state: SessionState) -> Router {
    session_router(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn cities_endpoint(
    State(state): State<SessionState>,
) -> Result<Json<Vec<CityView>>, AppError> {
    let active = state.lock()?.active_city();
    let cities = City::ordered()
        .into_iter()
        .map(|city| CityView {
            city,
            label: city.label(),
            centre: city.centre(),
            active: city == active,
        })
        .collect();
    Ok(Json(cities))
}

pub(crate) async fn session_endpoint(
    State(state): State<SessionState>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.lock()?;
    Ok(Json(SessionView::from_session(&session)))
}

pub(crate) async fn profile_endpoint(
    State(state): State<SessionState>,
    Json(update): Json<FinancialProfileUpdate>,
) -> Result<Json<SessionView>, AppError> {
    if update.is_empty() {
        return Err(AppError::InvalidInput(
            "profile update must set at least one field".to_string(),
        ));
    }
    let fields = [
        update.equity,
        update.annual_income,
        update.existing_debt,
        update.extra_loan,
    ];
    if fields.iter().flatten().any(|value| !value.is_finite()) {
        return Err(AppError::InvalidInput(
            "profile amounts must be finite numbers".to_string(),
        ));
    }

    let mut session = state.lock()?;
    session.set_financial_profile(update);
    Ok(Json(SessionView::from_session(&session)))
}

pub(crate) async fn reference_size_endpoint(
    State(state): State<SessionState>,
    Json(request): Json<ReferenceSizeRequest>,
) -> Result<Json<SessionView>, AppError> {
    let size = ReferenceSize::new(request.square_meters)?;
    let mut session = state.lock()?;
    session.set_reference_size(size);
    Ok(Json(SessionView::from_session(&session)))
}

pub(crate) async fn set_filter_endpoint(
    State(state): State<SessionState>,
    Path(amenity): Path<String>,
    Json(request): Json<FilterRuleRequest>,
) -> Result<Json<SessionView>, AppError> {
    let kind = amenity.parse::<AmenityKind>()?;
    let limits = [request.max_distance_km, request.max_minutes];
    if limits
        .iter()
        .flatten()
        .any(|limit| !limit.is_finite() || *limit < 0.0)
    {
        return Err(AppError::InvalidInput(
            "filter limits must be non-negative numbers".to_string(),
        ));
    }

    let rule = FilterRule {
        active: request.active,
        ..FilterRule::within(request.mode, request.max_distance_km, request.max_minutes)
    };
    let mut session = state.lock()?;
    session.set_filter_rule(kind, Some(rule));
    Ok(Json(SessionView::from_session(&session)))
}

pub(crate) async fn clear_filter_endpoint(
    State(state): State<SessionState>,
    Path(amenity): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let kind = amenity.parse::<AmenityKind>()?;
    let mut session = state.lock()?;
    session.set_filter_rule(kind, None);
    Ok(Json(SessionView::from_session(&session)))
}

/// Switch city and load its regions in the background; the response reflects the
/// session immediately after the switch.
pub(crate) async fn city_endpoint(
    State(state): State<SessionState>,
    Json(request): Json<CityRequest>,
) -> Result<impl IntoResponse, AppError> {
    let city = request.city.parse::<City>()?;
    let (ticket, needs_travel, view) = {
        let mut session = state.lock()?;
        let ticket = session.set_active_city(city);
        let needs_travel = !session.has_travel_directory();
        (ticket, needs_travel, SessionView::from_session(&session))
    };

    info!(%city, needs_travel, "loading datasets for active city");
    let loader = state.clone();
    tokio::spawn(async move {
        if needs_travel {
            if let Err(err) = loader.load_travel_directory().await {
                warn!(error = %err, "travel directory could not be applied");
            }
        }
        if let Err(err) = loader.load_regions(ticket).await {
            warn!(%city, error = %err, "region load could not be applied");
        }
    });

    Ok((StatusCode::ACCEPTED, Json(view)))
}

pub(crate) async fn classifications_endpoint(
    State(state): State<SessionState>,
) -> Result<Json<ClassificationsView>, AppError> {
    let session = state.lock()?;
    let regions = session.assessments()?.clone();
    Ok(Json(ClassificationsView {
        city: session.active_city(),
        ceiling: session.ceiling(),
        reference_size: session.reference_size(),
        regions,
    }))
}

pub(crate) async fn region_classification_endpoint(
    State(state): State<SessionState>,
    Path(postal_code): Path<String>,
) -> Result<Json<RegionClassificationView>, AppError> {
    let postal_code = PostalCode::new(postal_code.trim());
    let session = state.lock()?;
    let assessment = session.assessment(&postal_code)?;
    Ok(Json(RegionClassificationView {
        postal_code,
        assessment,
    }))
}

pub(crate) async fn select_endpoint(
    State(state): State<SessionState>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<SelectionView>, AppError> {
    let mut session = state.lock()?;
    let selection = session.select_region(request.postal_code.as_ref())?;
    Ok(Json(SelectionView { selection }))
}

pub(crate) async fn selection_endpoint(
    State(state): State<SessionState>,
) -> Result<Json<SelectionView>, AppError> {
    let session = state.lock()?;
    let selection = session.selection()?;
    Ok(Json(SelectionView { selection }))
}

pub(crate) async fn report_endpoint(
    State(state): State<SessionState>,
) -> Result<Json<ClassificationReport>, AppError> {
    let session = state.lock()?;
    let report = ClassificationReport::from_session(&session, Local::now().date_naive())?;
    Ok(Json(report))
}

pub(crate) async fn report_csv_endpoint(
    State(state): State<SessionState>,
) -> Result<impl IntoResponse, AppError> {
    let report = {
        let session = state.lock()?;
        ClassificationReport::from_session(&session, Local::now().date_naive())?
    };

    let mut body = Vec::new();
    report.write_csv(&mut body)?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        body,
    ))
}
