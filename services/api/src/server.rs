use crate::cli::ServeArgs;
use crate::infra::{AppState, SessionState};
use crate::routes::with_session_routes;
use affordability_map::config::AppConfig;
use affordability_map::dataset::FileDatasetSource;
use affordability_map::error::AppError;
use affordability_map::telemetry::{self, LogOutput};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(data_dir) = args.data_dir.take() {
        config.datasets.data_dir = data_dir;
    }
    if let Some(city) = args.city.take() {
        config.datasets.default_city = city;
    }

    telemetry::init(&config.telemetry, LogOutput::Stdout)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let source = Arc::new(FileDatasetSource::new(config.datasets.data_dir.clone()));
    let session_state = SessionState::new(config.datasets.default_city, source);

    // Load failures leave the session unavailable; the next city switch retries them.
    let travel = session_state.load_travel_directory().await?;
    let ticket = session_state.lock()?.region_load_ticket();
    let regions = session_state.load_regions(ticket).await?;
    if session_state.lock()?.is_ready() {
        info!(city = %ticket.city, "initial datasets loaded");
    } else {
        warn!(city = %ticket.city, ?travel, ?regions, "initial datasets unavailable");
    }

    let app = with_session_routes(session_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        data_dir = %config.datasets.data_dir.display(),
        "affordability map service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
