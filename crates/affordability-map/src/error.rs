use crate::affordability::{
    ReferenceSizeError, ReportError, SessionError, UnknownAmenity, UnknownCity,
    UnknownTravelMode,
};
use crate::config::ConfigError;
use crate::dataset::DatasetError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Dataset(DatasetError),
    Session(SessionError),
    Report(ReportError),
    InvalidInput(String),
    StatePoisoned,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Dataset(err) => write!(f, "dataset error: {}", err),
            AppError::Session(err) => write!(f, "{}", err),
            AppError::Report(err) => write!(f, "report error: {}", err),
            AppError::InvalidInput(message) => write!(f, "invalid input: {}", message),
            AppError::StatePoisoned => write!(f, "session state is unavailable"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Dataset(err) => Some(err),
            AppError::Session(err) => Some(err),
            AppError::Report(err) => Some(err),
            AppError::InvalidInput(_) | AppError::StatePoisoned => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            AppError::Session(SessionError::NotReady { city, readiness }) => json!({
                "error": self.to_string(),
                "city": city,
                "readiness": readiness,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        let status = match self {
            AppError::Session(SessionError::NotReady { .. }) | AppError::Dataset(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Session(SessionError::UnknownRegion { .. }) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Report(_)
            | AppError::StatePoisoned => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<DatasetError> for AppError {
    fn from(value: DatasetError) -> Self {
        Self::Dataset(value)
    }
}

impl From<SessionError> for AppError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

impl From<ReportError> for AppError {
    fn from(value: ReportError) -> Self {
        Self::Report(value)
    }
}

impl From<ReferenceSizeError> for AppError {
    fn from(value: ReferenceSizeError) -> Self {
        Self::InvalidInput(value.to_string())
    }
}

impl From<UnknownCity> for AppError {
    fn from(value: UnknownCity) -> Self {
        Self::InvalidInput(value.to_string())
    }
}

impl From<UnknownAmenity> for AppError {
    fn from(value: UnknownAmenity) -> Self {
        Self::InvalidInput(value.to_string())
    }
}

impl From<UnknownTravelMode> for AppError {
    fn from(value: UnknownTravelMode) -> Self {
        Self::InvalidInput(value.to_string())
    }
}
