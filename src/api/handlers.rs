//! HTTP API handlers.

use std::any::Any;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::congestion::CongestionClassifier;
use crate::config::Config;
use crate::ledger::TrafficLedger;
use crate::metrics::RequestTimer;
use crate::service::{HistoryReport, HistoryService, StatusReport, StatusService};
use crate::snapshot::SnapshotReader;

use super::error::{ApiError, INTERNAL_SERVER_ERROR, RESOURCE_NOT_FOUND};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Status derivation.
    pub status: Arc<StatusService>,
    /// History queries.
    pub history: Arc<HistoryService>,
    /// Prometheus renderer, when a recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire services from configuration and a ledger.
    pub fn new(config: &Config, ledger: Arc<dyn TrafficLedger>) -> Self {
        let status = StatusService::new(
            ledger.clone(),
            SnapshotReader::new(&config.predictions_file_path),
            CongestionClassifier::from_config(config),
        );

        Self {
            status: Arc::new(status),
            history: Arc::new(HistoryService::new(ledger)),
            prometheus: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}

/// Service description returned by `/`.
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    /// Service name.
    pub message: &'static str,
    /// Available API endpoints.
    pub endpoints: [&'static str; 2],
}

/// Index handler - describes the API.
pub async fn index() -> impl IntoResponse {
    Json(IndexResponse {
        message: "Bicycle Bridge Monitoring API",
        endpoints: ["/api/status", "/api/history"],
    })
}

/// Status handler - records a new observation and reports current status.
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusReport>, ApiError> {
    let _timer = RequestTimer::new("/api/status");
    let report = state.status.current_status().await?;
    Ok(Json(report))
}

/// History handler - occupancy over the last hour.
pub async fn history(State(state): State<AppState>) -> Result<Json<HistoryReport>, ApiError> {
    let _timer = RequestTimer::new("/api/history");
    let report = state.history.recent().await?;
    Ok(Json(report))
}

/// Metrics handler - Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    state
        .prometheus
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Fallback for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::not_found(RESOURCE_NOT_FOUND)
}

/// Response for a panicking handler.
pub fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": INTERNAL_SERVER_ERROR })),
    )
        .into_response()
}
