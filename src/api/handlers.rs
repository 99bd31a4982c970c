//! HTTP API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use time::OffsetDateTime;

use crate::arbitrage::{ScanReport, ScanStats};
use crate::storage::OpportunityRecord;

/// Summary of the last completed scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    /// When the scan finished.
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
    /// Scans completed since startup.
    pub scans_completed: u64,
    /// Counters of the last scan.
    pub stats: ScanStats,
    /// Batch file written by the last scan.
    pub saved_to: Option<String>,
}

/// Application state shared with handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Whether a scan has completed.
    pub ready: Arc<std::sync::atomic::AtomicBool>,
    /// Last scan summary.
    pub last_scan: Arc<tokio::sync::RwLock<Option<ScanSummary>>>,
    /// Opportunities of the last scan, most profitable first.
    pub opportunities: Arc<tokio::sync::RwLock<Vec<OpportunityRecord>>>,
    /// Prometheus exporter, if installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new() -> Self {
        Self {
            ready: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            last_scan: Arc::new(tokio::sync::RwLock::new(None)),
            opportunities: Arc::new(tokio::sync::RwLock::new(Vec::new())),
            prometheus: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_prometheus(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.prometheus = handle;
        self
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready
            .store(ready, std::sync::atomic::Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Publish a finished scan and mark the service ready.
    pub async fn record_scan(
        &self,
        report: &ScanReport,
        completed_at: OffsetDateTime,
        saved_to: Option<String>,
    ) {
        let records: Vec<OpportunityRecord> = report
            .opportunities
            .sorted_by_profit()
            .into_iter()
            .map(OpportunityRecord::from_opportunity)
            .collect();

        {
            let mut last = self.last_scan.write().await;
            let scans_completed = last.as_ref().map_or(0, |s| s.scans_completed) + 1;
            *last = Some(ScanSummary {
                completed_at,
                scans_completed,
                stats: report.stats,
                saved_to,
            });
        }
        *self.opportunities.write().await = records;
        self.set_ready(true);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether a scan has completed.
    pub ready: bool,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Last scan, if any.
    pub last_scan: Option<ScanSummary>,
}

/// Opportunities response.
#[derive(Debug, Serialize)]
pub struct OpportunitiesResponse {
    /// Number of opportunities.
    pub count: usize,
    /// Records, most profitable first.
    pub opportunities: Vec<OpportunityRecord>,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 once a scan completed, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let response = ReadyResponse { ready: is_ready };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns the last scan summary.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let last_scan = state.last_scan.read().await.clone();
    let status = if state.is_ready() { "running" } else { "starting" };

    Json(StatusResponse { status, last_scan })
}

/// Opportunities handler - returns the last scan's opportunities.
pub async fn opportunities(State(state): State<AppState>) -> impl IntoResponse {
    let opportunities = state.opportunities.read().await.clone();

    Json(OpportunitiesResponse {
        count: opportunities.len(),
        opportunities,
    })
}

/// Prometheus scrape handler - 404 when no exporter is installed.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.prometheus {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed".to_string()),
    }
}
