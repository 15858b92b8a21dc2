use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::contracts::{Clock, CounterError, StateLoad, StateStore, StoreError};
use crate::counter::TicketCounter;

/// Server metrics for monitoring.
#[derive(Default)]
pub struct Metrics {
    pub issued_total: AtomicU64,
    pub resets_total: AtomicU64,
    pub corrupt_recoveries_total: AtomicU64,
    pub peeks_total: AtomicU64,
    pub errors_total: AtomicU64,
    pub issue_latency_sum_us: AtomicU64,
    pub start_time: std::sync::OnceLock<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        let m = Self::default();
        let _ = m.start_time.set(Instant::now());
        m
    }

    pub fn record_issue(&self, reset: bool, recovered: bool, latency_us: u64) {
        self.issued_total.fetch_add(1, Ordering::Relaxed);
        if reset {
            self.resets_total.fetch_add(1, Ordering::Relaxed);
        }
        if recovered {
            self.corrupt_recoveries_total.fetch_add(1, Ordering::Relaxed);
        }
        self.issue_latency_sum_us
            .fetch_add(latency_us, Ordering::Relaxed);
    }

    pub fn record_peek(&self) {
        self.peeks_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }
}

/// Application state shared across handlers.
pub struct AppState<S: StateStore, K: Clock> {
    pub counter: Arc<TicketCounter<S>>,
    pub clock: K,
    pub metrics: Arc<Metrics>,
}

impl<S: StateStore, K: Clock> AppState<S, K> {
    pub fn new(counter: Arc<TicketCounter<S>>, clock: K, metrics: Arc<Metrics>) -> Self {
        Self {
            counter,
            clock,
            metrics,
        }
    }
}

/// Response for a successful issuance.
#[derive(Debug, Serialize)]
pub struct IssueTicketResponse {
    pub ticket_number: u32,
    pub display_number: String,
    pub issued_on: NaiveDate,
    /// Wall-clock timestamp for receipt layouts, RFC 3339.
    pub issued_at: String,
}

/// Response for the read-only peek endpoint.
#[derive(Debug, Serialize)]
pub struct PeekResponse {
    pub date: Option<NaiveDate>,
    pub last_number: Option<u32>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// API error type.
pub enum ApiError {
    Counter(CounterError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_response) = match self {
            ApiError::Counter(CounterError::Store(StoreError::WriteFailed(msg))) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: format!("Failed to persist ticket state: {}", msg),
                    code: "STORE_WRITE_FAILED".into(),
                },
            ),
            ApiError::Counter(CounterError::Store(e)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: e.to_string(),
                    code: "STORE_ERROR".into(),
                },
            ),
            ApiError::Counter(CounterError::Overflow) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Ticket number overflow".into(),
                    code: "COUNTER_OVERFLOW".into(),
                },
            ),
            ApiError::Counter(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: e.to_string(),
                    code: "COUNTER_ERROR".into(),
                },
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<CounterError> for ApiError {
    fn from(e: CounterError) -> Self {
        ApiError::Counter(e)
    }
}

/// POST /tickets
/// Issues the next ticket for the current date.
///
/// One request performs exactly one issuance; renderers must not re-invoke
/// this for the same logical ticket (print retry, page reload). On failure
/// no ticket number is returned, so the caller cannot display a number
/// that was never durably recorded.
pub async fn issue_ticket<S: StateStore, K: Clock>(
    State(state): State<Arc<AppState<S, K>>>,
) -> Result<(StatusCode, Json<IssueTicketResponse>), ApiError> {
    let start = Instant::now();

    // One clock read per issuance; the same date feeds the day comparison
    // and the record written.
    let today = state.clock.today();

    let ticket = state.counter.issue_next(today).map_err(|e| {
        state.metrics.record_error();
        ApiError::from(e)
    })?;

    let latency_us = start.elapsed().as_micros() as u64;
    state.metrics.record_issue(
        ticket.ticket_number == 1,
        ticket.recovered_from_corruption,
        latency_us,
    );

    tracing::info!(
        ticket_number = ticket.ticket_number,
        issued_on = %ticket.issued_on,
        "Issued ticket"
    );

    Ok((
        StatusCode::CREATED,
        Json(IssueTicketResponse {
            ticket_number: ticket.ticket_number,
            display_number: ticket.display_number,
            issued_on: ticket.issued_on,
            issued_at: Local::now().to_rfc3339(),
        }),
    ))
}

/// GET /tickets/current
/// Reads the last issued number without advancing it.
pub async fn current_ticket<S: StateStore, K: Clock>(
    State(state): State<Arc<AppState<S, K>>>,
) -> Result<Json<PeekResponse>, ApiError> {
    let loaded = state.counter.current().map_err(|e| {
        state.metrics.record_error();
        ApiError::from(e)
    })?;

    state.metrics.record_peek();

    let response = match loaded {
        StateLoad::Present(s) => PeekResponse {
            date: Some(s.last_reset_date),
            last_number: Some(s.current_number),
        },
        StateLoad::Absent | StateLoad::Corrupt => PeekResponse {
            date: None,
            last_number: None,
        },
    };

    Ok(Json(response))
}

/// GET /health
/// Health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy"
    }))
}

/// Calculates rate per second, returning 0.0 if duration is zero.
#[inline]
fn safe_rate(count: u64, duration_secs: f64) -> f64 {
    if duration_secs > 0.0 {
        count as f64 / duration_secs
    } else {
        0.0
    }
}

/// Calculates average, returning 0.0 if count is zero.
#[inline]
fn safe_avg(sum: u64, count: u64) -> f64 {
    if count > 0 {
        sum as f64 / count as f64
    } else {
        0.0
    }
}

/// Response for stats endpoint.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub uptime_secs: f64,
    pub issues: IssueStats,
    pub peeks_total: u64,
    pub errors_total: u64,
}

#[derive(Debug, Serialize)]
pub struct IssueStats {
    pub total: u64,
    pub resets_total: u64,
    pub corrupt_recoveries_total: u64,
    pub rate_per_sec: f64,
    pub avg_latency_us: f64,
}

/// GET /stats
/// Server statistics and metrics.
pub async fn get_stats<S: StateStore, K: Clock>(
    State(state): State<Arc<AppState<S, K>>>,
) -> impl IntoResponse {
    let metrics = &state.metrics;

    let uptime_secs = metrics
        .start_time
        .get()
        .map(|t| t.elapsed().as_secs_f64())
        .unwrap_or(0.0);

    let issued_total = metrics.issued_total.load(Ordering::Relaxed);
    let resets_total = metrics.resets_total.load(Ordering::Relaxed);
    let corrupt_recoveries_total = metrics.corrupt_recoveries_total.load(Ordering::Relaxed);
    let issue_latency_sum = metrics.issue_latency_sum_us.load(Ordering::Relaxed);
    let peeks_total = metrics.peeks_total.load(Ordering::Relaxed);
    let errors_total = metrics.errors_total.load(Ordering::Relaxed);

    Json(StatsResponse {
        uptime_secs,
        issues: IssueStats {
            total: issued_total,
            resets_total,
            corrupt_recoveries_total,
            rate_per_sec: safe_rate(issued_total, uptime_secs),
            avg_latency_us: safe_avg(issue_latency_sum, issued_total),
        },
        peeks_total,
        errors_total,
    })
}

/// GET /metrics
/// Returns metrics in Prometheus text exposition format.
pub async fn metrics<S: StateStore, K: Clock>(
    State(state): State<Arc<AppState<S, K>>>,
) -> impl IntoResponse {
    let metrics = &state.metrics;

    let uptime_secs = metrics
        .start_time
        .get()
        .map(|t| t.elapsed().as_secs_f64())
        .unwrap_or(0.0);

    let issued_total = metrics.issued_total.load(Ordering::Relaxed);
    let resets_total = metrics.resets_total.load(Ordering::Relaxed);
    let corrupt_recoveries_total = metrics.corrupt_recoveries_total.load(Ordering::Relaxed);
    let issue_latency_sum = metrics.issue_latency_sum_us.load(Ordering::Relaxed);
    let peeks_total = metrics.peeks_total.load(Ordering::Relaxed);
    let errors_total = metrics.errors_total.load(Ordering::Relaxed);

    let output = format!(
        "# HELP ticketd_uptime_secs Server uptime in seconds\n\
         # TYPE ticketd_uptime_secs gauge\n\
         ticketd_uptime_secs {:.3}\n\
         \n\
         # HELP ticketd_issued_total Total tickets issued\n\
         # TYPE ticketd_issued_total counter\n\
         ticketd_issued_total {}\n\
         \n\
         # HELP ticketd_resets_total Issuances that started a new daily sequence\n\
         # TYPE ticketd_resets_total counter\n\
         ticketd_resets_total {}\n\
         \n\
         # HELP ticketd_corrupt_recoveries_total Issuances that recovered from an unparseable record\n\
         # TYPE ticketd_corrupt_recoveries_total counter\n\
         ticketd_corrupt_recoveries_total {}\n\
         \n\
         # HELP ticketd_issue_avg_latency_us Average issuance latency in microseconds\n\
         # TYPE ticketd_issue_avg_latency_us gauge\n\
         ticketd_issue_avg_latency_us {:.2}\n\
         \n\
         # HELP ticketd_issue_rate_per_sec Current issuance rate (tickets per second)\n\
         # TYPE ticketd_issue_rate_per_sec gauge\n\
         ticketd_issue_rate_per_sec {:.2}\n\
         \n\
         # HELP ticketd_peeks_total Total read-only state inspections\n\
         # TYPE ticketd_peeks_total counter\n\
         ticketd_peeks_total {}\n\
         \n\
         # HELP ticketd_errors_total Total errors\n\
         # TYPE ticketd_errors_total counter\n\
         ticketd_errors_total {}\n",
        uptime_secs,
        issued_total,
        resets_total,
        corrupt_recoveries_total,
        safe_avg(issue_latency_sum, issued_total),
        safe_rate(issued_total, uptime_secs),
        peeks_total,
        errors_total,
    );

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        output,
    )
}
