//! Prometheus metrics for the tournament desk.
//!
//! When `METRICS_BIND` is set the exporter serves the Prometheus text format
//! on that address; otherwise the macros below record into a no-op recorder.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use pd_server::metrics;
//! use std::net::SocketAddr;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/auth/login", 200);
//! metrics::eliminations_total(false);
//! # }
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize the Prometheus exporter on `addr`
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// `path` is the matched route template, not the raw URI.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Tournament Metrics
// ============================================================================

/// Increment registrations counter, labelled `self` or `manual`.
pub fn registrations_total(source: &str) {
    metrics::counter!("registrations_total",
        "source" => source.to_string()
    )
    .increment(1);
}

/// Increment eliminations counter.
pub fn eliminations_total(crowned_champion: bool) {
    metrics::counter!("eliminations_total").increment(1);
    if crowned_champion {
        metrics::counter!("champions_total").increment(1);
    }
}

/// Increment settlements counter.
pub fn settlements_total(confirmed: bool) {
    metrics::counter!("settlements_total",
        "confirmed" => confirmed.to_string()
    )
    .increment(1);
}

/// Record collected settlement amounts.
pub fn settlement_amount(amount: i64) {
    metrics::histogram!("settlement_amount").record(amount as f64);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Increment login attempts counter.
pub fn login_attempts_total(success: bool) {
    metrics::counter!("login_attempts_total",
        "success" => success.to_string()
    )
    .increment(1);
}
