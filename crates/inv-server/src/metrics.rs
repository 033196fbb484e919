//! Metrics and Observability
//!
//! Request counters collected by middleware, rendered in the Prometheus text
//! format together with a gauge of registered items.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use inv_api::extractors::DynInventoryService;
use tracing::{debug, info_span, Instrument};

/// Status ranges tracked separately
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    ClientError,
    ServerError,
}

impl StatusClass {
    const ALL: [StatusClass; 3] = [
        StatusClass::Success,
        StatusClass::ClientError,
        StatusClass::ServerError,
    ];

    /// Informational and redirect responses are not classified
    pub fn of(status: StatusCode) -> Option<Self> {
        if status.is_success() {
            Some(StatusClass::Success)
        } else if status.is_client_error() {
            Some(StatusClass::ClientError)
        } else if status.is_server_error() {
            Some(StatusClass::ServerError)
        } else {
            None
        }
    }

    fn label(self) -> &'static str {
        match self {
            StatusClass::Success => "2xx",
            StatusClass::ClientError => "4xx",
            StatusClass::ServerError => "5xx",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Metrics collector
pub struct Metrics {
    started: Instant,
    requests: AtomicU64,
    by_class: [AtomicU64; 3],
    duration_ms: AtomicU64,
    photo_bytes_served: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub success: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    pub duration_ms: u64,
    pub photo_bytes_served: u64,
    pub uptime_seconds: u64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            requests: AtomicU64::new(0),
            by_class: Default::default(),
            duration_ms: AtomicU64::new(0),
            photo_bytes_served: AtomicU64::new(0),
        }
    }

    /// Record a completed request
    pub fn record_request(&self, status: StatusCode, duration_ms: u64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.duration_ms.fetch_add(duration_ms, Ordering::Relaxed);

        if let Some(class) = StatusClass::of(status) {
            self.by_class[class.index()].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_photo_served(&self, bytes: u64) {
        self.photo_bytes_served.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let class = |c: StatusClass| self.by_class[c.index()].load(Ordering::Relaxed);

        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            success: class(StatusClass::Success),
            client_errors: class(StatusClass::ClientError),
            server_errors: class(StatusClass::ServerError),
            duration_ms: self.duration_ms.load(Ordering::Relaxed),
            photo_bytes_served: self.photo_bytes_served.load(Ordering::Relaxed),
            uptime_seconds: self.started.elapsed().as_secs(),
        }
    }

    /// Render the counters and the item gauge in Prometheus text format
    pub fn render(&self, items: usize) -> String {
        let snapshot = self.snapshot();
        let mut out = String::new();

        write_metric(
            &mut out,
            "http_requests_total",
            "counter",
            "Total number of HTTP requests",
            &[("", snapshot.requests)],
        );

        let by_status: Vec<(String, u64)> = StatusClass::ALL
            .iter()
            .zip([
                snapshot.success,
                snapshot.client_errors,
                snapshot.server_errors,
            ])
            .map(|(c, count)| (format!("{{status=\"{}\"}}", c.label()), count))
            .collect();
        let by_status: Vec<(&str, u64)> =
            by_status.iter().map(|(l, v)| (l.as_str(), *v)).collect();
        write_metric(
            &mut out,
            "http_requests_by_status",
            "counter",
            "HTTP requests by status code range",
            &by_status,
        );

        write_metric(
            &mut out,
            "http_request_duration_ms_total",
            "counter",
            "Total HTTP request duration in milliseconds",
            &[("", snapshot.duration_ms)],
        );
        write_metric(
            &mut out,
            "inventory_photo_bytes_served_total",
            "counter",
            "Photo bytes returned to clients",
            &[("", snapshot.photo_bytes_served)],
        );
        write_metric(
            &mut out,
            "inventory_items",
            "gauge",
            "Items currently registered",
            &[("", items as u64)],
        );
        write_metric(
            &mut out,
            "uptime_seconds",
            "gauge",
            "Server uptime in seconds",
            &[("", snapshot.uptime_seconds)],
        );

        out
    }
}

fn write_metric(out: &mut String, name: &str, kind: &str, help: &str, samples: &[(&str, u64)]) {
    // Writing to a String cannot fail
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
    for (labels, value) in samples {
        let _ = writeln!(out, "{}{} {}", name, labels, value);
    }
}

/// Length of an image response, if that is what is being sent
fn photo_length(headers: &HeaderMap) -> Option<u64> {
    let is_image = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("image/"));
    if !is_image {
        return None;
    }

    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Metrics middleware
pub async fn metrics_middleware(
    State(metrics): State<Arc<Metrics>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next
        .run(request)
        .instrument(info_span!("http_request", %method, %path))
        .await;

    let elapsed_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    debug!(
        method = %method,
        path = %path,
        status = %status,
        duration_ms = elapsed_ms,
        "Request completed"
    );

    metrics.record_request(status, elapsed_ms);
    if let Some(bytes) = photo_length(response.headers()) {
        metrics.record_photo_served(bytes);
    }

    response
}

/// State for the /metrics endpoint
#[derive(Clone)]
pub struct MetricsState {
    pub metrics: Arc<Metrics>,
    pub inventory: Arc<DynInventoryService>,
}

/// Handler for /metrics endpoint (Prometheus format)
pub async fn prometheus_metrics(State(state): State<MetricsState>) -> String {
    let items = state.inventory.registry().len().await;
    state.metrics.render(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_record_request() {
        let metrics = Metrics::new();

        metrics.record_request(StatusCode::CREATED, 50);
        metrics.record_request(StatusCode::NOT_FOUND, 10);
        metrics.record_request(StatusCode::METHOD_NOT_ALLOWED, 1);
        metrics.record_request(StatusCode::INTERNAL_SERVER_ERROR, 100);
        metrics.record_request(StatusCode::NOT_MODIFIED, 0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests, 5);
        assert_eq!(snapshot.success, 1);
        assert_eq!(snapshot.client_errors, 2);
        assert_eq!(snapshot.server_errors, 1);
        assert_eq!(snapshot.duration_ms, 161);
    }

    #[test]
    fn test_render() {
        let metrics = Metrics::new();
        metrics.record_request(StatusCode::OK, 50);
        metrics.record_photo_served(2048);

        let output = metrics.render(3);
        assert!(output.contains("# TYPE http_requests_total counter"));
        assert!(output.contains("http_requests_total 1"));
        assert!(output.contains("http_requests_by_status{status=\"2xx\"} 1"));
        assert!(output.contains("http_requests_by_status{status=\"5xx\"} 0"));
        assert!(output.contains("inventory_photo_bytes_served_total 2048"));
        assert!(output.contains("inventory_items 3"));
        assert!(output.contains("uptime_seconds"));
    }

    #[test]
    fn test_photo_length() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));
        assert_eq!(photo_length(&headers), None);

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
        assert_eq!(photo_length(&headers), Some(12));

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        assert_eq!(photo_length(&headers), None);
    }
}
