//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "scast_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "scast_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "scast_http_requests_in_flight";

    // SSE stream metrics
    pub const STREAMS_TOTAL: &str = "scast_streams_total";
    pub const STREAMS_ACTIVE: &str = "scast_streams_active";
    pub const STREAM_EVENTS_SENT: &str = "scast_stream_events_sent_total";

    // Generation metrics
    pub const RUNS_TOTAL: &str = "scast_generation_runs_total";
    pub const RUN_DURATION_SECONDS: &str = "scast_generation_run_duration_seconds";
    pub const IMAGES_GENERATED_TOTAL: &str = "scast_images_generated_total";
    pub const IMAGES_FAILED_TOTAL: &str = "scast_images_failed_total";
    pub const IMAGES_FILTERED_TOTAL: &str = "scast_images_filtered_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "scast_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a new SSE stream.
pub fn record_stream_opened() {
    counter!(names::STREAMS_TOTAL).increment(1);
}

/// Update active stream gauge.
pub fn set_active_streams(count: i64) {
    gauge!(names::STREAMS_ACTIVE).set(count as f64);
}

/// Record a stream event sent.
pub fn record_stream_event(event_type: &str) {
    let labels = [("type", event_type.to_string())];
    counter!(names::STREAM_EVENTS_SENT, &labels).increment(1);
}

/// Record a finished generation run.
pub fn record_run_completed(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::RUNS_TOTAL, &labels).increment(1);
    histogram!(names::RUN_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a generated image.
pub fn record_image_generated() {
    counter!(names::IMAGES_GENERATED_TOTAL).increment(1);
}

/// Record a failed image.
pub fn record_image_failed() {
    counter!(names::IMAGES_FAILED_TOTAL).increment(1);
}

/// Record images dropped by the audio-duration filter.
pub fn record_images_filtered(count: u64) {
    counter!(names::IMAGES_FILTERED_TOTAL).increment(count);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (remove IDs, etc.).
fn sanitize_path(path: &str) -> String {
    let path = regex_lite::Regex::new(r"/stream/[a-zA-Z0-9_-]+")
        .unwrap()
        .replace_all(path, "/stream/:session_id");
    let path =
        regex_lite::Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
            .unwrap()
            .replace_all(&path, ":id");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
