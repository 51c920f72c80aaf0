//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "kroma_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "kroma_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "kroma_http_requests_in_flight";

    // Profile streams
    pub const PROFILE_STREAMS_TOTAL: &str = "kroma_profile_streams_total";
    pub const PROFILE_EVENTS_SENT: &str = "kroma_profile_events_sent_total";

    // Single-flight rejections
    pub const GENERATION_CONFLICTS_TOTAL: &str = "kroma_generation_conflicts_total";
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

/// Record a new profile stream subscriber.
pub fn record_profile_stream() {
    counter!(names::PROFILE_STREAMS_TOTAL).increment(1);
}

/// Record a profile event pushed to a subscriber.
pub fn record_profile_event_sent() {
    counter!(names::PROFILE_EVENTS_SENT).increment(1);
}

/// Record a generation rejected because one is already running.
pub fn record_generation_conflict(operation: &str) {
    let labels = [("operation", operation.to_string())];
    counter!(names::GENERATION_CONFLICTS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (replace IDs with placeholders).
fn sanitize_path(path: &str) -> String {
    let mut previous = "";
    path.split('/')
        .map(|segment| {
            let sanitized = if uuid::Uuid::parse_str(segment).is_ok() {
                ":id"
            } else if previous == "users" {
                ":uid"
            } else {
                segment
            };
            previous = segment;
            sanitized
        })
        .collect::<Vec<_>>()
        .join("/")
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path(
                "/api/projects/550e8400-e29b-41d4-a716-446655440000/scenes/6ba7b810-9dad-11d1-80b4-00c04fd430c8/video"
            ),
            "/api/projects/:id/scenes/:id/video"
        );
        assert_eq!(
            sanitize_path("/api/users/firebase-uid-42/profile"),
            "/api/users/:uid/profile"
        );
        assert_eq!(sanitize_path("/health"), "/health");
    }
}
