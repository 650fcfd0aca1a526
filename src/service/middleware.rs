//! Service middleware for request metrics and correlation ids.
//!
//! Metrics are emitted as structured `tracing` events under the
//! `page_experiments::metrics` target, so they can be aggregated from logs:
//!
//! - `request` - path pattern, method, status, latency
//! - `assignment` - experiment, variant, bucket
//! - `stats` - experiments reported, latency

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use regex_lite::Regex;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::info;

/// Header carrying an upstream trace id.
pub const TRACE_HEADER: &str = "X-Cloud-Trace-Context";

/// Correlation id for a request: the upstream trace id, or a fresh UUID.
pub fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(TRACE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split('/').next())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Metrics middleware that records request counts and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    info!(
        target: "page_experiments::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request_metric"
    );

    response
}

fn path_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"^/api/pages/[^/]+", "/api/pages/:slug"),
            (r"/variants/[^/]+", "/variants/:variant_id"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
        .collect()
    })
}

/// Normalize path for metrics to avoid high cardinality.
///
/// Page slugs and variant ids become placeholders.
pub fn normalize_path(path: &str) -> String {
    path_patterns()
        .iter()
        .fold(path.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).into_owned()
        })
}

/// Record a visitor assignment.
pub fn record_assignment(experiment_id: &str, variant_id: &str, bucket: u32, is_new_visitor: bool) {
    info!(
        target: "page_experiments::metrics",
        metric_type = "assignment",
        experiment_id = experiment_id,
        variant_id = variant_id,
        bucket = bucket,
        new_visitor = is_new_visitor,
        "assignment_metric"
    );
}

/// Record a stats computation.
pub fn record_stats(experiment_count: usize, latency_ms: u64) {
    info!(
        target: "page_experiments::metrics",
        metric_type = "stats",
        experiment_count = experiment_count,
        latency_ms = latency_ms,
        "stats_metric"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_normalize_page_paths() {
        assert_eq!(normalize_path("/api/pages/pricing/resolved"), "/api/pages/:slug/resolved");
        assert_eq!(
            normalize_path("/api/pages/home/variants/abc123/preview"),
            "/api/pages/:slug/variants/:variant_id/preview"
        );
    }

    #[test]
    fn test_normalize_path_preserves_regular_path() {
        assert_eq!(normalize_path("/health/live"), "/health/live");
        assert_eq!(normalize_path("/api/blocks/catalog"), "/api/blocks/catalog");
    }

    #[test]
    fn test_correlation_id_from_trace_header() {
        let mut headers = HeaderMap::new();
        headers.insert(TRACE_HEADER, HeaderValue::from_static("105445aa7843bc8bf206b12000100000/1;o=1"));
        assert_eq!(correlation_id(&headers), "105445aa7843bc8bf206b12000100000");

        let generated = correlation_id(&HeaderMap::new());
        assert_eq!(generated.len(), 36);
    }
}
