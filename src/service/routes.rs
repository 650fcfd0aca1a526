//! Axum routes for the page experiment service.

use axum::{
    extract::{Json, Path, State},
    http::{
        header::{CACHE_CONTROL, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::lookup::{LookupError, PreviewOutcome};
use crate::registry::{generate_catalog, BlockCatalog, CATALOG_VERSION};
use crate::stats::ExperimentStats;
use crate::store::DocumentStore;
use crate::types::{DocumentId, ResolvedPage, ResolvedPageWithVariant};
use crate::visitor::{visitor_from_cookie_header, visitor_set_cookie};

use super::middleware::{correlation_id, metrics_middleware, record_assignment, record_stats};
use super::state::ServiceState;

/// `Cache-Control` value for the block catalog.
pub const CATALOG_CACHE_CONTROL: &str = "public, max-age=3600";

// ============================================================================
// Request/Response Types
// ============================================================================

/// The page a visitor is served: composed with a variant, or the base page.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServedPage {
    /// Page composed with the assigned variant.
    Variant(Box<ResolvedPageWithVariant>),
    /// Base page; no experiment runs on it.
    Base(ResolvedPage),
}

/// Response for the assigned-page route.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedPageResponse {
    /// The visitor id (from the cookie, or freshly generated).
    pub visitor_id: String,
    /// The experiment the visitor took part in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<DocumentId>,
    /// The assigned variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<DocumentId>,
    /// The page to render.
    pub page: ServedPage,
}

/// Response for the stats route.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// One entry per running or paused experiment.
    pub experiments: Vec<ExperimentStats>,
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded".
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Block catalog format version.
    pub catalog_version: String,
    /// Document store connectivity.
    pub store_healthy: bool,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Always "alive".
    pub status: String,
}

/// Structured error response with correlation ID for tracing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Correlation ID for request tracing (matches X-Cloud-Trace-Context or generated UUID).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            correlation_id: None,
            details: None,
        }
    }

    /// Add a correlation ID to the error.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// An error response with its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, error: impl Into<String>, correlation_id: &str) -> Self {
        Self {
            status,
            body: ErrorResponse::new(code, error).with_correlation_id(correlation_id),
        }
    }

    fn bad_request(code: &str, error: impl Into<String>, correlation_id: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, error, correlation_id)
    }

    fn not_found(code: &str, error: impl Into<String>, correlation_id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, error, correlation_id)
    }

    fn lookup(err: LookupError, correlation_id: &str) -> Self {
        let code = match &err {
            LookupError::StoreError(_) => "STORE_ERROR",
            LookupError::ExperimentWithoutVariants(_)
            | LookupError::AssignedVariantUnavailable { .. }
            | LookupError::Assignment(_) => "EXPERIMENT_MISCONFIGURED",
            LookupError::AmbiguousExperiments { .. } => "AMBIGUOUS_EXPERIMENTS",
        };
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            code,
            "Internal server error",
            correlation_id,
        )
        .with_details(err.to_string())
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.body = self.body.with_details(details);
        self
    }

    /// HTTP status of the error.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                code = %self.body.code,
                details = ?self.body.details,
                correlation_id = ?self.body.correlation_id,
                "Request failed"
            );
        } else {
            tracing::warn!(
                code = %self.body.code,
                error = %self.body.error,
                correlation_id = ?self.body.correlation_id,
                "Request error"
            );
        }
        (self.status, Json(self.body)).into_response()
    }
}

fn require_param(value: &str, name: &str, correlation_id: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(
            "MISSING_PARAMETER",
            format!("Missing {} parameter", name),
            correlation_id,
        ));
    }
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Fetch a page by slug with its reusable-block references resolved.
pub async fn resolved_page_handler<S: DocumentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<ResolvedPage>, ApiError> {
    let correlation = correlation_id(&headers);
    require_param(&slug, "slug", &correlation)?;

    state
        .resolver
        .resolved_page(&slug)
        .await
        .map_err(|e| ApiError::lookup(e, &correlation))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("PAGE_NOT_FOUND", "Page not found", &correlation))
}

/// Compose an explicit variant onto its page, for editor preview.
pub async fn preview_handler<S: DocumentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    headers: HeaderMap,
    Path((slug, variant_id)): Path<(String, String)>,
) -> Result<Json<ResolvedPageWithVariant>, ApiError> {
    let correlation = correlation_id(&headers);
    require_param(&slug, "slug", &correlation)?;
    require_param(&variant_id, "variantId", &correlation)?;

    let outcome = state
        .resolver
        .preview(&slug, &DocumentId::new(variant_id))
        .await
        .map_err(|e| ApiError::lookup(e, &correlation))?;

    match outcome {
        PreviewOutcome::Composed(page) => Ok(Json(*page)),
        PreviewOutcome::PageNotFound => {
            Err(ApiError::not_found("PAGE_NOT_FOUND", "Page not found", &correlation))
        }
        PreviewOutcome::VariantNotFound => Err(ApiError::not_found(
            "VARIANT_NOT_FOUND",
            "Variant not found",
            &correlation,
        )),
        PreviewOutcome::VariantBelongsToOtherPage { variant_page, .. } => Err(ApiError::bad_request(
            "VARIANT_PAGE_MISMATCH",
            "Variant does not belong to this page",
            &correlation,
        )
        .with_details(format!("variant belongs to page {}", variant_page))),
    }
}

/// Serve a page to a visitor, assigning them to its running experiment.
///
/// Sets the visitor cookie when the request did not carry one.
pub async fn assigned_page_handler<S: DocumentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let correlation = correlation_id(&headers);
    require_param(&slug, "slug", &correlation)?;

    let visitor = visitor_from_cookie_header(headers.get(COOKIE).and_then(|v| v.to_str().ok()));

    let assigned = state
        .resolver
        .assigned_variant(&slug, &visitor.visitor_id)
        .await
        .map_err(|e| ApiError::lookup(e, &correlation))?;

    let body = match assigned {
        Some(assigned) => {
            record_assignment(
                assigned.experiment_id.as_str(),
                assigned.variant_id.as_str(),
                assigned.bucket,
                visitor.is_new,
            );
            AssignedPageResponse {
                visitor_id: visitor.visitor_id.clone(),
                experiment_id: Some(assigned.experiment_id),
                variant_id: Some(assigned.variant_id),
                page: ServedPage::Variant(Box::new(assigned.resolved_page)),
            }
        }
        None => {
            let page = state
                .resolver
                .resolved_page(&slug)
                .await
                .map_err(|e| ApiError::lookup(e, &correlation))?
                .ok_or_else(|| ApiError::not_found("PAGE_NOT_FOUND", "Page not found", &correlation))?;
            AssignedPageResponse {
                visitor_id: visitor.visitor_id.clone(),
                experiment_id: None,
                variant_id: None,
                page: ServedPage::Base(page),
            }
        }
    };

    let mut response = Json(body).into_response();
    if visitor.is_new {
        let cookie = visitor_set_cookie(&visitor.visitor_id, state.config.visitor_cookie_secure);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().insert(SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "Could not encode visitor cookie"),
        }
    }
    Ok(response)
}

/// The live block catalog.
pub async fn block_catalog_handler() -> impl IntoResponse {
    let catalog: BlockCatalog = generate_catalog();
    ([(CACHE_CONTROL, CATALOG_CACHE_CONTROL)], Json(catalog))
}

/// Per-variant statistics for running and paused experiments.
pub async fn experiment_stats_handler<S: DocumentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, ApiError> {
    let start = Instant::now();
    let experiments = state
        .stats()
        .compute_stats()
        .await
        .map_err(|e| ApiError::lookup(e, &correlation_id(&headers)))?;
    record_stats(experiments.len(), start.elapsed().as_millis() as u64);
    Ok(Json(StatsResponse { experiments }))
}

/// Health check endpoint (detailed).
async fn health_handler<S: DocumentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
) -> Json<HealthResponse> {
    let store_healthy = state.store.is_healthy().await;

    Json(HealthResponse {
        status: if store_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        catalog_version: CATALOG_VERSION.to_string(),
        store_healthy,
    })
}

/// Liveness probe endpoint. Does NOT check dependencies.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the page experiment service.
pub fn create_router<S: DocumentStore + 'static>(state: ServiceState<S>) -> Router {
    let state = Arc::new(state);

    Router::new()
        // Page delivery
        .route("/api/pages/:slug/resolved", get(resolved_page_handler::<S>))
        .route(
            "/api/pages/:slug/variants/:variant_id/preview",
            get(preview_handler::<S>),
        )
        .route("/api/pages/:slug/assigned", get(assigned_page_handler::<S>))
        // Editor tooling
        .route("/api/blocks/catalog", get(block_catalog_handler))
        .route("/api/experiments/stats", get(experiment_stats_handler::<S>))
        // Health checks
        .route("/health", get(health_handler::<S>))
        .route("/health/live", get(liveness_handler))
        .layer(axum::middleware::from_fn(metrics_middleware))
        .with_state(state)
}
