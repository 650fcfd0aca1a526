//! Page Experiment REST Service
//!
//! Serves resolved pages, editor previews and visitor assignments over HTTP.
//!
//! ## Endpoints
//!
//! - `GET /api/pages/:slug/resolved` - Page with reusable blocks resolved
//! - `GET /api/pages/:slug/variants/:variant_id/preview` - Page composed with a variant
//! - `GET /api/pages/:slug/assigned` - Page for the visitor in the `visitor_id` cookie
//! - `GET /api/blocks/catalog` - Live block catalog
//! - `GET /api/experiments/stats` - Per-variant statistics
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness probe

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{correlation_id, metrics_middleware, record_assignment, record_stats, TRACE_HEADER};
pub use routes::{create_router, ApiError, AssignedPageResponse, ErrorResponse, ServedPage};
pub use state::{ServiceConfig, ServiceState};
