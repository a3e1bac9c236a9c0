//! warpstat-api — HTTP surface for scrapers and health checks.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` | Prometheus exposition of every exported series |
//! | GET | `/healthz` | `200 ok` while the last stats request succeeded, else `503` |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use warpstat_metrics::ExportRegistry;

/// Shared state for handlers.
#[derive(Clone)]
pub struct ApiState {
    pub exports: Arc<ExportRegistry>,
}

/// Build the exporter router.
pub fn build_router(exports: Arc<ExportRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/healthz", get(handlers::healthz))
        .with_state(ApiState { exports })
}
