//! Route handlers.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use tracing::warn;

use crate::ApiState;

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    match state.exports.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, state.exports.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// GET /healthz
pub async fn healthz(State(state): State<ApiState>) -> impl IntoResponse {
    if state.exports.is_up() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use warpstat_core::MetricKey;
    use warpstat_metrics::{CATALOG, ExportRegistry};
    use warpstat_state::SnapshotStore;

    fn test_state() -> ApiState {
        ApiState {
            exports: Arc::new(ExportRegistry::new("mongodb", CATALOG, SnapshotStore::new()).unwrap()),
        }
    }

    #[tokio::test]
    async fn healthz_follows_availability() {
        let state = test_state();

        let resp = healthz(State(state.clone())).await.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.exports.set_up(true);
        let resp = healthz(State(state.clone())).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        state.exports.set_up(false);
        let resp = healthz(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn metrics_content_type() {
        let state = test_state();
        state
            .exports
            .add_to_counter(&MetricKey::new("op_counters_total", vec!["query".into()]), 3.0);

        let resp = prometheus_metrics(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.contains("text/plain"));
    }
}
