//! HTTP API surface: a thin `axum` translation over the gRPC-shaped
//! domain operations, one handler module per resource.

pub mod devices;
pub mod download;
pub mod jobs;
pub mod routed;
pub mod stream;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

#[cfg(test)]
#[path = "http_tests.rs"]
mod http_tests;

/// Builds the full `axum` `Router` for the HTTP surface.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/submit-job", post(jobs::submit_job))
        .route("/api/job", get(jobs::job))
        .route("/api/job-detail", get(jobs::job_detail))
        .route("/api/plan", post(jobs::plan))
        .route("/api/plan-cost", post(jobs::plan_cost))
        .route("/api/activity", get(devices::activity))
        .route("/api/devices", get(devices::devices))
        .route("/api/device-metrics", get(devices::device_metrics))
        .route("/api/routed-cmd", post(routed::routed_cmd))
        .route("/api/stream/start", post(stream::stream_start))
        .route("/api/stream/answer", post(stream::stream_answer))
        .route("/api/stream/stop", post(stream::stream_stop))
        .route("/api/request-download", post(download::request_download))
        .route("/api/download", get(download::download))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
