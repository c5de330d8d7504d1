//! WebRTC screen-stream negotiation over HTTP.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamStartRequest {
    #[serde(default)]
    pub target_fps: Option<u32>,
    #[serde(default)]
    pub jpeg_quality: Option<u8>,
    #[serde(default)]
    pub monitor_index: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct StreamStartResponse {
    pub stream_id: String,
    pub offer_sdp: String,
}

const DEFAULT_TARGET_FPS: u32 = 8;
const DEFAULT_JPEG_QUALITY: u8 = 60;

pub async fn stream_start(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StreamStartRequest>,
) -> Result<Json<StreamStartResponse>, DomainError> {
    let (stream_id, offer_sdp) = state
        .streams
        .start(
            req.target_fps.unwrap_or(DEFAULT_TARGET_FPS),
            req.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY),
            req.monitor_index.unwrap_or(0),
        )
        .await?;
    Ok(Json(StreamStartResponse { stream_id, offer_sdp }))
}

#[derive(Debug, Deserialize)]
pub struct StreamAnswerRequest {
    pub stream_id: String,
    pub answer_sdp: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

pub async fn stream_answer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StreamAnswerRequest>,
) -> Result<Json<OkResponse>, DomainError> {
    state.streams.answer(&req.stream_id, &req.answer_sdp).await?;
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Debug, Deserialize)]
pub struct StreamStopRequest {
    pub stream_id: String,
}

pub async fn stream_stop(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StreamStopRequest>,
) -> Result<Json<OkResponse>, DomainError> {
    state.streams.stop(&req.stream_id).await?;
    Ok(Json(OkResponse { ok: true }))
}
