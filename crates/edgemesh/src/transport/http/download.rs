//! Download-ticket issuance and redemption.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RequestDownloadRequest {
    /// Accepted for wire-format parity with the routed-command surface;
    /// this node only ever mints tickets for files on itself.
    #[serde(default)]
    pub device_id: Option<String>,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct RequestDownloadResponse {
    pub filename: String,
    pub size_bytes: u64,
    pub download_url: String,
    pub expires_unix_ms: i64,
}

pub async fn request_download(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RequestDownloadRequest>,
) -> Result<Json<RequestDownloadResponse>, DomainError> {
    if let Some(device_id) = &req.device_id {
        if device_id != &state.self_device_id {
            return Err(DomainError::invalid_argument("downloads are only available from this device"));
        }
    }

    let metadata = tokio::fs::metadata(&req.path)
        .await
        .map_err(|e| DomainError::not_found(format!("file not found: {e}")))?;
    if !metadata.is_file() {
        return Err(DomainError::invalid_argument("path does not refer to a regular file"));
    }

    let filename = std::path::Path::new(&req.path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| req.path.clone());

    let ticket = state.tickets.create(req.path.clone(), filename.clone(), metadata.len()).await;

    Ok(Json(RequestDownloadResponse {
        filename,
        size_bytes: ticket.size_bytes,
        download_url: format!("/api/download?token={}", ticket.token),
        expires_unix_ms: ticket.expires_at_unix_ms,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub token: String,
}

/// `GET /api/download?token=` — streams the file if the ticket is valid,
/// otherwise 404 regardless of the reason.
pub async fn download(State(state): State<Arc<AppState>>, Query(q): Query<DownloadQuery>) -> Response {
    let Some(ticket) = state.tickets.consume(&q.token).await else {
        return (StatusCode::NOT_FOUND, "ticket not found or expired").into_response();
    };

    match tokio::fs::read(&ticket.file_path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", ticket.filename))],
            bytes,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "file no longer available").into_response(),
    }
}
