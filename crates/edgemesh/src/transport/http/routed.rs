//! Routed command execution over HTTP.
//!
//! The wire format carries no `session_id` (unlike the RPC
//! `ExecuteRoutedCommand`), so HTTP callers are authenticated as the single
//! internal session `AppState` creates for itself at startup.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::device::RoutingPolicy;
use crate::error::DomainError;
use crate::session::CommandResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoutedCommandRequest {
    pub cmd: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default)]
    pub force_device_id: Option<String>,
}

/// Parses the `policy` wire string. Unknown or absent values fall
/// back to `BestAvailable`, matching `force_device_id`'s precedence when
/// both are supplied.
fn policy_from_str(mode: Option<&str>) -> RoutingPolicy {
    match mode {
        Some("REQUIRE_NPU") => RoutingPolicy::RequireNpu,
        Some("PREFER_REMOTE") => RoutingPolicy::PreferRemote,
        Some("REQUIRE_LOCAL_MODEL") => RoutingPolicy::RequireLocalModel,
        Some("PREFER_LOCAL_MODEL") => RoutingPolicy::PreferLocalModel,
        _ => RoutingPolicy::BestAvailable,
    }
}

#[derive(Debug, Serialize)]
pub struct RoutedCommandResponse {
    pub selected_device_id: Option<String>,
    pub executed_locally: bool,
    pub total_time_ms: u64,
    pub output: CommandResult,
}

pub async fn routed_cmd(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RoutedCommandRequest>,
) -> Result<Json<RoutedCommandResponse>, DomainError> {
    if req.cmd.is_empty() {
        return Err(DomainError::invalid_argument("cmd must not be empty"));
    }

    let policy = match req.force_device_id {
        Some(device_id) => RoutingPolicy::ForceDeviceId(device_id),
        None => policy_from_str(req.policy.as_deref()),
    };

    let result = state
        .sessions
        .execute_routed_command(&state.internal_session_id, &policy, &req.cmd, &req.args)
        .await?;

    Ok(Json(RoutedCommandResponse {
        selected_device_id: result.selected_device_id,
        executed_locally: result.executed_locally,
        total_time_ms: result.total_time_ms,
        output: result.output,
    }))
}
